//! Lifecycle management for the engine.
//!
//! Startup runs the recovery sweep before any request is served, so derived
//! money fields are trustworthy from the first read. Shutdown flushes
//! expired storage entries on the way out.

use super::Engine;
use crate::recovery::{RecoveryReport, RecoveryService};
use crate::CoreError;

impl Engine {
	/// Performs initialization required before running.
	///
	/// Sweeps every stored order and repairs derived fields that no longer
	/// follow from items and payments.
	pub async fn initialize(&self) -> Result<RecoveryReport, CoreError> {
		tracing::info!(service_id = %self.config.service.id, "Initializing engine");
		RecoveryService::new(self.storage.clone())
			.recover_state()
			.await
	}

	/// Performs cleanup operations before the process exits.
	pub async fn shutdown(&self) {
		if let Err(e) = self.storage.cleanup_expired().await {
			tracing::warn!("Final storage cleanup failed: {}", e);
		}
		tracing::info!("Engine stopped");
	}
}
