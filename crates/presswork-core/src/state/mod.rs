//! Order lifecycle state management.
//!
//! Contains the state machine that owns order status transitions and the
//! shared lock registry that serializes same-order writes across services.

pub mod order;

pub use order::OrderStateMachine;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry of per-key async locks.
///
/// One instance is shared by the state machine, the orders service and the
/// billing service so that every mutation of the same order takes the same
/// lock. The design service keeps a second, private instance for per-task
/// proof serialization. Locks are created on first use and never dropped;
/// the key population (live entity ids) is small enough that this does not
/// matter in practice.
#[derive(Clone, Default)]
pub struct LockMap {
	locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LockMap {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the lock guarding the given key, creating it if needed.
	pub fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
		self.locks
			.entry(key.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone()
	}
}
