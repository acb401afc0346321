//! Core orchestration for the presswork order-management service.
//!
//! This crate ties the shared types, storage and numbering crates together
//! into the running system:
//!
//! - the order lifecycle state machine, single writer of `order.status` and
//!   of the append-only status history,
//! - the domain services (orders, billing, design, production, delivery,
//!   customers) exposing the business operations,
//! - the event bus carrying domain events to cross-cutting consumers,
//! - the engine run loop with periodic storage cleanup and the startup
//!   recovery sweep over derived money fields.
//!
//! An [`Engine`] is assembled by [`EngineBuilder`] from configuration and a
//! map of storage backend factories; only the configured primary backend is
//! instantiated. Services share one [`StorageService`], one per-order lock
//! registry and one event bus, so same-order operations serialize while
//! distinct orders proceed independently.
//!
//! [`StorageService`]: presswork_storage::StorageService

pub mod builder;
pub mod engine;
pub mod recovery;
pub mod services;
pub mod state;
pub mod utils;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use engine::Engine;
pub use recovery::RecoveryReport;

use presswork_numbering::NumberingError;
use presswork_storage::StorageError;
use presswork_types::MoneyError;
use thiserror::Error;

/// Errors surfaced by core operations.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Input failed domain validation.
	#[error("Validation error: {0}")]
	Validation(String),
	/// A referenced entity does not exist.
	#[error("{entity} not found: {id}")]
	NotFound { entity: &'static str, id: String },
	/// A numbering period has no numbers left.
	#[error("Counter exhausted for prefix {0}")]
	CounterExhausted(String),
	/// Concurrent writes collided and retries ran out.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// Stored data no longer satisfies a derived-field invariant.
	#[error("Invariant violation: {0}")]
	Invariant(String),
	/// The storage collaborator failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl CoreError {
	/// Maps a storage failure while touching a specific entity, turning the
	/// backend's bare `NotFound` into a typed miss.
	pub(crate) fn from_storage(entity: &'static str, id: &str, err: StorageError) -> Self {
		match err {
			StorageError::NotFound => CoreError::NotFound {
				entity,
				id: id.to_string(),
			},
			other => CoreError::Storage(other.to_string()),
		}
	}
}

impl From<NumberingError> for CoreError {
	fn from(err: NumberingError) -> Self {
		match err {
			NumberingError::CounterExhausted { prefix } => CoreError::CounterExhausted(prefix),
			NumberingError::Conflict(msg) => CoreError::Conflict(msg),
			NumberingError::Storage(msg) => CoreError::Storage(msg),
		}
	}
}

impl From<MoneyError> for CoreError {
	fn from(err: MoneyError) -> Self {
		CoreError::Validation(err.to_string())
	}
}
