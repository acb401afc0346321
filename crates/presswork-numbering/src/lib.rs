//! Sequential numbering service.
//!
//! Issues the human-readable document numbers used across the shop: orders
//! (`SAP2508NNNN`), invoices (`INV…`), payments (`PAY…`) and expenses
//! (`EXP…`). Numbers are scoped to a year-month period derived from an
//! injected timestamp, so the logic never reads the ambient wall clock and
//! period rollover is exact at month boundaries.
//!
//! The last issued counter for each period prefix is persisted in the
//! `counters` storage namespace. Allocation serializes per prefix through an
//! async lock map; concurrent callers therefore receive distinct, strictly
//! increasing numbers, and serial callers see no gaps.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use presswork_storage::{StorageError, StorageService};
use presswork_types::StorageKey;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Highest counter value a period can hold; the next allocation fails.
const MAX_PER_PERIOD: u32 = 9999;

/// Errors that can occur while issuing numbers.
#[derive(Debug, Error)]
pub enum NumberingError {
	/// The period has no numbers left. Never silently wraps.
	#[error("Counter exhausted for prefix {prefix}")]
	CounterExhausted { prefix: String },
	/// The persisted counter changed underneath the allocation.
	#[error("Counter write conflict: {0}")]
	Conflict(String),
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for NumberingError {
	fn from(e: StorageError) -> Self {
		NumberingError::Storage(e.to_string())
	}
}

/// The document families that receive sequential numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
	Order,
	Invoice,
	Payment,
	Expense,
}

impl NumberKind {
	/// The three-letter code that opens every number of this kind.
	pub fn code(&self) -> &'static str {
		match self {
			NumberKind::Order => "SAP",
			NumberKind::Invoice => "INV",
			NumberKind::Payment => "PAY",
			NumberKind::Expense => "EXP",
		}
	}
}

/// Persisted per-prefix counter state.
#[derive(Debug, Serialize, Deserialize)]
struct Counter {
	last: u32,
}

/// Issues period-scoped sequential numbers backed by persistent counters.
pub struct NumberingService {
	storage: Arc<StorageService>,
	/// Per-prefix allocation locks.
	locks: DashMap<String, Arc<Mutex<()>>>,
	/// Attempts per allocation before a conflict is surfaced to the caller.
	max_attempts: u32,
}

impl NumberingService {
	/// Creates a new numbering service over the shared storage.
	///
	/// `max_attempts` bounds the transparent retries on counter write
	/// conflicts; values below 1 are treated as 1.
	pub fn new(storage: Arc<StorageService>, max_attempts: u32) -> Self {
		Self {
			storage,
			locks: DashMap::new(),
			max_attempts: max_attempts.max(1),
		}
	}

	/// The period prefix for a kind at the given instant, e.g. `SAP2508`.
	pub fn period_prefix(kind: NumberKind, at: DateTime<Utc>) -> String {
		format!("{}{}", kind.code(), at.format("%y%m"))
	}

	/// Issues the next number for the kind in the period containing `at`.
	///
	/// The timestamp is injected by the caller so allocation is deterministic
	/// and testable at period boundaries.
	pub async fn next_number(
		&self,
		kind: NumberKind,
		at: DateTime<Utc>,
	) -> Result<String, NumberingError> {
		let prefix = Self::period_prefix(kind, at);

		let lock = self
			.locks
			.entry(prefix.clone())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();
		let _guard = lock.lock().await;

		let mut attempt = 1;
		loop {
			match self.allocate(&prefix).await {
				Ok(number) => {
					tracing::debug!(number = %number, "Issued sequential number");
					return Ok(number);
				},
				Err(NumberingError::Conflict(reason)) if attempt < self.max_attempts => {
					tracing::warn!(
						prefix = %prefix,
						attempt,
						"Retrying number allocation after conflict: {}",
						reason
					);
					attempt += 1;
				},
				Err(e) => return Err(e),
			}
		}
	}

	/// One read-increment-write pass over the persisted counter.
	async fn allocate(&self, prefix: &str) -> Result<String, NumberingError> {
		let namespace = StorageKey::Counters.as_str();

		let last = match self.storage.retrieve::<Counter>(namespace, prefix).await {
			Ok(counter) => counter.last,
			Err(StorageError::NotFound) => 0,
			Err(e) => return Err(e.into()),
		};

		if last >= MAX_PER_PERIOD {
			tracing::warn!(prefix = %prefix, "Sequential counter exhausted");
			return Err(NumberingError::CounterExhausted {
				prefix: prefix.to_string(),
			});
		}
		let next = last + 1;
		let counter = Counter { last: next };

		if last == 0 {
			self.storage.store(namespace, prefix, &counter).await?;
		} else {
			// The counter existed a moment ago; losing it mid-allocation
			// means another writer interfered.
			match self.storage.update(namespace, prefix, &counter).await {
				Ok(()) => {},
				Err(StorageError::NotFound) => {
					return Err(NumberingError::Conflict(format!(
						"counter {} vanished during allocation",
						prefix
					)));
				},
				Err(e) => return Err(e.into()),
			}
		}

		Ok(format!("{}{:04}", prefix, next))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use futures::future::join_all;
	use presswork_storage::implementations::memory::MemoryStorage;
	use std::collections::HashSet;

	fn service() -> Arc<NumberingService> {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		Arc::new(NumberingService::new(storage, 3))
	}

	fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(year, month, day, 10, 30, 0).unwrap()
	}

	#[test]
	fn period_prefix_uses_two_digit_year_and_month() {
		assert_eq!(
			NumberingService::period_prefix(NumberKind::Order, at(2025, 8, 15)),
			"SAP2508"
		);
		assert_eq!(
			NumberingService::period_prefix(NumberKind::Invoice, at(2025, 12, 1)),
			"INV2512"
		);
		assert_eq!(
			NumberingService::period_prefix(NumberKind::Payment, at(2026, 1, 31)),
			"PAY2601"
		);
	}

	#[tokio::test]
	async fn serial_numbers_have_no_gaps() {
		let service = service();
		let when = at(2025, 8, 15);

		for expected in ["SAP25080001", "SAP25080002", "SAP25080003"] {
			let number = service.next_number(NumberKind::Order, when).await.unwrap();
			assert_eq!(number, expected);
		}
	}

	#[tokio::test]
	async fn kinds_and_periods_count_independently() {
		let service = service();

		let order = service
			.next_number(NumberKind::Order, at(2025, 8, 15))
			.await
			.unwrap();
		let invoice = service
			.next_number(NumberKind::Invoice, at(2025, 8, 15))
			.await
			.unwrap();
		let next_month = service
			.next_number(NumberKind::Order, at(2025, 9, 1))
			.await
			.unwrap();

		assert_eq!(order, "SAP25080001");
		assert_eq!(invoice, "INV25080001");
		assert_eq!(next_month, "SAP25090001");
	}

	#[tokio::test]
	async fn exhausted_period_fails_loudly() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let service = NumberingService::new(storage.clone(), 3);
		let when = at(2025, 8, 15);

		storage
			.store(
				StorageKey::Counters.as_str(),
				"SAP2508",
				&Counter { last: 9998 },
			)
			.await
			.unwrap();

		let number = service.next_number(NumberKind::Order, when).await.unwrap();
		assert_eq!(number, "SAP25089999");

		let result = service.next_number(NumberKind::Order, when).await;
		assert!(matches!(
			result,
			Err(NumberingError::CounterExhausted { prefix }) if prefix == "SAP2508"
		));
	}

	#[tokio::test]
	async fn concurrent_allocations_are_distinct_and_dense() {
		let service = service();
		let when = at(2025, 8, 15);

		let calls = (0..25).map(|_| {
			let service = service.clone();
			async move { service.next_number(NumberKind::Order, when).await }
		});
		let numbers: Vec<String> = join_all(calls)
			.await
			.into_iter()
			.collect::<Result<_, _>>()
			.unwrap();

		let distinct: HashSet<&String> = numbers.iter().collect();
		assert_eq!(distinct.len(), 25);
		assert!(numbers.iter().all(|n| n.starts_with("SAP2508")));
		assert_eq!(
			numbers.iter().max().map(String::as_str),
			Some("SAP25080025")
		);
	}
}
