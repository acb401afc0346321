//! Startup recovery sweep.
//!
//! Orders store their derived money fields alongside the inputs, so a
//! crash between writes or a hand-edited backend can leave totals that no
//! longer follow from the items and payments. The sweep walks every order,
//! recomputes the derived fields and writes back any that drifted.

use crate::CoreError;
use presswork_storage::StorageService;
use presswork_types::{Order, StorageKey};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of one recovery sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryReport {
	/// Orders examined.
	pub scanned: usize,
	/// Orders whose derived fields had to be rewritten.
	pub repaired: usize,
}

/// Walks stored orders and repairs derived-field drift.
pub struct RecoveryService {
	storage: Arc<StorageService>,
}

impl RecoveryService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Recomputes totals for every stored order and persists the ones that
	/// changed. Runs before the engine starts serving work.
	pub async fn recover_state(&self) -> Result<RecoveryReport, CoreError> {
		let orders: Vec<Order> = self
			.storage
			.list(StorageKey::Orders.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		let mut report = RecoveryReport::default();
		for mut order in orders {
			report.scanned += 1;
			let before = (
				order.subtotal,
				order.total_amount,
				order.due_amount,
				order.payment_status,
			);
			order.recompute_totals();
			let after = (
				order.subtotal,
				order.total_amount,
				order.due_amount,
				order.payment_status,
			);
			if before == after {
				continue;
			}

			tracing::error!(
				order_number = %order.order_number,
				stored_total = %before.1,
				computed_total = %after.1,
				stored_due = %before.2,
				computed_due = %after.2,
				"Stored totals do not follow from items and payments, repairing"
			);
			self.storage
				.update(StorageKey::Orders.as_str(), &order.id, &order)
				.await
				.map_err(|e| CoreError::Storage(e.to_string()))?;
			report.repaired += 1;
		}

		if report.repaired > 0 {
			tracing::warn!(
				scanned = report.scanned,
				repaired = report.repaired,
				"Recovery sweep repaired drifted orders"
			);
		} else {
			tracing::info!(scanned = report.scanned, "Recovery sweep found no drift");
		}
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::event_bus::EventBus;
	use crate::services::{CustomerService, OrderService};
	use crate::state::LockMap;
	use presswork_numbering::NumberingService;
	use presswork_storage::implementations::memory::MemoryStorage;
	use presswork_types::{CustomerInput, NewOrder, NewOrderItem, PaymentStatus};
	use rust_decimal::Decimal;
	use std::str::FromStr;

	fn dec(s: &str) -> Decimal {
		Decimal::from_str(s).unwrap()
	}

	async fn seed_order(storage: Arc<StorageService>) -> Order {
		let numbering = Arc::new(NumberingService::new(storage.clone(), 3));
		let customers = CustomerService::new(storage.clone());
		let orders = OrderService::new(storage, numbering, LockMap::new(), EventBus::new(16));

		let customer = customers
			.create(CustomerInput {
				company_name: "Rahim Traders".into(),
				..Default::default()
			})
			.await
			.unwrap();
		orders
			.create_order(
				NewOrder {
					customer_id: customer.id,
					work_name: "Ledger books".into(),
					items: vec![NewOrderItem {
						product_name: "Ledger".into(),
						quantity: 10,
						unit_price: dec("10"),
						..Default::default()
					}],
					..Default::default()
				},
				"reception",
			)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn drifted_totals_are_repaired() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let mut order = seed_order(storage.clone()).await;

		// Corrupt the stored copy behind the services' back.
		order.due_amount = Decimal::ZERO;
		order.payment_status = PaymentStatus::Paid;
		storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await
			.unwrap();

		let report = RecoveryService::new(storage.clone())
			.recover_state()
			.await
			.unwrap();
		assert_eq!(report.scanned, 1);
		assert_eq!(report.repaired, 1);

		let repaired: Order = storage
			.retrieve(StorageKey::Orders.as_str(), &order.id)
			.await
			.unwrap();
		assert_eq!(repaired.due_amount, dec("100"));
		assert_eq!(repaired.payment_status, PaymentStatus::Pending);
	}

	#[tokio::test]
	async fn clean_state_reports_zero_repairs() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		seed_order(storage.clone()).await;

		let report = RecoveryService::new(storage)
			.recover_state()
			.await
			.unwrap();
		assert_eq!(report.scanned, 1);
		assert_eq!(report.repaired, 0);
	}
}
