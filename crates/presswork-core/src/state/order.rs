//! Order lifecycle state machine.
//!
//! The single writer of `order.status` and of the append-only status
//! history. Workflow services never edit an order's status themselves; they
//! hand the machine a [`StatusRequest`] and let it serialize the write
//! through the shared per-order lock registry.
//!
//! Transitions are permissive on purpose: jobs in the shop skip and revisit
//! stages all the time, so arbitrary jumps between statuses are allowed. The
//! only guard is that `cancelled` is terminal.

use crate::engine::event_bus::EventBus;
use crate::state::LockMap;
use crate::utils::truncate_id;
use crate::CoreError;
use chrono::Utc;
use presswork_storage::StorageService;
use presswork_types::{
	CoreEvent, Order, OrderEvent, OrderStatus, StatusChange, StatusRequest, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;

/// State machine driving order status transitions.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
	locks: LockMap,
	event_bus: EventBus,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>, locks: LockMap, event_bus: EventBus) -> Self {
		Self {
			storage,
			locks,
			event_bus,
		}
	}

	/// Moves an order to `new_status`, appending exactly one history entry.
	///
	/// Fails with a validation error when the order is already in a terminal
	/// status. Moving to `delivered` also stamps the order's
	/// `actual_delivery_date`. Publishes `StatusChanged` after the write has
	/// been committed.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), to = %new_status))]
	pub async fn transition(
		&self,
		order_id: &str,
		new_status: OrderStatus,
		actor: &str,
		note: Option<String>,
	) -> Result<Order, CoreError> {
		let lock = self.locks.lock_for(order_id);
		let _guard = lock.lock().await;

		let mut order: Order = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))?;

		let from = order.status;
		if from.is_terminal() {
			return Err(CoreError::Validation(format!(
				"order {} is {} and cannot change status",
				order.order_number, from
			)));
		}

		let now = Utc::now();
		order.status = new_status;
		order.history.push(StatusChange {
			from: Some(from),
			to: new_status,
			changed_by: actor.to_string(),
			changed_at: now,
			note,
		});
		if new_status == OrderStatus::Delivered {
			order.actual_delivery_date = Some(now);
		}
		order.updated_at = now;

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))?;

		tracing::info!(
			order_number = %order.order_number,
			from = %from,
			to = %new_status,
			changed_by = %actor,
			"Order status changed"
		);

		self.event_bus
			.publish(CoreEvent::Order(OrderEvent::StatusChanged {
				order_id: order.id.clone(),
				from,
				to: new_status,
				actor: actor.to_string(),
			}))
			.ok();

		Ok(order)
	}

	/// Applies a status request submitted by another workflow service.
	pub async fn apply(&self, request: StatusRequest) -> Result<Order, CoreError> {
		self.transition(
			&request.order_id,
			request.status,
			&request.actor,
			request.reason,
		)
		.await
	}
}
