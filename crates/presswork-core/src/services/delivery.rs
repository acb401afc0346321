//! Dispatch and delivery service.
//!
//! Schedules delivery runs for finished orders, falling back to the
//! customer's address book when the run does not name its own address or
//! phone. Progress reports push the order to `out_for_delivery` and
//! `delivered`.

use crate::engine::event_bus::EventBus;
use crate::state::OrderStateMachine;
use crate::utils::truncate_id;
use crate::CoreError;
use chrono::Utc;
use presswork_storage::StorageService;
use presswork_types::{
	CoreEvent, Customer, Delivery, DeliveryInput, DeliveryPatch, DeliveryStatus, DispatchEvent,
	Order, OrderStatus, StatusRequest, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service scheduling deliveries and recording their outcomes.
pub struct DeliveryService {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	event_bus: EventBus,
}

impl DeliveryService {
	pub fn new(
		storage: Arc<StorageService>,
		state_machine: Arc<OrderStateMachine>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			state_machine,
			event_bus,
		}
	}

	/// Schedules a delivery run for an order.
	///
	/// Address and phone fall back to the customer record when the input
	/// leaves them out.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn schedule(
		&self,
		order_id: &str,
		input: DeliveryInput,
	) -> Result<Delivery, CoreError> {
		let order: Order = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))?;
		if order.status.is_terminal() {
			return Err(CoreError::Validation(format!(
				"order {} is cancelled",
				order.order_number
			)));
		}
		let customer: Customer = self
			.storage
			.retrieve(StorageKey::Customers.as_str(), &order.customer_id)
			.await
			.map_err(|e| CoreError::from_storage("customer", &order.customer_id, e))?;

		let now = Utc::now();
		let delivery = Delivery {
			id: Uuid::new_v4().to_string(),
			order_id: order.id.clone(),
			status: DeliveryStatus::Scheduled,
			delivery_person_id: input.delivery_person_id,
			delivery_address: input.delivery_address.or(customer.address),
			contact_phone: input.contact_phone.or(customer.phone),
			scheduled_date: input.scheduled_date,
			actual_delivery_date: None,
			recipient_name: None,
			customer_feedback: None,
			rating: None,
			notes: input.notes,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::Deliveries.as_str(), &delivery.id, &delivery)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		tracing::info!(
			order_number = %order.order_number,
			scheduled_date = ?delivery.scheduled_date,
			"Delivery scheduled"
		);

		self.event_bus
			.publish(CoreEvent::Dispatch(DispatchEvent::DeliveryScheduled {
				delivery_id: delivery.id.clone(),
				order_id: delivery.order_id.clone(),
			}))
			.ok();

		Ok(delivery)
	}

	/// Applies a partial update to a delivery run.
	///
	/// Moving to `out_for_delivery` or `delivered` pushes the order to the
	/// matching status; `delivered` also stamps the run's actual date. A
	/// failed run keeps its reason appended to the notes.
	pub async fn update(
		&self,
		delivery_id: &str,
		patch: DeliveryPatch,
		actor: &str,
	) -> Result<Delivery, CoreError> {
		if let Some(rating) = patch.rating {
			if !(1..=5).contains(&rating) {
				return Err(CoreError::Validation(format!(
					"rating must be between 1 and 5, got {}",
					rating
				)));
			}
		}

		let mut delivery = self.get(delivery_id).await?;
		let now = Utc::now();

		if let Some(delivery_person_id) = patch.delivery_person_id {
			delivery.delivery_person_id = Some(delivery_person_id);
		}
		if let Some(scheduled_date) = patch.scheduled_date {
			delivery.scheduled_date = Some(scheduled_date);
		}
		if let Some(recipient_name) = patch.recipient_name {
			delivery.recipient_name = Some(recipient_name);
		}
		if let Some(customer_feedback) = patch.customer_feedback {
			delivery.customer_feedback = Some(customer_feedback);
		}
		if let Some(rating) = patch.rating {
			delivery.rating = Some(rating);
		}
		if let Some(notes) = patch.notes {
			delivery.notes = Some(notes);
		}

		let mut progressed = None;
		if let Some(status) = patch.status {
			if status != delivery.status {
				progressed = Some(status);
			}
			if status == DeliveryStatus::Delivered {
				delivery.actual_delivery_date = Some(now);
			}
			if status == DeliveryStatus::Failed {
				if let Some(reason) = patch.failure_reason {
					delivery.notes = Some(match delivery.notes.take() {
						Some(notes) => format!("{}\n{}", notes, reason),
						None => reason,
					});
				}
			}
			delivery.status = status;
		}
		delivery.updated_at = now;

		self.storage
			.update(StorageKey::Deliveries.as_str(), delivery_id, &delivery)
			.await
			.map_err(|e| CoreError::from_storage("delivery", delivery_id, e))?;

		if let Some(status) = progressed {
			self.event_bus
				.publish(CoreEvent::Dispatch(DispatchEvent::DeliveryProgressed {
					delivery_id: delivery.id.clone(),
					order_id: delivery.order_id.clone(),
					status,
				}))
				.ok();
			let order_status = match status {
				DeliveryStatus::OutForDelivery => Some(OrderStatus::OutForDelivery),
				DeliveryStatus::Delivered => Some(OrderStatus::Delivered),
				_ => None,
			};
			if let Some(order_status) = order_status {
				self.state_machine
					.apply(StatusRequest {
						order_id: delivery.order_id.clone(),
						status: order_status,
						actor: actor.to_string(),
						reason: Some(format!("Delivery {}", status)),
					})
					.await?;
			}
		}

		Ok(delivery)
	}

	pub async fn get(&self, delivery_id: &str) -> Result<Delivery, CoreError> {
		self.storage
			.retrieve(StorageKey::Deliveries.as_str(), delivery_id)
			.await
			.map_err(|e| CoreError::from_storage("delivery", delivery_id, e))
	}

	/// Lists delivery runs, optionally only those of one order.
	pub async fn list(&self, order_id: Option<&str>) -> Result<Vec<Delivery>, CoreError> {
		let mut deliveries: Vec<Delivery> = self
			.storage
			.list(StorageKey::Deliveries.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		if let Some(order_id) = order_id {
			deliveries.retain(|d| d.order_id == order_id);
		}
		Ok(deliveries)
	}
}
