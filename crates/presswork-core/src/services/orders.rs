//! Orders service.
//!
//! Creates and edits order aggregates. Every mutation runs the totals
//! derivation afterwards, so `subtotal`, `total_amount`, `due_amount` and
//! `payment_status` can never drift from the items, fees and payments they
//! are derived from. Status transitions are not handled here; they belong to
//! the lifecycle state machine.

use crate::engine::event_bus::EventBus;
use crate::state::LockMap;
use crate::utils::truncate_id;
use crate::CoreError;
use chrono::Utc;
use presswork_numbering::{NumberKind, NumberingService};
use presswork_storage::StorageService;
use presswork_types::{
	money, CoreEvent, Customer, NewOrder, Order, OrderEvent, OrderItem, OrderPatch, OrderStatus,
	OrderType, PaymentStatus, StatusChange, StorageKey,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service handling order creation and edits.
pub struct OrderService {
	storage: Arc<StorageService>,
	numbering: Arc<NumberingService>,
	locks: LockMap,
	event_bus: EventBus,
}

impl OrderService {
	pub fn new(
		storage: Arc<StorageService>,
		numbering: Arc<NumberingService>,
		locks: LockMap,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			numbering,
			locks,
			event_bus,
		}
	}

	/// Creates a new order for an active customer.
	///
	/// Validates the customer and every money input, assigns a fresh `SAP`
	/// number, computes the derived totals and writes the initial history
	/// entry. Pre-orders start in `pre_order`, everything else in `order`.
	#[instrument(skip_all, fields(customer_id = %truncate_id(&input.customer_id)))]
	pub async fn create_order(&self, input: NewOrder, actor: &str) -> Result<Order, CoreError> {
		let customer: Customer = self
			.storage
			.retrieve(StorageKey::Customers.as_str(), &input.customer_id)
			.await
			.map_err(|e| CoreError::from_storage("customer", &input.customer_id, e))?;
		if !customer.is_active {
			return Err(CoreError::Validation(format!(
				"customer {} is inactive",
				customer.company_name
			)));
		}
		if input.work_name.trim().is_empty() {
			return Err(CoreError::Validation("work_name must not be empty".into()));
		}

		money::validate_non_negative("discount", input.discount)?;
		money::validate_non_negative("tax_amount", input.tax_amount)?;
		money::validate_non_negative("design_fee", input.design_fee)?;
		money::validate_non_negative("urgency_fee", input.urgency_fee)?;
		money::validate_non_negative("cashing_fee", input.cashing_fee)?;
		money::validate_non_negative("misc_fee", input.misc_fee)?;

		let mut items = Vec::with_capacity(input.items.len());
		for spec in input.items {
			items.push(OrderItem::build(spec)?);
		}

		let now = Utc::now();
		let order_number = self.numbering.next_number(NumberKind::Order, now).await?;
		let status = match input.order_type {
			OrderType::PreOrder => OrderStatus::PreOrder,
			OrderType::RegularOrder => OrderStatus::Order,
		};

		let mut order = Order {
			id: Uuid::new_v4().to_string(),
			order_number,
			customer_id: input.customer_id,
			order_type: input.order_type,
			status,
			payment_status: PaymentStatus::Pending,
			work_name: input.work_name,
			description: input.description,
			order_date: now,
			expected_delivery_date: input.expected_delivery_date,
			actual_delivery_date: None,
			subtotal: Decimal::ZERO,
			discount: input.discount,
			tax_amount: input.tax_amount,
			design_fee: input.design_fee,
			urgency_fee: input.urgency_fee,
			cashing_fee: input.cashing_fee,
			misc_fee: input.misc_fee,
			total_amount: Decimal::ZERO,
			paid_amount: Decimal::ZERO,
			due_amount: Decimal::ZERO,
			special_instructions: input.special_instructions,
			internal_notes: input.internal_notes,
			items,
			materials: Vec::new(),
			history: vec![StatusChange {
				from: None,
				to: status,
				changed_by: actor.to_string(),
				changed_at: now,
				note: Some("Order created".to_string()),
			}],
			created_by: actor.to_string(),
			created_at: now,
			updated_at: now,
		};
		order.recompute_totals();

		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		self.event_bus
			.publish(CoreEvent::Order(OrderEvent::Created {
				order_id: order.id.clone(),
				order_number: order.order_number.clone(),
				customer_id: order.customer_id.clone(),
			}))
			.ok();

		Ok(order)
	}

	/// Applies a partial update to an order under its write lock.
	///
	/// A `Some` items batch replaces the whole item set; every item is
	/// re-validated and re-priced. The derived totals are recomputed
	/// afterwards regardless of which fields changed.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn update_order(
		&self,
		order_id: &str,
		patch: OrderPatch,
	) -> Result<Order, CoreError> {
		let lock = self.locks.lock_for(order_id);
		let _guard = lock.lock().await;

		let mut order: Order = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))?;

		if let Some(work_name) = patch.work_name {
			if work_name.trim().is_empty() {
				return Err(CoreError::Validation("work_name must not be empty".into()));
			}
			order.work_name = work_name;
		}
		if let Some(description) = patch.description {
			order.description = Some(description);
		}
		if let Some(expected) = patch.expected_delivery_date {
			order.expected_delivery_date = Some(expected);
		}
		if let Some(discount) = patch.discount {
			money::validate_non_negative("discount", discount)?;
			order.discount = discount;
		}
		if let Some(tax_amount) = patch.tax_amount {
			money::validate_non_negative("tax_amount", tax_amount)?;
			order.tax_amount = tax_amount;
		}
		if let Some(design_fee) = patch.design_fee {
			money::validate_non_negative("design_fee", design_fee)?;
			order.design_fee = design_fee;
		}
		if let Some(urgency_fee) = patch.urgency_fee {
			money::validate_non_negative("urgency_fee", urgency_fee)?;
			order.urgency_fee = urgency_fee;
		}
		if let Some(cashing_fee) = patch.cashing_fee {
			money::validate_non_negative("cashing_fee", cashing_fee)?;
			order.cashing_fee = cashing_fee;
		}
		if let Some(misc_fee) = patch.misc_fee {
			money::validate_non_negative("misc_fee", misc_fee)?;
			order.misc_fee = misc_fee;
		}
		if let Some(special_instructions) = patch.special_instructions {
			order.special_instructions = Some(special_instructions);
		}
		if let Some(internal_notes) = patch.internal_notes {
			order.internal_notes = Some(internal_notes);
		}
		if let Some(specs) = patch.items {
			let mut items = Vec::with_capacity(specs.len());
			for spec in specs {
				items.push(OrderItem::build(spec)?);
			}
			order.items = items;
		}
		if let Some(mut materials) = patch.materials {
			for material in &mut materials {
				if material.material_type.trim().is_empty() {
					return Err(CoreError::Validation(
						"material_type must not be empty".into(),
					));
				}
				money::validate_non_negative("quantity", material.quantity)?;
				money::validate_non_negative("unit_cost", material.unit_cost)?;
				material.total_cost = material.quantity * material.unit_cost;
			}
			order.materials = materials;
		}

		order.recompute_totals();
		order.updated_at = Utc::now();

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))?;

		self.event_bus
			.publish(CoreEvent::Order(OrderEvent::Updated {
				order_id: order_id.to_string(),
			}))
			.ok();

		Ok(order)
	}

	pub async fn get_order(&self, order_id: &str) -> Result<Order, CoreError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))
	}

	pub async fn list_orders(&self) -> Result<Vec<Order>, CoreError> {
		self.storage
			.list(StorageKey::Orders.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))
	}

	/// The append-only status trail of an order, oldest entry first.
	pub async fn order_history(&self, order_id: &str) -> Result<Vec<StatusChange>, CoreError> {
		Ok(self.get_order(order_id).await?.history)
	}
}
