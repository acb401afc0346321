//! Order aggregate types.
//!
//! Defines the order aggregate root together with its owned children: line
//! items with their per-material cost breakdown, material usage records and
//! the append-only status history. Derived money fields (`subtotal`,
//! `total_amount`, `due_amount`, `payment_status`) are written exclusively
//! by [`Order::recompute_totals`]; no other code path may set them.

use crate::money::{self, MoneyError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commercial type of an order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
	/// Order taken before final confirmation, starts in the `pre_order` state.
	PreOrder,
	/// Normal confirmed order.
	#[default]
	RegularOrder,
}

/// Lifecycle status of an order.
///
/// Covers the printed-catalog ladder (the states the shop prints on job
/// tickets) plus the statuses the design, production and delivery workflows
/// write onto the order as side effects of their own progress. Transitions
/// are deliberately permissive; only `cancelled` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Taken but not yet confirmed (pre-orders only).
	PreOrder,
	/// Confirmed order, first catalog state.
	Order,
	/// A designer has been assigned to the job.
	DesignerAssigned,
	/// Sent to the design desk.
	DesignSent,
	/// A design proof is with the customer.
	ProofSent,
	/// Proof handed over (catalog label).
	ProofGiven,
	/// Customer approved the proof.
	ProofConfirmed,
	/// Proofing finished (catalog label).
	ProofComplete,
	/// Plates are being set.
	PlateSetting,
	/// Production has started on the job.
	InProcess,
	/// On the press.
	Printing,
	/// Printing finished.
	PrintingComplete,
	/// In the bindery.
	Binding,
	/// Sent to binding (catalog label).
	BindingSent,
	/// Final quality inspection.
	QualityCheck,
	/// Production done, waiting for dispatch.
	ReadyForDelivery,
	/// Packed and ready for the customer.
	OrderReady,
	/// With the delivery person.
	OutForDelivery,
	/// Handed over to the customer.
	Delivered,
	/// Cancelled; terminal.
	Cancelled,
}

impl OrderStatus {
	/// The printed-catalog ladder in progress order.
	pub const CATALOG: [OrderStatus; 10] = [
		OrderStatus::Order,
		OrderStatus::DesignSent,
		OrderStatus::ProofGiven,
		OrderStatus::ProofComplete,
		OrderStatus::PlateSetting,
		OrderStatus::PrintingComplete,
		OrderStatus::BindingSent,
		OrderStatus::OrderReady,
		OrderStatus::Delivered,
		OrderStatus::Cancelled,
	];

	/// Whether no further transitions are allowed out of this status.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Cancelled)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			OrderStatus::PreOrder => "pre_order",
			OrderStatus::Order => "order",
			OrderStatus::DesignerAssigned => "designer_assigned",
			OrderStatus::DesignSent => "design_sent",
			OrderStatus::ProofSent => "proof_sent",
			OrderStatus::ProofGiven => "proof_given",
			OrderStatus::ProofConfirmed => "proof_confirmed",
			OrderStatus::ProofComplete => "proof_complete",
			OrderStatus::PlateSetting => "plate_setting",
			OrderStatus::InProcess => "in_process",
			OrderStatus::Printing => "printing",
			OrderStatus::PrintingComplete => "printing_complete",
			OrderStatus::Binding => "binding",
			OrderStatus::BindingSent => "binding_sent",
			OrderStatus::QualityCheck => "quality_check",
			OrderStatus::ReadyForDelivery => "ready_for_delivery",
			OrderStatus::OrderReady => "order_ready",
			OrderStatus::OutForDelivery => "out_for_delivery",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		};
		write!(f, "{}", s)
	}
}

/// Settlement state of an order, derived from `due_amount` and `paid_amount`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
	/// Fully settled (`due <= 0`, overpayment included).
	Paid,
	/// Some money received, balance outstanding.
	Partial,
	/// Nothing received yet.
	#[default]
	Pending,
}

impl fmt::Display for PaymentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PaymentStatus::Paid => write!(f, "paid"),
			PaymentStatus::Partial => write!(f, "partial"),
			PaymentStatus::Pending => write!(f, "pending"),
		}
	}
}

/// Per-material cost breakdown of an order item.
///
/// Informational costing only; order totals are derived from item
/// `total_price`, never from this breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MaterialCosts {
	#[serde(default)]
	pub plate: Decimal,
	#[serde(default)]
	pub paper: Decimal,
	#[serde(default)]
	pub duplicate: Decimal,
	#[serde(default)]
	pub ink: Decimal,
	#[serde(default)]
	pub printing: Decimal,
	#[serde(default)]
	pub binding: Decimal,
	#[serde(default)]
	pub laminating: Decimal,
	#[serde(default)]
	pub others: Decimal,
}

impl MaterialCosts {
	/// Sum of all cost components.
	pub fn total(&self) -> Decimal {
		self.plate
			+ self.paper
			+ self.duplicate
			+ self.ink
			+ self.printing
			+ self.binding
			+ self.laminating
			+ self.others
	}

	fn validate(&self) -> Result<(), MoneyError> {
		money::validate_non_negative("plate", self.plate)?;
		money::validate_non_negative("paper", self.paper)?;
		money::validate_non_negative("duplicate", self.duplicate)?;
		money::validate_non_negative("ink", self.ink)?;
		money::validate_non_negative("printing", self.printing)?;
		money::validate_non_negative("binding", self.binding)?;
		money::validate_non_negative("laminating", self.laminating)?;
		money::validate_non_negative("others", self.others)
	}
}

/// A line item belonging to exactly one order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
	pub product_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub quantity: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub size: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub material_type: Option<String>,
	pub unit_price: Decimal,
	/// Always `quantity * unit_price`; set by [`OrderItem::build`].
	pub total_price: Decimal,
	#[serde(default)]
	pub costs: MaterialCosts,
	/// Free-form product specification (dimensions, paper grade, ...).
	#[serde(default)]
	pub specifications: serde_json::Value,
}

impl OrderItem {
	/// Validates an item specification and computes its total price.
	pub fn build(spec: NewOrderItem) -> Result<Self, MoneyError> {
		money::validate_quantity(spec.quantity)?;
		money::validate_non_negative("unit_price", spec.unit_price)?;
		spec.costs.validate()?;

		let total_price = Decimal::from(spec.quantity) * spec.unit_price;
		Ok(Self {
			product_name: spec.product_name,
			description: spec.description,
			quantity: spec.quantity,
			size: spec.size,
			color: spec.color,
			material_type: spec.material_type,
			unit_price: spec.unit_price,
			total_price,
			costs: spec.costs,
			specifications: spec.specifications,
		})
	}
}

/// Input for creating or replacing an order item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrderItem {
	pub product_name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub quantity: u32,
	#[serde(default)]
	pub size: Option<String>,
	#[serde(default)]
	pub color: Option<String>,
	#[serde(default)]
	pub material_type: Option<String>,
	pub unit_price: Decimal,
	#[serde(default)]
	pub costs: MaterialCosts,
	#[serde(default)]
	pub specifications: serde_json::Value,
}

/// Material usage recorded against an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderMaterial {
	pub material_type: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub material_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub quantity: Decimal,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub unit: Option<String>,
	pub unit_cost: Decimal,
	/// Always `quantity * unit_cost`.
	pub total_cost: Decimal,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// One entry in an order's status history.
///
/// Entries are append-only: written once on creation or transition, never
/// edited or removed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
	/// Status before the change; `None` for the creation entry.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub from: Option<OrderStatus>,
	pub to: OrderStatus,
	pub changed_by: String,
	pub changed_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
}

/// The order aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier (UUID).
	pub id: String,
	/// Human-readable sequential number, e.g. `SAP25080001`.
	pub order_number: String,
	pub customer_id: String,
	pub order_type: OrderType,
	pub status: OrderStatus,
	/// Derived from `due_amount`/`paid_amount`; never set directly.
	pub payment_status: PaymentStatus,
	pub work_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	pub order_date: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expected_delivery_date: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actual_delivery_date: Option<DateTime<Utc>>,
	/// Derived: sum of item totals.
	pub subtotal: Decimal,
	pub discount: Decimal,
	pub tax_amount: Decimal,
	pub design_fee: Decimal,
	pub urgency_fee: Decimal,
	pub cashing_fee: Decimal,
	pub misc_fee: Decimal,
	/// Derived: `subtotal + fees - discount + tax_amount`.
	pub total_amount: Decimal,
	pub paid_amount: Decimal,
	/// Derived: `total_amount - paid_amount`. Negative only on overpayment.
	pub due_amount: Decimal,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub special_instructions: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub internal_notes: Option<String>,
	#[serde(default)]
	pub items: Vec<OrderItem>,
	#[serde(default)]
	pub materials: Vec<OrderMaterial>,
	/// Append-only status trail, oldest first.
	#[serde(default)]
	pub history: Vec<StatusChange>,
	pub created_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Sum of the four extra fee fields.
	pub fn extra_fees_total(&self) -> Decimal {
		self.design_fee + self.urgency_fee + self.cashing_fee + self.misc_fee
	}

	/// Recomputes every derived money field from the current items, fees,
	/// discount, tax and paid amount.
	///
	/// This is the single writer of `subtotal`, `total_amount`, `due_amount`
	/// and `payment_status`; it must run after every item, fee, discount or
	/// payment mutation.
	pub fn recompute_totals(&mut self) {
		self.subtotal = self.items.iter().map(|i| i.total_price).sum();
		self.total_amount =
			self.subtotal + self.extra_fees_total() - self.discount + self.tax_amount;
		self.due_amount = self.total_amount - self.paid_amount;
		self.payment_status = if self.due_amount <= Decimal::ZERO {
			PaymentStatus::Paid
		} else if self.paid_amount > Decimal::ZERO {
			PaymentStatus::Partial
		} else {
			PaymentStatus::Pending
		};
	}
}

/// Input for creating an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
	pub customer_id: String,
	#[serde(default)]
	pub order_type: OrderType,
	pub work_name: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub expected_delivery_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub discount: Decimal,
	#[serde(default)]
	pub tax_amount: Decimal,
	#[serde(default)]
	pub design_fee: Decimal,
	#[serde(default)]
	pub urgency_fee: Decimal,
	#[serde(default)]
	pub cashing_fee: Decimal,
	#[serde(default)]
	pub misc_fee: Decimal,
	#[serde(default)]
	pub special_instructions: Option<String>,
	#[serde(default)]
	pub internal_notes: Option<String>,
	#[serde(default)]
	pub items: Vec<NewOrderItem>,
}

/// Partial update for an order.
///
/// `None` keeps the stored value; `Some` replaces it. A `Some` items batch
/// replaces the whole item set (all-or-nothing), mirroring how item edits
/// arrive from the order desk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
	#[serde(default)]
	pub work_name: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub expected_delivery_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub discount: Option<Decimal>,
	#[serde(default)]
	pub tax_amount: Option<Decimal>,
	#[serde(default)]
	pub design_fee: Option<Decimal>,
	#[serde(default)]
	pub urgency_fee: Option<Decimal>,
	#[serde(default)]
	pub cashing_fee: Option<Decimal>,
	#[serde(default)]
	pub misc_fee: Option<Decimal>,
	#[serde(default)]
	pub special_instructions: Option<String>,
	#[serde(default)]
	pub internal_notes: Option<String>,
	#[serde(default)]
	pub items: Option<Vec<NewOrderItem>>,
	#[serde(default)]
	pub materials: Option<Vec<OrderMaterial>>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;

	fn dec(s: &str) -> Decimal {
		s.parse().unwrap()
	}

	fn item(quantity: u32, unit_price: &str) -> OrderItem {
		OrderItem::build(NewOrderItem {
			product_name: "Business cards".into(),
			description: None,
			quantity,
			size: None,
			color: None,
			material_type: None,
			unit_price: dec(unit_price),
			costs: MaterialCosts::default(),
			specifications: serde_json::Value::Null,
		})
		.unwrap()
	}

	fn bare_order() -> Order {
		let now = Utc::now();
		Order {
			id: "o1".into(),
			order_number: "SAP25080001".into(),
			customer_id: "c1".into(),
			order_type: OrderType::RegularOrder,
			status: OrderStatus::Order,
			payment_status: PaymentStatus::Pending,
			work_name: "Catalog print".into(),
			description: None,
			order_date: now,
			expected_delivery_date: None,
			actual_delivery_date: None,
			subtotal: Decimal::ZERO,
			discount: Decimal::ZERO,
			tax_amount: Decimal::ZERO,
			design_fee: Decimal::ZERO,
			urgency_fee: Decimal::ZERO,
			cashing_fee: Decimal::ZERO,
			misc_fee: Decimal::ZERO,
			total_amount: Decimal::ZERO,
			paid_amount: Decimal::ZERO,
			due_amount: Decimal::ZERO,
			special_instructions: None,
			internal_notes: None,
			items: Vec::new(),
			materials: Vec::new(),
			history: Vec::new(),
			created_by: "tester".into(),
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn item_total_is_quantity_times_unit_price() {
		let it = item(10, "5");
		assert_eq!(it.total_price, dec("50"));
	}

	#[test]
	fn item_build_rejects_zero_quantity() {
		let err = OrderItem::build(NewOrderItem {
			product_name: "x".into(),
			description: None,
			quantity: 0,
			size: None,
			color: None,
			material_type: None,
			unit_price: dec("1"),
			costs: MaterialCosts::default(),
			specifications: serde_json::Value::Null,
		});
		assert!(err.is_err());
	}

	#[test]
	fn totals_follow_the_derivation_exactly() {
		// Two items (10x5 = 50, 3x20 = 60), design fee 100, discount 10.
		let mut order = bare_order();
		order.items = vec![item(10, "5"), item(3, "20")];
		order.design_fee = dec("100");
		order.discount = dec("10");
		order.recompute_totals();

		assert_eq!(order.subtotal, dec("110"));
		assert_eq!(order.total_amount, dec("200"));
		assert_eq!(order.due_amount, dec("200"));
		assert_eq!(order.payment_status, PaymentStatus::Pending);
	}

	#[test]
	fn payment_status_classification() {
		let mut order = bare_order();
		order.items = vec![item(1, "100")];

		order.paid_amount = dec("40");
		order.recompute_totals();
		assert_eq!(order.payment_status, PaymentStatus::Partial);
		assert_eq!(order.due_amount, dec("60"));

		order.paid_amount = dec("100");
		order.recompute_totals();
		assert_eq!(order.payment_status, PaymentStatus::Paid);
		assert_eq!(order.due_amount, dec("0"));

		// Overpayment stays classified as paid, due goes negative.
		order.paid_amount = dec("120");
		order.recompute_totals();
		assert_eq!(order.payment_status, PaymentStatus::Paid);
		assert_eq!(order.due_amount, dec("-20"));
	}

	#[test]
	fn items_without_price_contribute_zero() {
		let mut order = bare_order();
		order.items = vec![item(5, "0"), item(2, "3")];
		order.recompute_totals();
		assert_eq!(order.subtotal, dec("6"));
	}

	#[test]
	fn extra_fees_sum_all_four_categories() {
		let mut order = bare_order();
		order.design_fee = dec("10");
		order.urgency_fee = dec("20");
		order.cashing_fee = dec("30");
		order.misc_fee = dec("40");
		assert_eq!(order.extra_fees_total(), dec("100"));
	}

	#[test]
	fn material_costs_total() {
		let costs = MaterialCosts {
			plate: dec("1"),
			paper: dec("2"),
			ink: dec("3"),
			..Default::default()
		};
		assert_eq!(costs.total(), dec("6"));
	}

	#[test]
	fn status_serializes_to_catalog_vocabulary() {
		let json = serde_json::to_string(&OrderStatus::DesignSent).unwrap();
		assert_eq!(json, "\"design_sent\"");
		assert_eq!(OrderStatus::ProofConfirmed.to_string(), "proof_confirmed");
	}

	#[test]
	fn catalog_ladder_runs_from_order_to_cancelled() {
		assert_eq!(OrderStatus::CATALOG.first(), Some(&OrderStatus::Order));
		assert_eq!(OrderStatus::CATALOG.last(), Some(&OrderStatus::Cancelled));
		assert!(OrderStatus::Cancelled.is_terminal());
		assert!(!OrderStatus::Delivered.is_terminal());
	}
}
