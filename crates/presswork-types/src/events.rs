//! Event types for inter-service communication.
//!
//! Domain events flow through a broadcast event bus so that cross-cutting
//! consumers (audit logging, notification fan-out) can react without coupling
//! to the producing service. Events announce facts after commit; they are
//! never load-bearing for the operation that produced them.
//!
//! Order-status side effects are the exception: a workflow that needs the
//! order moved submits an explicit [`StatusRequest`] command to the lifecycle
//! component, which is the only writer of `order.status`.

use crate::{DeliveryStatus, OrderStatus, ProductionStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main event type encompassing all domain events.
///
/// Events are categorized by the service that produces them, allowing
/// consumers to filter and handle specific event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoreEvent {
	/// Events from the orders service and the lifecycle machine.
	Order(OrderEvent),
	/// Events from the billing service.
	Billing(BillingEvent),
	/// Events from the design service.
	Design(DesignEvent),
	/// Events from the production service.
	Production(ProductionEvent),
	/// Events from the delivery service.
	Dispatch(DispatchEvent),
}

/// Events related to orders and their lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order has been created and persisted.
	Created {
		order_id: String,
		order_number: String,
		customer_id: String,
	},
	/// An order's editable fields or items were changed.
	Updated { order_id: String },
	/// The lifecycle machine committed a status transition.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
		actor: String,
	},
}

/// Events related to invoices, payments and expenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillingEvent {
	/// An invoice has been issued against an order.
	InvoiceIssued {
		invoice_id: String,
		invoice_number: String,
		order_id: String,
	},
	/// An invoice has been sent to the customer.
	InvoiceSent { invoice_id: String },
	/// A payment has been recorded and reconciled.
	PaymentRecorded {
		payment_id: String,
		payment_number: String,
		order_id: String,
		invoice_id: Option<String>,
		amount: Decimal,
	},
	/// A shop expense has been recorded.
	ExpenseRecorded {
		expense_id: String,
		expense_number: String,
		amount: Decimal,
	},
}

/// Events related to the design workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DesignEvent {
	/// A design task has been assigned to a designer.
	TaskAssigned {
		task_id: String,
		order_id: String,
		designer: String,
	},
	/// A new proof version has been submitted.
	ProofSubmitted {
		proof_id: String,
		task_id: String,
		version: u32,
	},
	/// A proof has been reviewed by the customer.
	ProofReviewed {
		proof_id: String,
		task_id: String,
		approved: bool,
	},
}

/// Events related to the production workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProductionEvent {
	/// A production task has been scheduled for an order.
	TaskScheduled { task_id: String, order_id: String },
	/// A production task moved to a new status.
	TaskProgressed {
		task_id: String,
		order_id: String,
		status: ProductionStatus,
	},
}

/// Events related to the delivery workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
	/// A delivery run has been scheduled for an order.
	DeliveryScheduled {
		delivery_id: String,
		order_id: String,
	},
	/// A delivery run moved to a new status.
	DeliveryProgressed {
		delivery_id: String,
		order_id: String,
		status: DeliveryStatus,
	},
}

/// Command asking the lifecycle machine to move an order.
///
/// Workflow services never touch `order.status` themselves; they hand one of
/// these to the lifecycle component and let it serialize the write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
	pub order_id: String,
	pub status: OrderStatus,
	/// Actor on whose behalf the transition is recorded.
	pub actor: String,
	/// Human-readable cause, stored as the history note.
	pub reason: Option<String>,
}
