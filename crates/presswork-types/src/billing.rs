//! Billing types.
//!
//! Invoices, payments and expenses. An invoice snapshots the order's money
//! figures at issue time; payments are immutable once recorded (a reversal is
//! a new `refund` payment); expenses are standalone numbered records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an invoice.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
	#[default]
	Draft,
	Sent,
	Paid,
	Partial,
	Overdue,
	Cancelled,
}

impl fmt::Display for InvoiceStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InvoiceStatus::Draft => write!(f, "draft"),
			InvoiceStatus::Sent => write!(f, "sent"),
			InvoiceStatus::Paid => write!(f, "paid"),
			InvoiceStatus::Partial => write!(f, "partial"),
			InvoiceStatus::Overdue => write!(f, "overdue"),
			InvoiceStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

/// An invoice issued against one order.
///
/// Money fields are a snapshot taken at issue time; later order edits do not
/// flow back into an existing invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
	pub id: String,
	/// Human-readable sequential number, e.g. `INV25080001`.
	pub invoice_number: String,
	pub order_id: String,
	pub subtotal: Decimal,
	pub discount: Decimal,
	/// Percentage rate applied to `subtotal - discount`.
	pub tax_rate: Decimal,
	pub tax_amount: Decimal,
	pub total_amount: Decimal,
	pub paid_amount: Decimal,
	pub status: InvoiceStatus,
	pub issue_date: DateTime<Utc>,
	pub due_date: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub terms: Option<String>,
	pub created_by: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Invoice {
	/// Applies a received amount to this invoice and reclassifies it.
	///
	/// `paid` when the running total covers `total_amount`, `partial`
	/// otherwise. Invoice status never feeds back into the order.
	pub fn apply_payment(&mut self, amount: Decimal) {
		self.paid_amount += amount;
		self.status = if self.paid_amount >= self.total_amount {
			InvoiceStatus::Paid
		} else {
			InvoiceStatus::Partial
		};
	}
}

/// Input for issuing an invoice against an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceInput {
	/// Percentage tax rate, defaults to zero.
	#[serde(default)]
	pub tax_rate: Decimal,
	/// Defaults to thirty days after the issue date.
	#[serde(default)]
	pub due_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default)]
	pub terms: Option<String>,
}

/// Partial update for an invoice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
	#[serde(default)]
	pub status: Option<InvoiceStatus>,
	#[serde(default)]
	pub due_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default)]
	pub terms: Option<String>,
}

/// How money changed hands.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
	#[default]
	Cash,
	BankTransfer,
	MobileBanking,
	Cheque,
	Credit,
}

/// What the payment represents relative to the order balance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
	Advance,
	#[default]
	Partial,
	Full,
	Refund,
}

/// A recorded payment against an order, optionally tied to an invoice.
///
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
	pub id: String,
	/// Human-readable sequential number, e.g. `PAY25080001`.
	pub payment_number: String,
	pub order_id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub invoice_id: Option<String>,
	pub amount: Decimal,
	pub payment_type: PaymentType,
	pub payment_method: PaymentMethod,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reference_number: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub received_by: String,
	pub received_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

/// Input for recording a payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentInput {
	pub order_id: String,
	#[serde(default)]
	pub invoice_id: Option<String>,
	/// Must be strictly positive.
	pub amount: Decimal,
	#[serde(default)]
	pub payment_type: PaymentType,
	#[serde(default)]
	pub payment_method: PaymentMethod,
	#[serde(default)]
	pub reference_number: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Category of a shop expense.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
	Materials,
	Utilities,
	Rent,
	Salary,
	Transport,
	Maintenance,
	Marketing,
	OfficeSupplies,
	Other,
}

impl ExpenseCategory {
	/// All categories, in display order.
	pub fn all() -> &'static [ExpenseCategory] {
		&[
			ExpenseCategory::Materials,
			ExpenseCategory::Utilities,
			ExpenseCategory::Rent,
			ExpenseCategory::Salary,
			ExpenseCategory::Transport,
			ExpenseCategory::Maintenance,
			ExpenseCategory::Marketing,
			ExpenseCategory::OfficeSupplies,
			ExpenseCategory::Other,
		]
	}
}

/// A standalone shop expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
	pub id: String,
	/// Human-readable sequential number, e.g. `EXP25080001`.
	pub expense_number: String,
	pub category: ExpenseCategory,
	pub description: String,
	pub amount: Decimal,
	pub payment_method: PaymentMethod,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reference_number: Option<String>,
	pub expense_date: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub vendor_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub created_by: String,
	pub created_at: DateTime<Utc>,
}

/// Input for recording an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseInput {
	pub category: ExpenseCategory,
	pub description: String,
	/// Must be strictly positive.
	pub amount: Decimal,
	#[serde(default)]
	pub payment_method: PaymentMethod,
	#[serde(default)]
	pub reference_number: Option<String>,
	/// Defaults to the recording time.
	#[serde(default)]
	pub expense_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub vendor_name: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dec(s: &str) -> Decimal {
		s.parse().unwrap()
	}

	fn invoice(total: &str) -> Invoice {
		let now = Utc::now();
		Invoice {
			id: "i1".into(),
			invoice_number: "INV25080001".into(),
			order_id: "o1".into(),
			subtotal: dec(total),
			discount: Decimal::ZERO,
			tax_rate: Decimal::ZERO,
			tax_amount: Decimal::ZERO,
			total_amount: dec(total),
			paid_amount: Decimal::ZERO,
			status: InvoiceStatus::Sent,
			issue_date: now,
			due_date: now,
			notes: None,
			terms: None,
			created_by: "tester".into(),
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn apply_payment_reclassifies_partial_then_paid() {
		let mut inv = invoice("110");
		inv.apply_payment(dec("60"));
		assert_eq!(inv.status, InvoiceStatus::Partial);
		assert_eq!(inv.paid_amount, dec("60"));

		inv.apply_payment(dec("50"));
		assert_eq!(inv.status, InvoiceStatus::Paid);
		assert_eq!(inv.paid_amount, dec("110"));
	}

	#[test]
	fn apply_payment_over_total_is_paid() {
		let mut inv = invoice("100");
		inv.apply_payment(dec("150"));
		assert_eq!(inv.status, InvoiceStatus::Paid);
	}

	#[test]
	fn expense_category_wire_names() {
		let json = serde_json::to_string(&ExpenseCategory::OfficeSupplies).unwrap();
		assert_eq!(json, "\"office_supplies\"");
		assert_eq!(ExpenseCategory::all().len(), 9);
	}

	#[test]
	fn payment_defaults() {
		let input: PaymentInput =
			serde_json::from_str(r#"{"order_id":"o1","amount":"25.00"}"#).unwrap();
		assert_eq!(input.payment_type, PaymentType::Partial);
		assert_eq!(input.payment_method, PaymentMethod::Cash);
		assert_eq!(input.amount, dec("25.00"));
	}
}
