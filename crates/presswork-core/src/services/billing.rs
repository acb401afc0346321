//! Billing service: invoices, payments and expenses.
//!
//! Payment recording is the one operation that touches three records at
//! once; it runs under the order's write lock and, because the storage
//! collaborator has no transactions, commits in an order that can be unwound
//! when a late write fails. Invoices snapshot the order's money figures at
//! issue time and never track later order edits.

use crate::engine::event_bus::EventBus;
use crate::state::LockMap;
use crate::utils::truncate_id;
use crate::CoreError;
use chrono::{Duration, Utc};
use presswork_numbering::{NumberKind, NumberingService};
use presswork_storage::{StorageError, StorageService};
use presswork_types::{
	money, BillingEvent, CoreEvent, Expense, ExpenseCategory, ExpenseInput, Invoice,
	InvoiceInput, InvoicePatch, InvoiceStatus, Order, Payment, PaymentInput, StorageKey,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service reconciling money against orders and invoices.
pub struct BillingService {
	storage: Arc<StorageService>,
	numbering: Arc<NumberingService>,
	locks: LockMap,
	event_bus: EventBus,
}

impl BillingService {
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

	/// Issues a draft invoice against an order.
	///
	/// Snapshots `subtotal` and `discount` from the order, applies the
	/// percentage tax rate to the taxable base with two-place rounding and
	/// defaults the due date to thirty days after issue.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn create_invoice(
		&self,
		order_id: &str,
		input: InvoiceInput,
		actor: &str,
	) -> Result<Invoice, CoreError> {
		money::validate_non_negative("tax_rate", input.tax_rate)?;

		// Snapshot under the order lock so a concurrent edit cannot tear
		// the figures.
		let lock = self.locks.lock_for(order_id);
		let _guard = lock.lock().await;

		let order: Order = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| CoreError::from_storage("order", order_id, e))?;

		let now = Utc::now();
		let invoice_number = self.numbering.next_number(NumberKind::Invoice, now).await?;
		let taxable = order.subtotal - order.discount;
		let tax_amount = money::percentage(taxable, input.tax_rate);

		let invoice = Invoice {
			id: Uuid::new_v4().to_string(),
			invoice_number,
			order_id: order_id.to_string(),
			subtotal: order.subtotal,
			discount: order.discount,
			tax_rate: input.tax_rate,
			tax_amount,
			total_amount: taxable + tax_amount,
			paid_amount: Decimal::ZERO,
			status: InvoiceStatus::Draft,
			issue_date: now,
			due_date: input.due_date.unwrap_or(now + Duration::days(30)),
			notes: input.notes,
			terms: input.terms,
			created_by: actor.to_string(),
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::Invoices.as_str(), &invoice.id, &invoice)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		self.event_bus
			.publish(CoreEvent::Billing(BillingEvent::InvoiceIssued {
				invoice_id: invoice.id.clone(),
				invoice_number: invoice.invoice_number.clone(),
				order_id: invoice.order_id.clone(),
			}))
			.ok();

		Ok(invoice)
	}

	/// Marks a draft invoice as sent to the customer.
	pub async fn send_invoice(&self, invoice_id: &str) -> Result<Invoice, CoreError> {
		let mut invoice = self.get_invoice(invoice_id).await?;
		match invoice.status {
			InvoiceStatus::Draft | InvoiceStatus::Sent => {},
			other => {
				return Err(CoreError::Validation(format!(
					"invoice {} is {} and cannot be sent",
					invoice.invoice_number, other
				)));
			},
		}
		invoice.status = InvoiceStatus::Sent;
		invoice.updated_at = Utc::now();

		self.storage
			.update(StorageKey::Invoices.as_str(), invoice_id, &invoice)
			.await
			.map_err(|e| CoreError::from_storage("invoice", invoice_id, e))?;

		self.event_bus
			.publish(CoreEvent::Billing(BillingEvent::InvoiceSent {
				invoice_id: invoice_id.to_string(),
			}))
			.ok();

		Ok(invoice)
	}

	/// Applies a partial update to an invoice.
	///
	/// `paid` and `partial` are derived by payment reconciliation and cannot
	/// be set by hand; the patch may still move an invoice to `overdue` or
	/// `cancelled` for manual bookkeeping.
	pub async fn update_invoice(
		&self,
		invoice_id: &str,
		patch: InvoicePatch,
	) -> Result<Invoice, CoreError> {
		let mut invoice = self.get_invoice(invoice_id).await?;

		if let Some(status) = patch.status {
			if matches!(status, InvoiceStatus::Paid | InvoiceStatus::Partial) {
				return Err(CoreError::Validation(
					"paid and partial are set by payment reconciliation".into(),
				));
			}
			invoice.status = status;
		}
		if let Some(due_date) = patch.due_date {
			invoice.due_date = due_date;
		}
		if let Some(notes) = patch.notes {
			invoice.notes = Some(notes);
		}
		if let Some(terms) = patch.terms {
			invoice.terms = Some(terms);
		}
		invoice.updated_at = Utc::now();

		self.storage
			.update(StorageKey::Invoices.as_str(), invoice_id, &invoice)
			.await
			.map_err(|e| CoreError::from_storage("invoice", invoice_id, e))?;

		Ok(invoice)
	}

	/// Records a payment and reconciles it against the order and, when
	/// given, an invoice of that same order.
	///
	/// Runs under the order's write lock: the payment record, the order's
	/// `paid_amount`/derived fields and the invoice classification commit
	/// together or not at all.
	#[instrument(skip_all, fields(order_id = %truncate_id(&input.order_id)))]
	pub async fn record_payment(
		&self,
		input: PaymentInput,
		actor: &str,
	) -> Result<Payment, CoreError> {
		money::validate_positive("amount", input.amount)?;

		let lock = self.locks.lock_for(&input.order_id);
		let _guard = lock.lock().await;

		let order: Order = self
			.storage
			.retrieve(StorageKey::Orders.as_str(), &input.order_id)
			.await
			.map_err(|e| CoreError::from_storage("order", &input.order_id, e))?;

		let mut invoice: Option<Invoice> = match &input.invoice_id {
			Some(invoice_id) => {
				let invoice: Invoice = self
					.storage
					.retrieve(StorageKey::Invoices.as_str(), invoice_id)
					.await
					.map_err(|e| CoreError::from_storage("invoice", invoice_id, e))?;
				if invoice.order_id != input.order_id {
					return Err(CoreError::Validation(format!(
						"invoice {} belongs to a different order",
						invoice.invoice_number
					)));
				}
				Some(invoice)
			},
			None => None,
		};

		let now = Utc::now();
		let payment_number = self.numbering.next_number(NumberKind::Payment, now).await?;
		let payment = Payment {
			id: Uuid::new_v4().to_string(),
			payment_number,
			order_id: input.order_id.clone(),
			invoice_id: input.invoice_id.clone(),
			amount: input.amount,
			payment_type: input.payment_type,
			payment_method: input.payment_method,
			reference_number: input.reference_number,
			notes: input.notes,
			received_by: actor.to_string(),
			received_at: now,
			created_at: now,
		};

		let mut reconciled = order.clone();
		reconciled.paid_amount += payment.amount;
		reconciled.recompute_totals();
		reconciled.updated_at = now;

		// The storage collaborator has no transactions, so the writes are
		// ordered for unwinding: the payment record lands first and is
		// removed again if the order or invoice write fails.
		self.storage
			.store(StorageKey::Payments.as_str(), &payment.id, &payment)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		if let Err(err) = self
			.storage
			.update(StorageKey::Orders.as_str(), &order.id, &reconciled)
			.await
		{
			return Err(self.unwind_payment(&payment, None, err).await);
		}

		if let Some(invoice) = invoice.as_mut() {
			invoice.apply_payment(payment.amount);
			invoice.updated_at = now;
			if let Err(err) = self
				.storage
				.update(StorageKey::Invoices.as_str(), &invoice.id, invoice)
				.await
			{
				return Err(self.unwind_payment(&payment, Some(&order), err).await);
			}
		}

		tracing::info!(
			payment_number = %payment.payment_number,
			order_number = %reconciled.order_number,
			amount = %payment.amount,
			payment_status = %reconciled.payment_status,
			"Payment recorded"
		);

		self.event_bus
			.publish(CoreEvent::Billing(BillingEvent::PaymentRecorded {
				payment_id: payment.id.clone(),
				payment_number: payment.payment_number.clone(),
				order_id: payment.order_id.clone(),
				invoice_id: payment.invoice_id.clone(),
				amount: payment.amount,
			}))
			.ok();

		Ok(payment)
	}

	/// Rolls back a partially committed payment.
	///
	/// Returns the error to surface: a plain storage error when the books
	/// could be restored, an invariant violation when they could not.
	async fn unwind_payment(
		&self,
		payment: &Payment,
		restore_order: Option<&Order>,
		cause: StorageError,
	) -> CoreError {
		let mut restored = true;

		if let Some(order) = restore_order {
			if let Err(e) = self
				.storage
				.update(StorageKey::Orders.as_str(), &order.id, order)
				.await
			{
				tracing::error!(
					order_id = %truncate_id(&order.id),
					error = %e,
					"Failed to restore order while unwinding a payment"
				);
				restored = false;
			}
		}
		if let Err(e) = self
			.storage
			.remove(StorageKey::Payments.as_str(), &payment.id)
			.await
		{
			tracing::error!(
				payment_number = %payment.payment_number,
				error = %e,
				"Failed to remove payment while unwinding"
			);
			restored = false;
		}

		if restored {
			CoreError::Storage(cause.to_string())
		} else {
			CoreError::Invariant(format!(
				"payment {} may be recorded without matching order books: {}",
				payment.payment_number, cause
			))
		}
	}

	/// Records a standalone shop expense.
	pub async fn record_expense(
		&self,
		input: ExpenseInput,
		actor: &str,
	) -> Result<Expense, CoreError> {
		money::validate_positive("amount", input.amount)?;
		if input.description.trim().is_empty() {
			return Err(CoreError::Validation(
				"description must not be empty".into(),
			));
		}

		let now = Utc::now();
		let expense_number = self.numbering.next_number(NumberKind::Expense, now).await?;
		let expense = Expense {
			id: Uuid::new_v4().to_string(),
			expense_number,
			category: input.category,
			description: input.description,
			amount: input.amount,
			payment_method: input.payment_method,
			reference_number: input.reference_number,
			expense_date: input.expense_date.unwrap_or(now),
			vendor_name: input.vendor_name,
			notes: input.notes,
			created_by: actor.to_string(),
			created_at: now,
		};

		self.storage
			.store(StorageKey::Expenses.as_str(), &expense.id, &expense)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		self.event_bus
			.publish(CoreEvent::Billing(BillingEvent::ExpenseRecorded {
				expense_id: expense.id.clone(),
				expense_number: expense.expense_number.clone(),
				amount: expense.amount,
			}))
			.ok();

		Ok(expense)
	}

	/// The fixed list of expense categories, in display order.
	pub fn expense_categories(&self) -> &'static [ExpenseCategory] {
		ExpenseCategory::all()
	}

	pub async fn get_invoice(&self, invoice_id: &str) -> Result<Invoice, CoreError> {
		self.storage
			.retrieve(StorageKey::Invoices.as_str(), invoice_id)
			.await
			.map_err(|e| CoreError::from_storage("invoice", invoice_id, e))
	}

	pub async fn list_invoices(&self) -> Result<Vec<Invoice>, CoreError> {
		self.storage
			.list(StorageKey::Invoices.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))
	}

	/// Lists payments, optionally only those against one order.
	pub async fn list_payments(&self, order_id: Option<&str>) -> Result<Vec<Payment>, CoreError> {
		let mut payments: Vec<Payment> = self
			.storage
			.list(StorageKey::Payments.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		if let Some(order_id) = order_id {
			payments.retain(|p| p.order_id == order_id);
		}
		Ok(payments)
	}

	pub async fn list_expenses(&self) -> Result<Vec<Expense>, CoreError> {
		self.storage
			.list(StorageKey::Expenses.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))
	}
}
