//! Core engine that wires the shop's services together.
//!
//! The engine owns one instance of every domain service plus the shared
//! storage, event bus and order state machine. Its main loop consumes the
//! event bus into a structured audit trail and runs periodic storage
//! cleanup until a shutdown signal arrives.

pub mod event_bus;
pub mod lifecycle;

use crate::services::{
	BillingService, CustomerService, DeliveryService, DesignService, OrderService,
	ProductionService,
};
use crate::state::OrderStateMachine;
use crate::utils::truncate_id;
use crate::CoreError;
use presswork_config::Config;
use presswork_storage::StorageService;
use presswork_types::{
	BillingEvent, CoreEvent, DesignEvent, DispatchEvent, OrderEvent, ProductionEvent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Semaphore;

/// Engine tying the print shop's services to one storage backend and
/// event bus.
#[derive(Clone)]
pub struct Engine {
	/// Service configuration.
	pub(crate) config: Config,
	/// Storage service shared by every domain service.
	pub(crate) storage: Arc<StorageService>,
	/// Event bus for inter-service notifications.
	pub(crate) event_bus: event_bus::EventBus,
	/// Single writer of order status.
	pub(crate) state_machine: Arc<OrderStateMachine>,
	pub(crate) customers: Arc<CustomerService>,
	pub(crate) orders: Arc<OrderService>,
	pub(crate) billing: Arc<BillingService>,
	pub(crate) design: Arc<DesignService>,
	pub(crate) production: Arc<ProductionService>,
	pub(crate) delivery: Arc<DeliveryService>,
}

impl std::fmt::Debug for Engine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Engine").finish_non_exhaustive()
	}
}

impl Engine {
	/// Main loop: recovery sweep, then audit events until shutdown.
	pub async fn run(&self) -> Result<(), CoreError> {
		self.initialize().await?;

		let mut events = self.event_bus.subscribe();

		// Periodic storage cleanup runs beside the event loop.
		let storage = self.storage.clone();
		let cleanup_interval = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		let cleanup_handle = tokio::spawn(async move {
			let mut interval = cleanup_interval;
			loop {
				interval.tick().await;
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					},
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					},
					_ => {},
				}
			}
		});

		let semaphore = Arc::new(Semaphore::new(self.config.engine.max_concurrent_handlers));

		loop {
			tokio::select! {
				event = events.recv() => match event {
					Ok(event) => {
						self.spawn_audit(&semaphore, event).await;
					},
					Err(RecvError::Lagged(missed)) => {
						tracing::warn!(missed, "Audit trail lagged behind the event bus");
					},
					Err(RecvError::Closed) => break,
				},

				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Shutdown signal received");
					break;
				}
			}
		}

		cleanup_handle.abort();
		self.shutdown().await;
		Ok(())
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the order state machine.
	pub fn state_machine(&self) -> &Arc<OrderStateMachine> {
		&self.state_machine
	}

	pub fn customers(&self) -> &Arc<CustomerService> {
		&self.customers
	}

	pub fn orders(&self) -> &Arc<OrderService> {
		&self.orders
	}

	pub fn billing(&self) -> &Arc<BillingService> {
		&self.billing
	}

	pub fn design(&self) -> &Arc<DesignService> {
		&self.design
	}

	pub fn production(&self) -> &Arc<ProductionService> {
		&self.production
	}

	pub fn delivery(&self) -> &Arc<DeliveryService> {
		&self.delivery
	}

	/// Spawns an audit task for one event under the concurrency limit.
	async fn spawn_audit(&self, semaphore: &Arc<Semaphore>, event: CoreEvent) {
		match semaphore.clone().acquire_owned().await {
			Ok(permit) => {
				tokio::spawn(async move {
					let _permit = permit; // Keep permit alive for duration of task
					audit_event(&event);
				});
			},
			Err(e) => {
				tracing::error!("Failed to acquire semaphore permit: {}", e);
			},
		}
	}
}

/// Writes one audit line per event, keyed by entity numbers where the
/// event carries them.
fn audit_event(event: &CoreEvent) {
	match event {
		CoreEvent::Order(OrderEvent::Created {
			order_id,
			order_number,
			customer_id,
		}) => {
			tracing::info!(
				order_id = %truncate_id(order_id),
				order_number = %order_number,
				customer_id = %truncate_id(customer_id),
				"Audit: order created"
			);
		},
		CoreEvent::Order(OrderEvent::Updated { order_id }) => {
			tracing::info!(order_id = %truncate_id(order_id), "Audit: order updated");
		},
		CoreEvent::Order(OrderEvent::StatusChanged {
			order_id,
			from,
			to,
			actor,
		}) => {
			tracing::info!(
				order_id = %truncate_id(order_id),
				from = %from,
				to = %to,
				actor = %actor,
				"Audit: order status changed"
			);
		},
		CoreEvent::Billing(BillingEvent::InvoiceIssued {
			invoice_id,
			invoice_number,
			order_id,
		}) => {
			tracing::info!(
				invoice_id = %truncate_id(invoice_id),
				invoice_number = %invoice_number,
				order_id = %truncate_id(order_id),
				"Audit: invoice issued"
			);
		},
		CoreEvent::Billing(BillingEvent::InvoiceSent { invoice_id }) => {
			tracing::info!(invoice_id = %truncate_id(invoice_id), "Audit: invoice sent");
		},
		CoreEvent::Billing(BillingEvent::PaymentRecorded {
			payment_id,
			payment_number,
			order_id,
			invoice_id,
			amount,
		}) => {
			tracing::info!(
				payment_id = %truncate_id(payment_id),
				payment_number = %payment_number,
				order_id = %truncate_id(order_id),
				invoice_id = ?invoice_id,
				amount = %amount,
				"Audit: payment recorded"
			);
		},
		CoreEvent::Billing(BillingEvent::ExpenseRecorded {
			expense_id,
			expense_number,
			amount,
		}) => {
			tracing::info!(
				expense_id = %truncate_id(expense_id),
				expense_number = %expense_number,
				amount = %amount,
				"Audit: expense recorded"
			);
		},
		CoreEvent::Design(DesignEvent::TaskAssigned {
			task_id,
			order_id,
			designer,
		}) => {
			tracing::info!(
				task_id = %truncate_id(task_id),
				order_id = %truncate_id(order_id),
				designer = %designer,
				"Audit: design task assigned"
			);
		},
		CoreEvent::Design(DesignEvent::ProofSubmitted {
			proof_id,
			task_id,
			version,
		}) => {
			tracing::info!(
				proof_id = %truncate_id(proof_id),
				task_id = %truncate_id(task_id),
				version,
				"Audit: proof submitted"
			);
		},
		CoreEvent::Design(DesignEvent::ProofReviewed {
			proof_id,
			task_id,
			approved,
		}) => {
			tracing::info!(
				proof_id = %truncate_id(proof_id),
				task_id = %truncate_id(task_id),
				approved,
				"Audit: proof reviewed"
			);
		},
		CoreEvent::Production(ProductionEvent::TaskScheduled { task_id, order_id }) => {
			tracing::info!(
				task_id = %truncate_id(task_id),
				order_id = %truncate_id(order_id),
				"Audit: production task scheduled"
			);
		},
		CoreEvent::Production(ProductionEvent::TaskProgressed {
			task_id,
			order_id,
			status,
		}) => {
			tracing::info!(
				task_id = %truncate_id(task_id),
				order_id = %truncate_id(order_id),
				status = %status,
				"Audit: production task progressed"
			);
		},
		CoreEvent::Dispatch(DispatchEvent::DeliveryScheduled {
			delivery_id,
			order_id,
		}) => {
			tracing::info!(
				delivery_id = %truncate_id(delivery_id),
				order_id = %truncate_id(order_id),
				"Audit: delivery scheduled"
			);
		},
		CoreEvent::Dispatch(DispatchEvent::DeliveryProgressed {
			delivery_id,
			order_id,
			status,
		}) => {
			tracing::info!(
				delivery_id = %truncate_id(delivery_id),
				order_id = %truncate_id(order_id),
				status = %status,
				"Audit: delivery progressed"
			);
		},
	}
}
