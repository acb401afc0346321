//! Builder for constructing engines.
//!
//! Composes an [`Engine`] from a validated configuration and a set of
//! storage factory functions. The storage backend is pluggable; every
//! domain service is then wired to the one backend the configuration names
//! as primary, sharing a single event bus and order lock map.

use crate::engine::{event_bus::EventBus, Engine};
use crate::services::{
	BillingService, CustomerService, DeliveryService, DesignService, OrderService,
	ProductionService,
};
use crate::state::{LockMap, OrderStateMachine};
use presswork_config::Config;
use presswork_numbering::NumberingService;
use presswork_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Container for the factory functions needed to build an [`Engine`].
///
/// Factories are keyed by implementation name; the configuration decides
/// which of them actually get instantiated.
pub struct EngineFactories {
	pub storage: HashMap<String, StorageFactory>,
}

/// Builder constructing an [`Engine`] with a pluggable storage backend.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	/// Creates a new builder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, instantiating storage through the factories.
	pub fn build(self, factories: EngineFactories) -> Result<Engine, BuilderError> {
		let storage = self.build_storage(&factories)?;

		let event_bus = EventBus::new(self.config.engine.event_buffer_size);
		let locks = LockMap::new();
		let state_machine = Arc::new(OrderStateMachine::new(
			storage.clone(),
			locks.clone(),
			event_bus.clone(),
		));
		let numbering = Arc::new(NumberingService::new(
			storage.clone(),
			self.config.numbering.max_attempts,
		));

		let customers = Arc::new(CustomerService::new(storage.clone()));
		let orders = Arc::new(OrderService::new(
			storage.clone(),
			numbering.clone(),
			locks.clone(),
			event_bus.clone(),
		));
		let billing = Arc::new(BillingService::new(
			storage.clone(),
			numbering,
			locks,
			event_bus.clone(),
		));
		let design = Arc::new(DesignService::new(
			storage.clone(),
			state_machine.clone(),
			event_bus.clone(),
		));
		let production = Arc::new(ProductionService::new(
			storage.clone(),
			state_machine.clone(),
			event_bus.clone(),
		));
		let delivery = Arc::new(DeliveryService::new(
			storage.clone(),
			state_machine.clone(),
			event_bus.clone(),
		));

		Ok(Engine {
			config: self.config,
			storage,
			event_bus,
			state_machine,
			customers,
			orders,
			billing,
			design,
			production,
			delivery,
		})
	}

	/// Instantiates the primary storage backend named by the configuration.
	///
	/// Other configured backends stay dormant; only the primary is built.
	fn build_storage(
		&self,
		factories: &EngineFactories,
	) -> Result<Arc<StorageService>, BuilderError> {
		let primary = &self.config.storage.primary;
		let config = self
			.config
			.storage
			.implementations
			.get(primary)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"No configuration for storage implementation '{}'",
					primary
				))
			})?;
		let factory = factories.storage.get(primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"No factory registered for storage implementation '{}'",
				primary
			))
		})?;

		let backend = factory(config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		backend.config_schema().validate(config).map_err(|e| {
			BuilderError::Config(format!(
				"Invalid '{}' storage configuration: {}",
				primary, e
			))
		})?;

		tracing::info!(component = "storage", implementation = %primary, "Loaded implementation");
		Ok(Arc::new(StorageService::new(backend)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use presswork_types::{
		CustomerInput, DeliveryPatch, DeliveryStatus, DesignTaskInput, InvoiceInput,
		InvoiceStatus, NewOrder, NewOrderItem, OrderStatus, PaymentInput, PaymentStatus,
		ProductionStatus, ProductionTaskInput, ProductionTaskPatch, ProofInput, ReviewAction,
	};
	use rust_decimal::Decimal;
	use std::str::FromStr;

	fn dec(s: &str) -> Decimal {
		Decimal::from_str(s).unwrap()
	}

	fn memory_config() -> Config {
		r#"
			[service]
			id = "press-test"

			[storage]
			primary = "memory"

			[storage.implementations.memory]
		"#
		.parse()
		.unwrap()
	}

	fn registered_factories() -> EngineFactories {
		EngineFactories {
			storage: presswork_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn memory_backend_builds_a_working_engine() {
		let engine = EngineBuilder::new(memory_config())
			.build(registered_factories())
			.unwrap();

		let customer = engine
			.customers()
			.create(CustomerInput {
				company_name: "Rahim Traders".into(),
				..Default::default()
			})
			.await
			.unwrap();
		let fetched = engine.customers().get(&customer.id).await.unwrap();
		assert_eq!(fetched.company_name, "Rahim Traders");
	}

	#[tokio::test]
	async fn missing_factories_fail_the_build() {
		let err = EngineBuilder::new(memory_config())
			.build(EngineFactories {
				storage: HashMap::new(),
			})
			.unwrap_err();
		assert!(matches!(err, BuilderError::Config(_)));
	}

	#[tokio::test]
	async fn initialize_reports_a_clean_sweep() {
		let engine = EngineBuilder::new(memory_config())
			.build(registered_factories())
			.unwrap();
		let report = engine.initialize().await.unwrap();
		assert_eq!(report.scanned, 0);
		assert_eq!(report.repaired, 0);
	}

	/// One order walked through the whole shop: intake, proofing,
	/// production, dispatch and settlement.
	#[tokio::test]
	async fn order_walks_the_whole_shop_floor() {
		let engine = EngineBuilder::new(memory_config())
			.build(registered_factories())
			.unwrap();

		let customer = engine
			.customers()
			.create(CustomerInput {
				company_name: "Rahim Traders".into(),
				address: Some("12 Bangla Bazar".into()),
				phone: Some("01711-000000".into()),
				..Default::default()
			})
			.await
			.unwrap();

		let order = engine
			.orders()
			.create_order(
				NewOrder {
					customer_id: customer.id.clone(),
					work_name: "Flyer run".into(),
					items: vec![NewOrderItem {
						product_name: "A5 flyer".into(),
						quantity: 2,
						unit_price: dec("100"),
						..Default::default()
					}],
					..Default::default()
				},
				"reception",
			)
			.await
			.unwrap();
		assert!(order.order_number.starts_with("SAP"));
		assert_eq!(order.total_amount, dec("200"));

		let invoice = engine
			.billing()
			.create_invoice(&order.id, InvoiceInput::default(), "counter")
			.await
			.unwrap();
		assert!(invoice.invoice_number.starts_with("INV"));
		assert_eq!(invoice.total_amount, dec("200"));

		// Proofing: first version rejected, second approved.
		let task = engine
			.design()
			.create_task(
				&order.id,
				DesignTaskInput {
					title: "Flyer artwork".into(),
					assigned_to: Some("mitu".into()),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();
		let v1 = engine
			.design()
			.submit_proof(
				&task.id,
				ProofInput {
					file_path: "/proofs/flyer-a.pdf".into(),
					file_name: "flyer-a.pdf".into(),
					..Default::default()
				},
				"mitu",
			)
			.await
			.unwrap();
		engine
			.design()
			.review_proof(
				&v1.id,
				ReviewAction::Reject,
				Some("Wrong shade of red".into()),
				"customer",
			)
			.await
			.unwrap();
		let v2 = engine
			.design()
			.submit_proof(
				&task.id,
				ProofInput {
					file_path: "/proofs/flyer-b.pdf".into(),
					file_name: "flyer-b.pdf".into(),
					..Default::default()
				},
				"mitu",
			)
			.await
			.unwrap();
		assert_eq!(v2.version, 2);
		engine
			.design()
			.review_proof(&v2.id, ReviewAction::Approve, None, "customer")
			.await
			.unwrap();

		let task = engine.design().get_task(&task.id).await.unwrap();
		assert_eq!(task.revision_count, 1);
		let order_now = engine.orders().get_order(&order.id).await.unwrap();
		assert_eq!(order_now.status, OrderStatus::ProofConfirmed);

		// Production to completion.
		let job = engine
			.production()
			.create_task(&order.id, ProductionTaskInput::default(), "floor")
			.await
			.unwrap();
		engine
			.production()
			.update_task(
				&job.id,
				ProductionTaskPatch {
					status: Some(ProductionStatus::Completed),
					..Default::default()
				},
				"floor",
			)
			.await
			.unwrap();
		let order_now = engine.orders().get_order(&order.id).await.unwrap();
		assert_eq!(order_now.status, OrderStatus::ReadyForDelivery);

		// Dispatch.
		let run = engine
			.delivery()
			.schedule(&order.id, Default::default())
			.await
			.unwrap();
		assert_eq!(run.delivery_address.as_deref(), Some("12 Bangla Bazar"));
		engine
			.delivery()
			.update(
				&run.id,
				DeliveryPatch {
					status: Some(DeliveryStatus::OutForDelivery),
					..Default::default()
				},
				"driver",
			)
			.await
			.unwrap();
		engine
			.delivery()
			.update(
				&run.id,
				DeliveryPatch {
					status: Some(DeliveryStatus::Delivered),
					..Default::default()
				},
				"driver",
			)
			.await
			.unwrap();

		// Settlement: two payments close the books.
		engine
			.billing()
			.record_payment(
				PaymentInput {
					order_id: order.id.clone(),
					invoice_id: Some(invoice.id.clone()),
					amount: dec("150"),
					..Default::default()
				},
				"counter",
			)
			.await
			.unwrap();
		engine
			.billing()
			.record_payment(
				PaymentInput {
					order_id: order.id.clone(),
					invoice_id: Some(invoice.id.clone()),
					amount: dec("50"),
					..Default::default()
				},
				"counter",
			)
			.await
			.unwrap();

		let order_now = engine.orders().get_order(&order.id).await.unwrap();
		assert_eq!(order_now.status, OrderStatus::Delivered);
		assert!(order_now.actual_delivery_date.is_some());
		assert_eq!(order_now.paid_amount, dec("200"));
		assert_eq!(order_now.due_amount, Decimal::ZERO);
		assert_eq!(order_now.payment_status, PaymentStatus::Paid);
		let invoice_now = engine.billing().get_invoice(&invoice.id).await.unwrap();
		assert_eq!(invoice_now.status, InvoiceStatus::Paid);

		// The history chain has no holes: each entry starts where the
		// previous one ended.
		let history = engine.orders().order_history(&order.id).await.unwrap();
		assert_eq!(history[0].from, None);
		for pair in history.windows(2) {
			assert_eq!(pair[1].from, Some(pair[0].to));
		}
		assert_eq!(history.last().map(|h| h.to), Some(OrderStatus::Delivered));

		// Derived fields all follow from inputs, so the sweep is a no-op.
		let report = engine.initialize().await.unwrap();
		assert_eq!(report.scanned, 1);
		assert_eq!(report.repaired, 0);
	}
}
