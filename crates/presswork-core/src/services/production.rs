//! Production floor service.
//!
//! Tracks print-floor tasks and the equipment they run on. Task progress
//! reports back into the order lifecycle: scheduling work moves the order
//! to `in_process`, and the printing, binding, quality check and completed
//! stages each push the order to their matching status.

use crate::engine::event_bus::EventBus;
use crate::state::OrderStateMachine;
use crate::utils::truncate_id;
use crate::CoreError;
use chrono::Utc;
use presswork_storage::StorageService;
use presswork_types::{
	CoreEvent, Equipment, EquipmentInput, Order, OrderStatus, ProductionEvent, ProductionStatus,
	ProductionTask, ProductionTaskInput, ProductionTaskPatch, StatusRequest, StorageKey,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Order status implied by a production stage, if any.
fn order_status_for(status: ProductionStatus) -> Option<OrderStatus> {
	match status {
		ProductionStatus::Printing => Some(OrderStatus::Printing),
		ProductionStatus::Binding => Some(OrderStatus::Binding),
		ProductionStatus::QualityCheck => Some(OrderStatus::QualityCheck),
		ProductionStatus::Completed => Some(OrderStatus::ReadyForDelivery),
		_ => None,
	}
}

/// Service scheduling and progressing production tasks.
pub struct ProductionService {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	event_bus: EventBus,
}

impl ProductionService {
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

	/// Schedules a production task and moves the order to `in_process`.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), task_type = ?input.task_type))]
	pub async fn create_task(
		&self,
		order_id: &str,
		input: ProductionTaskInput,
		actor: &str,
	) -> Result<ProductionTask, CoreError> {
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
		if let Some(equipment_id) = &input.equipment_id {
			self.get_equipment(equipment_id).await?;
		}

		let now = Utc::now();
		let task = ProductionTask {
			id: Uuid::new_v4().to_string(),
			order_id: order.id.clone(),
			task_type: input.task_type,
			status: ProductionStatus::Pending,
			priority: input.priority,
			assigned_to: input.assigned_to,
			equipment_id: input.equipment_id,
			wastage_notes: None,
			quality_notes: None,
			scheduled_start: input.scheduled_start,
			actual_start: None,
			scheduled_end: input.scheduled_end,
			actual_end: None,
			time_spent_minutes: 0,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::ProductionTasks.as_str(), &task.id, &task)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		self.event_bus
			.publish(CoreEvent::Production(ProductionEvent::TaskScheduled {
				task_id: task.id.clone(),
				order_id: task.order_id.clone(),
			}))
			.ok();

		self.state_machine
			.apply(StatusRequest {
				order_id: task.order_id.clone(),
				status: OrderStatus::InProcess,
				actor: actor.to_string(),
				reason: Some(format!("{:?} task scheduled", task.task_type)),
			})
			.await?;

		Ok(task)
	}

	/// Applies a partial update to a production task.
	///
	/// Entering `in_process` stamps `actual_start` once; `completed` stamps
	/// `actual_end` and derives `time_spent_minutes` from the actual span.
	/// Stage changes that map to an order status push the order along.
	pub async fn update_task(
		&self,
		task_id: &str,
		patch: ProductionTaskPatch,
		actor: &str,
	) -> Result<ProductionTask, CoreError> {
		let mut task = self.get_task(task_id).await?;
		let now = Utc::now();

		if let Some(priority) = patch.priority {
			task.priority = priority;
		}
		if let Some(assigned_to) = patch.assigned_to {
			task.assigned_to = Some(assigned_to);
		}
		if let Some(equipment_id) = patch.equipment_id {
			self.get_equipment(&equipment_id).await?;
			task.equipment_id = Some(equipment_id);
		}
		if let Some(wastage_notes) = patch.wastage_notes {
			task.wastage_notes = Some(wastage_notes);
		}
		if let Some(quality_notes) = patch.quality_notes {
			task.quality_notes = Some(quality_notes);
		}
		if let Some(scheduled_start) = patch.scheduled_start {
			task.scheduled_start = Some(scheduled_start);
		}
		if let Some(scheduled_end) = patch.scheduled_end {
			task.scheduled_end = Some(scheduled_end);
		}

		let mut progressed = None;
		if let Some(status) = patch.status {
			if status != task.status {
				progressed = Some(status);
			}
			if status == ProductionStatus::InProcess && task.actual_start.is_none() {
				task.actual_start = Some(now);
			}
			if status == ProductionStatus::Completed {
				task.actual_end = Some(now);
				task.time_spent_minutes = task
					.actual_start
					.map(|start| (now - start).num_minutes().max(0) as u32)
					.unwrap_or(0);
			}
			task.status = status;
		}
		task.updated_at = now;

		self.storage
			.update(StorageKey::ProductionTasks.as_str(), task_id, &task)
			.await
			.map_err(|e| CoreError::from_storage("production task", task_id, e))?;

		if let Some(status) = progressed {
			tracing::info!(
				task_id = %truncate_id(task_id),
				order_id = %truncate_id(&task.order_id),
				status = ?status,
				"Production task progressed"
			);
			self.event_bus
				.publish(CoreEvent::Production(ProductionEvent::TaskProgressed {
					task_id: task.id.clone(),
					order_id: task.order_id.clone(),
					status,
				}))
				.ok();
			if let Some(order_status) = order_status_for(status) {
				self.state_machine
					.apply(StatusRequest {
						order_id: task.order_id.clone(),
						status: order_status,
						actor: actor.to_string(),
						reason: Some(format!("Production stage {:?}", status)),
					})
					.await?;
			}
		}

		Ok(task)
	}

	pub async fn get_task(&self, task_id: &str) -> Result<ProductionTask, CoreError> {
		self.storage
			.retrieve(StorageKey::ProductionTasks.as_str(), task_id)
			.await
			.map_err(|e| CoreError::from_storage("production task", task_id, e))
	}

	/// Lists production tasks, optionally only those of one order.
	pub async fn list_tasks(
		&self,
		order_id: Option<&str>,
	) -> Result<Vec<ProductionTask>, CoreError> {
		let mut tasks: Vec<ProductionTask> = self
			.storage
			.list(StorageKey::ProductionTasks.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		if let Some(order_id) = order_id {
			tasks.retain(|t| t.order_id == order_id);
		}
		Ok(tasks)
	}

	/// Registers a piece of equipment. Status defaults to `available`.
	pub async fn create_equipment(&self, input: EquipmentInput) -> Result<Equipment, CoreError> {
		if input.name.trim().is_empty() {
			return Err(CoreError::Validation(
				"equipment name must not be empty".into(),
			));
		}
		let equipment = Equipment {
			id: Uuid::new_v4().to_string(),
			name: input.name,
			equipment_type: input.equipment_type,
			description: input.description,
			status: input.status.unwrap_or_else(|| "available".to_string()),
			location: input.location,
			created_at: Utc::now(),
		};
		self.storage
			.store(StorageKey::Equipment.as_str(), &equipment.id, &equipment)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		tracing::info!(name = %equipment.name, status = %equipment.status, "Equipment registered");
		Ok(equipment)
	}

	pub async fn get_equipment(&self, equipment_id: &str) -> Result<Equipment, CoreError> {
		self.storage
			.retrieve(StorageKey::Equipment.as_str(), equipment_id)
			.await
			.map_err(|e| CoreError::from_storage("equipment", equipment_id, e))
	}

	pub async fn list_equipment(&self) -> Result<Vec<Equipment>, CoreError> {
		self.storage
			.list(StorageKey::Equipment.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))
	}

	/// Equipment currently marked `available`.
	pub async fn list_available_equipment(&self) -> Result<Vec<Equipment>, CoreError> {
		let mut equipment = self.list_equipment().await?;
		equipment.retain(|e| e.status == "available");
		Ok(equipment)
	}
}
