//! Design workflow service.
//!
//! Owns design tasks and their append-only, version-numbered proof
//! sequences. Proof versions are assigned as `max(existing) + 1` under a
//! per-task lock, so versions for a task always form `1..K` with no gaps or
//! repeats regardless of interleaving. A rejected proof bumps the task's
//! monotonic `revision_count`; it is never reset.

use crate::engine::event_bus::EventBus;
use crate::state::{LockMap, OrderStateMachine};
use crate::utils::truncate_id;
use crate::CoreError;
use chrono::Utc;
use presswork_storage::StorageService;
use presswork_types::{
	CoreEvent, DesignEvent, DesignProof, DesignStatus, DesignTask, DesignTaskInput,
	DesignTaskPatch, Order, OrderStatus, ProofInput, ProofStatus, ReviewAction, StatusRequest,
	StorageKey,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Service handling design tasks and proof review rounds.
pub struct DesignService {
	storage: Arc<StorageService>,
	state_machine: Arc<OrderStateMachine>,
	event_bus: EventBus,
	/// Per-task locks serializing proof submission and review.
	task_locks: LockMap,
}

impl DesignService {
	pub fn new(
		storage: Arc<StorageService>,
		state_machine: Arc<OrderStateMachine>,
		event_bus: EventBus,
	) -> Self {
		Self {
			storage,
			state_machine,
			event_bus,
			task_locks: LockMap::new(),
		}
	}

	/// Creates a design task for an order.
	///
	/// When a designer is named up front the task carries `assigned_at`
	/// immediately and the order is asked to move to `designer_assigned`.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn create_task(
		&self,
		order_id: &str,
		input: DesignTaskInput,
		actor: &str,
	) -> Result<DesignTask, CoreError> {
		let order = self.fetch_open_order(order_id).await?;
		if input.title.trim().is_empty() {
			return Err(CoreError::Validation("title must not be empty".into()));
		}

		let now = Utc::now();
		let task = DesignTask {
			id: Uuid::new_v4().to_string(),
			order_id: order.id.clone(),
			title: input.title,
			status: DesignStatus::Pending,
			priority: input.priority,
			design_requirements: input.design_requirements,
			feedback: None,
			revision_count: 0,
			assigned_at: input.assigned_to.as_ref().map(|_| now),
			assigned_to: input.assigned_to,
			started_at: None,
			completed_at: None,
			deadline: input.deadline,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::DesignTasks.as_str(), &task.id, &task)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		if let Some(designer) = &task.assigned_to {
			self.event_bus
				.publish(CoreEvent::Design(DesignEvent::TaskAssigned {
					task_id: task.id.clone(),
					order_id: task.order_id.clone(),
					designer: designer.clone(),
				}))
				.ok();
			self.state_machine
				.apply(StatusRequest {
					order_id: task.order_id.clone(),
					status: OrderStatus::DesignerAssigned,
					actor: actor.to_string(),
					reason: Some(format!("Designer {} assigned", designer)),
				})
				.await?;
		}

		Ok(task)
	}

	/// Applies a partial update to a design task.
	///
	/// Moving to `in_progress` stamps `started_at` once; `completed` stamps
	/// `completed_at`. Assigning a designer through the patch behaves like
	/// assigning at creation.
	pub async fn update_task(
		&self,
		task_id: &str,
		patch: DesignTaskPatch,
		actor: &str,
	) -> Result<DesignTask, CoreError> {
		let mut task = self.get_task(task_id).await?;
		let now = Utc::now();
		let mut newly_assigned = None;

		if let Some(title) = patch.title {
			if title.trim().is_empty() {
				return Err(CoreError::Validation("title must not be empty".into()));
			}
			task.title = title;
		}
		if let Some(priority) = patch.priority {
			task.priority = priority;
		}
		if let Some(design_requirements) = patch.design_requirements {
			task.design_requirements = Some(design_requirements);
		}
		if let Some(deadline) = patch.deadline {
			task.deadline = Some(deadline);
		}
		if let Some(designer) = patch.assigned_to {
			if task.assigned_to.as_deref() != Some(designer.as_str()) {
				task.assigned_at = Some(now);
				newly_assigned = Some(designer.clone());
			}
			task.assigned_to = Some(designer);
		}
		if let Some(status) = patch.status {
			if status == DesignStatus::InProgress && task.started_at.is_none() {
				task.started_at = Some(now);
			}
			if status == DesignStatus::Completed {
				task.completed_at = Some(now);
			}
			task.status = status;
		}
		task.updated_at = now;

		self.storage
			.update(StorageKey::DesignTasks.as_str(), task_id, &task)
			.await
			.map_err(|e| CoreError::from_storage("design task", task_id, e))?;

		if let Some(designer) = newly_assigned {
			self.event_bus
				.publish(CoreEvent::Design(DesignEvent::TaskAssigned {
					task_id: task.id.clone(),
					order_id: task.order_id.clone(),
					designer: designer.clone(),
				}))
				.ok();
			self.state_machine
				.apply(StatusRequest {
					order_id: task.order_id.clone(),
					status: OrderStatus::DesignerAssigned,
					actor: actor.to_string(),
					reason: Some(format!("Designer {} assigned", designer)),
				})
				.await?;
		}

		Ok(task)
	}

	/// Submits the next proof version for a task.
	///
	/// The new version is `1 + max(existing)`, computed and committed under
	/// the task's lock. The task and its order both move to `proof_sent`.
	#[instrument(skip_all, fields(task_id = %truncate_id(task_id)))]
	pub async fn submit_proof(
		&self,
		task_id: &str,
		input: ProofInput,
		actor: &str,
	) -> Result<DesignProof, CoreError> {
		if input.file_path.trim().is_empty() || input.file_name.trim().is_empty() {
			return Err(CoreError::Validation(
				"file_path and file_name must not be empty".into(),
			));
		}

		let lock = self.task_locks.lock_for(task_id);
		let _guard = lock.lock().await;

		let mut task = self.get_task(task_id).await?;
		let version = self
			.list_proofs(task_id)
			.await?
			.iter()
			.map(|p| p.version)
			.max()
			.unwrap_or(0)
			+ 1;

		let now = Utc::now();
		let proof = DesignProof {
			id: Uuid::new_v4().to_string(),
			task_id: task_id.to_string(),
			version,
			status: ProofStatus::Sent,
			file_path: input.file_path,
			file_name: input.file_name,
			notes: input.notes,
			sent_at: now,
			approved_at: None,
		};

		self.storage
			.store(StorageKey::DesignProofs.as_str(), &proof.id, &proof)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		task.status = DesignStatus::ProofSent;
		task.updated_at = now;
		self.storage
			.update(StorageKey::DesignTasks.as_str(), task_id, &task)
			.await
			.map_err(|e| CoreError::from_storage("design task", task_id, e))?;

		tracing::info!(
			task_id = %truncate_id(task_id),
			version,
			file_name = %proof.file_name,
			"Proof submitted"
		);

		self.event_bus
			.publish(CoreEvent::Design(DesignEvent::ProofSubmitted {
				proof_id: proof.id.clone(),
				task_id: task_id.to_string(),
				version,
			}))
			.ok();

		self.state_machine
			.apply(StatusRequest {
				order_id: task.order_id.clone(),
				status: OrderStatus::ProofSent,
				actor: actor.to_string(),
				reason: Some(format!("Proof v{} sent to customer", version)),
			})
			.await?;

		Ok(proof)
	}

	/// Records the customer's verdict on a proof.
	///
	/// Approval closes the review round: the proof and task become
	/// `approved` and the order is asked to move to `proof_confirmed`.
	/// Rejection marks the proof `revision_requested`, stores the feedback
	/// on the task and bumps its revision counter; the next submission gets
	/// the following version number.
	#[instrument(skip_all, fields(proof_id = %truncate_id(proof_id), action = ?action))]
	pub async fn review_proof(
		&self,
		proof_id: &str,
		action: ReviewAction,
		feedback: Option<String>,
		actor: &str,
	) -> Result<DesignProof, CoreError> {
		let mut proof: DesignProof = self
			.storage
			.retrieve(StorageKey::DesignProofs.as_str(), proof_id)
			.await
			.map_err(|e| CoreError::from_storage("design proof", proof_id, e))?;

		let lock = self.task_locks.lock_for(&proof.task_id);
		let _guard = lock.lock().await;

		if !matches!(proof.status, ProofStatus::Pending | ProofStatus::Sent) {
			return Err(CoreError::Validation(format!(
				"proof v{} has already been reviewed",
				proof.version
			)));
		}

		let mut task = self.get_task(&proof.task_id).await?;
		let now = Utc::now();
		let approved = matches!(action, ReviewAction::Approve);

		match action {
			ReviewAction::Approve => {
				proof.status = ProofStatus::Approved;
				proof.approved_at = Some(now);
				task.status = DesignStatus::Approved;
			},
			ReviewAction::Reject => {
				proof.status = ProofStatus::RevisionRequested;
				task.status = DesignStatus::RevisionRequested;
				task.revision_count += 1;
				task.feedback = feedback;
			},
		}
		task.updated_at = now;

		self.storage
			.update(StorageKey::DesignProofs.as_str(), proof_id, &proof)
			.await
			.map_err(|e| CoreError::from_storage("design proof", proof_id, e))?;
		self.storage
			.update(StorageKey::DesignTasks.as_str(), &task.id, &task)
			.await
			.map_err(|e| CoreError::from_storage("design task", &task.id, e))?;

		self.event_bus
			.publish(CoreEvent::Design(DesignEvent::ProofReviewed {
				proof_id: proof_id.to_string(),
				task_id: task.id.clone(),
				approved,
			}))
			.ok();

		if approved {
			self.state_machine
				.apply(StatusRequest {
					order_id: task.order_id.clone(),
					status: OrderStatus::ProofConfirmed,
					actor: actor.to_string(),
					reason: Some(format!("Proof v{} approved", proof.version)),
				})
				.await?;
		}

		Ok(proof)
	}

	pub async fn get_task(&self, task_id: &str) -> Result<DesignTask, CoreError> {
		self.storage
			.retrieve(StorageKey::DesignTasks.as_str(), task_id)
			.await
			.map_err(|e| CoreError::from_storage("design task", task_id, e))
	}

	/// Lists design tasks, optionally only those of one order.
	pub async fn list_tasks(&self, order_id: Option<&str>) -> Result<Vec<DesignTask>, CoreError> {
		let mut tasks: Vec<DesignTask> = self
			.storage
			.list(StorageKey::DesignTasks.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		if let Some(order_id) = order_id {
			tasks.retain(|t| t.order_id == order_id);
		}
		Ok(tasks)
	}

	/// The proof sequence of a task, oldest version first.
	pub async fn list_proofs(&self, task_id: &str) -> Result<Vec<DesignProof>, CoreError> {
		let mut proofs: Vec<DesignProof> = self
			.storage
			.list(StorageKey::DesignProofs.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		proofs.retain(|p| p.task_id == task_id);
		proofs.sort_by_key(|p| p.version);
		Ok(proofs)
	}

	/// Loads an order and rejects work against one that is already closed.
	async fn fetch_open_order(&self, order_id: &str) -> Result<Order, CoreError> {
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
		Ok(order)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::services::{CustomerService, OrderService};
	use presswork_numbering::NumberingService;
	use presswork_storage::implementations::memory::MemoryStorage;
	use presswork_types::{CustomerInput, NewOrder};

	struct Ctx {
		design: DesignService,
		orders: OrderService,
		machine: Arc<OrderStateMachine>,
		order_id: String,
	}

	async fn setup() -> Ctx {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let numbering = Arc::new(NumberingService::new(storage.clone(), 3));
		let locks = LockMap::new();
		let event_bus = EventBus::new(16);
		let machine = Arc::new(OrderStateMachine::new(
			storage.clone(),
			locks.clone(),
			event_bus.clone(),
		));

		let customers = CustomerService::new(storage.clone());
		let orders = OrderService::new(storage.clone(), numbering, locks, event_bus.clone());
		let design = DesignService::new(storage, machine.clone(), event_bus);

		let customer = customers
			.create(CustomerInput {
				company_name: "Rahim Traders".into(),
				..Default::default()
			})
			.await
			.unwrap();
		let order = orders
			.create_order(
				NewOrder {
					customer_id: customer.id,
					work_name: "Brochure".into(),
					..Default::default()
				},
				"reception",
			)
			.await
			.unwrap();

		Ctx {
			design,
			orders,
			machine,
			order_id: order.id,
		}
	}

	fn proof_input(version_label: &str) -> ProofInput {
		ProofInput {
			file_path: format!("/proofs/brochure-{}.pdf", version_label),
			file_name: format!("brochure-{}.pdf", version_label),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn assigning_a_designer_moves_the_order() {
		let ctx = setup().await;

		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure front".into(),
					assigned_to: Some("mitu".into()),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();

		assert!(task.assigned_at.is_some());
		let order = ctx.orders.get_order(&ctx.order_id).await.unwrap();
		assert_eq!(order.status, OrderStatus::DesignerAssigned);
	}

	#[tokio::test]
	async fn unassigned_tasks_leave_the_order_alone() {
		let ctx = setup().await;

		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure back".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();

		assert!(task.assigned_to.is_none());
		assert!(task.assigned_at.is_none());
		let order = ctx.orders.get_order(&ctx.order_id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Order);
	}

	#[tokio::test]
	async fn proof_versions_count_up_from_one() {
		let ctx = setup().await;
		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();

		let first = ctx
			.design
			.submit_proof(&task.id, proof_input("a"), "mitu")
			.await
			.unwrap();
		let second = ctx
			.design
			.submit_proof(&task.id, proof_input("b"), "mitu")
			.await
			.unwrap();

		assert_eq!(first.version, 1);
		assert_eq!(second.version, 2);
		assert_eq!(first.status, ProofStatus::Sent);

		let task_after = ctx.design.get_task(&task.id).await.unwrap();
		assert_eq!(task_after.status, DesignStatus::ProofSent);
		let order = ctx.orders.get_order(&ctx.order_id).await.unwrap();
		assert_eq!(order.status, OrderStatus::ProofSent);
	}

	#[tokio::test]
	async fn reject_then_approve_review_round() {
		let ctx = setup().await;
		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();

		let v1 = ctx
			.design
			.submit_proof(&task.id, proof_input("a"), "mitu")
			.await
			.unwrap();
		let v1 = ctx
			.design
			.review_proof(
				&v1.id,
				ReviewAction::Reject,
				Some("Logo too small".into()),
				"customer",
			)
			.await
			.unwrap();
		assert_eq!(v1.status, ProofStatus::RevisionRequested);

		let task_after = ctx.design.get_task(&task.id).await.unwrap();
		assert_eq!(task_after.status, DesignStatus::RevisionRequested);
		assert_eq!(task_after.revision_count, 1);
		assert_eq!(task_after.feedback.as_deref(), Some("Logo too small"));

		let v2 = ctx
			.design
			.submit_proof(&task.id, proof_input("b"), "mitu")
			.await
			.unwrap();
		assert_eq!(v2.version, 2);

		let v2 = ctx
			.design
			.review_proof(&v2.id, ReviewAction::Approve, None, "customer")
			.await
			.unwrap();
		assert_eq!(v2.status, ProofStatus::Approved);
		assert!(v2.approved_at.is_some());

		let task_after = ctx.design.get_task(&task.id).await.unwrap();
		assert_eq!(task_after.status, DesignStatus::Approved);
		assert_eq!(task_after.revision_count, 1);
		let order = ctx.orders.get_order(&ctx.order_id).await.unwrap();
		assert_eq!(order.status, OrderStatus::ProofConfirmed);
	}

	#[tokio::test]
	async fn reviewed_proofs_are_settled() {
		let ctx = setup().await;
		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();
		let proof = ctx
			.design
			.submit_proof(&task.id, proof_input("a"), "mitu")
			.await
			.unwrap();
		ctx.design
			.review_proof(&proof.id, ReviewAction::Approve, None, "customer")
			.await
			.unwrap();

		let err = ctx
			.design
			.review_proof(&proof.id, ReviewAction::Reject, None, "customer")
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Validation(_)));
	}

	#[tokio::test]
	async fn concurrent_submissions_get_distinct_versions() {
		let ctx = setup().await;
		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();

		let (a, b) = tokio::join!(
			ctx.design.submit_proof(&task.id, proof_input("a"), "mitu"),
			ctx.design.submit_proof(&task.id, proof_input("b"), "mitu"),
		);
		let mut versions = vec![a.unwrap().version, b.unwrap().version];
		versions.sort_unstable();
		assert_eq!(versions, vec![1, 2]);
	}

	#[tokio::test]
	async fn starting_and_completing_stamp_timestamps() {
		let ctx = setup().await;
		let task = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Brochure".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap();

		let task = ctx
			.design
			.update_task(
				&task.id,
				DesignTaskPatch {
					status: Some(DesignStatus::InProgress),
					..Default::default()
				},
				"mitu",
			)
			.await
			.unwrap();
		let started_at = task.started_at.unwrap();

		// A second move to in_progress keeps the original start stamp.
		let task = ctx
			.design
			.update_task(
				&task.id,
				DesignTaskPatch {
					status: Some(DesignStatus::InProgress),
					..Default::default()
				},
				"mitu",
			)
			.await
			.unwrap();
		assert_eq!(task.started_at.unwrap(), started_at);

		let task = ctx
			.design
			.update_task(
				&task.id,
				DesignTaskPatch {
					status: Some(DesignStatus::Completed),
					..Default::default()
				},
				"mitu",
			)
			.await
			.unwrap();
		assert!(task.completed_at.is_some());
	}

	#[tokio::test]
	async fn cancelled_orders_reject_new_tasks() {
		let ctx = setup().await;
		ctx.machine
			.transition(&ctx.order_id, OrderStatus::Cancelled, "desk", None)
			.await
			.unwrap();

		let err = ctx
			.design
			.create_task(
				&ctx.order_id,
				DesignTaskInput {
					title: "Too late".into(),
					..Default::default()
				},
				"design-desk",
			)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Validation(_)));
	}
}
