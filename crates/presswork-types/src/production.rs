//! Production workflow types.

use crate::design::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a production task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
	#[default]
	Pending,
	InProcess,
	Printing,
	Binding,
	QualityCheck,
	Completed,
	OnHold,
}

impl fmt::Display for ProductionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProductionStatus::Pending => write!(f, "pending"),
			ProductionStatus::InProcess => write!(f, "in_process"),
			ProductionStatus::Printing => write!(f, "printing"),
			ProductionStatus::Binding => write!(f, "binding"),
			ProductionStatus::QualityCheck => write!(f, "quality_check"),
			ProductionStatus::Completed => write!(f, "completed"),
			ProductionStatus::OnHold => write!(f, "on_hold"),
		}
	}
}

/// Kind of production work.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
	#[default]
	Printing,
	Binding,
	Lamination,
	Cutting,
	Packing,
	Other,
}

/// A shop-floor job for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionTask {
	pub id: String,
	pub order_id: String,
	pub task_type: TaskType,
	pub status: ProductionStatus,
	pub priority: Priority,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub assigned_to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub equipment_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub wastage_notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub quality_notes: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scheduled_start: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actual_start: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scheduled_end: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actual_end: Option<DateTime<Utc>>,
	/// Derived from `actual_start`/`actual_end` on completion.
	#[serde(default)]
	pub time_spent_minutes: u32,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Input for scheduling a production task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionTaskInput {
	#[serde(default)]
	pub task_type: TaskType,
	#[serde(default)]
	pub priority: Priority,
	#[serde(default)]
	pub assigned_to: Option<String>,
	#[serde(default)]
	pub equipment_id: Option<String>,
	#[serde(default)]
	pub scheduled_start: Option<DateTime<Utc>>,
	#[serde(default)]
	pub scheduled_end: Option<DateTime<Utc>>,
}

/// Partial update for a production task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductionTaskPatch {
	#[serde(default)]
	pub status: Option<ProductionStatus>,
	#[serde(default)]
	pub priority: Option<Priority>,
	#[serde(default)]
	pub assigned_to: Option<String>,
	#[serde(default)]
	pub equipment_id: Option<String>,
	#[serde(default)]
	pub wastage_notes: Option<String>,
	#[serde(default)]
	pub quality_notes: Option<String>,
	#[serde(default)]
	pub scheduled_start: Option<DateTime<Utc>>,
	#[serde(default)]
	pub scheduled_end: Option<DateTime<Utc>>,
}

/// A piece of shop equipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
	pub id: String,
	pub name: String,
	pub equipment_type: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Free-form state, `available` unless told otherwise.
	pub status: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub location: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// Input for registering equipment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentInput {
	pub name: String,
	pub equipment_type: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub location: Option<String>,
}
