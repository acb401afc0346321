//! Design workflow types.
//!
//! Design tasks belong to one order each and carry an append-only,
//! version-numbered sequence of proofs. Versions are assigned by the design
//! service as `max(existing) + 1`; a rejected proof bumps the task's
//! monotonic `revision_count`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Work priority shared by design and production tasks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	Low,
	#[default]
	Normal,
	High,
	Urgent,
}

/// Status of a design task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DesignStatus {
	#[default]
	Pending,
	InProgress,
	ProofSent,
	RevisionRequested,
	Approved,
	Completed,
}

impl fmt::Display for DesignStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DesignStatus::Pending => write!(f, "pending"),
			DesignStatus::InProgress => write!(f, "in_progress"),
			DesignStatus::ProofSent => write!(f, "proof_sent"),
			DesignStatus::RevisionRequested => write!(f, "revision_requested"),
			DesignStatus::Approved => write!(f, "approved"),
			DesignStatus::Completed => write!(f, "completed"),
		}
	}
}

/// A design job for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignTask {
	pub id: String,
	pub order_id: String,
	pub title: String,
	pub status: DesignStatus,
	pub priority: Priority,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub design_requirements: Option<String>,
	/// Latest reviewer feedback; overwritten on each rejection.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub feedback: Option<String>,
	/// Number of revisions requested over the task's lifetime. Monotonic.
	pub revision_count: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub assigned_to: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub assigned_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub started_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub completed_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub deadline: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Input for creating a design task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignTaskInput {
	pub title: String,
	#[serde(default)]
	pub priority: Priority,
	#[serde(default)]
	pub design_requirements: Option<String>,
	#[serde(default)]
	pub assigned_to: Option<String>,
	#[serde(default)]
	pub deadline: Option<DateTime<Utc>>,
}

/// Partial update for a design task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignTaskPatch {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub status: Option<DesignStatus>,
	#[serde(default)]
	pub priority: Option<Priority>,
	#[serde(default)]
	pub design_requirements: Option<String>,
	#[serde(default)]
	pub assigned_to: Option<String>,
	#[serde(default)]
	pub deadline: Option<DateTime<Utc>>,
}

/// Status of one proof version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
	Pending,
	Sent,
	Approved,
	RevisionRequested,
}

/// One version in a design task's proof sequence.
///
/// Proofs are never edited after review; a revision produces a new version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignProof {
	pub id: String,
	pub task_id: String,
	/// Strictly increasing per task, starting at 1.
	pub version: u32,
	pub status: ProofStatus,
	/// Opaque reference to the proof artifact; no file handling here.
	pub file_path: String,
	pub file_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub sent_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub approved_at: Option<DateTime<Utc>>,
}

/// Input for submitting a new proof version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProofInput {
	pub file_path: String,
	pub file_name: String,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Outcome of a customer proof review.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
	Approve,
	Reject,
}
