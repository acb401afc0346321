//! Delivery workflow types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a delivery run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
	#[default]
	Scheduled,
	OutForDelivery,
	Delivered,
	Failed,
	Rescheduled,
}

impl fmt::Display for DeliveryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DeliveryStatus::Scheduled => write!(f, "scheduled"),
			DeliveryStatus::OutForDelivery => write!(f, "out_for_delivery"),
			DeliveryStatus::Delivered => write!(f, "delivered"),
			DeliveryStatus::Failed => write!(f, "failed"),
			DeliveryStatus::Rescheduled => write!(f, "rescheduled"),
		}
	}
}

/// A delivery run for one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
	pub id: String,
	pub order_id: String,
	pub status: DeliveryStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivery_person_id: Option<String>,
	/// Defaults from the customer record when not given.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivery_address: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contact_phone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub scheduled_date: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub actual_delivery_date: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub recipient_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub customer_feedback: Option<String>,
	/// 1 to 5 when present.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rating: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Input for scheduling a delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryInput {
	#[serde(default)]
	pub delivery_person_id: Option<String>,
	#[serde(default)]
	pub delivery_address: Option<String>,
	#[serde(default)]
	pub contact_phone: Option<String>,
	#[serde(default)]
	pub scheduled_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Partial update for a delivery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryPatch {
	#[serde(default)]
	pub status: Option<DeliveryStatus>,
	#[serde(default)]
	pub delivery_person_id: Option<String>,
	#[serde(default)]
	pub scheduled_date: Option<DateTime<Utc>>,
	#[serde(default)]
	pub recipient_name: Option<String>,
	#[serde(default)]
	pub customer_feedback: Option<String>,
	#[serde(default)]
	pub rating: Option<u8>,
	#[serde(default)]
	pub notes: Option<String>,
	/// Written into `notes` when the status moves to `failed`.
	#[serde(default)]
	pub failure_reason: Option<String>,
}
