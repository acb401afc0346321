//! Customer records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A customer of the shop. Soft-deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
	pub id: String,
	pub company_name: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub contact_person: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub alternate_phone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub city: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub district: Option<String>,
	/// Free-form grouping label (walk-in, corporate, ...).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	#[serde(default)]
	pub credit_limit: Decimal,
	#[serde(default)]
	pub outstanding_balance: Decimal,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Input for registering a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInput {
	pub company_name: String,
	#[serde(default)]
	pub contact_person: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	pub alternate_phone: Option<String>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub district: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub credit_limit: Decimal,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Partial update for a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerPatch {
	#[serde(default)]
	pub company_name: Option<String>,
	#[serde(default)]
	pub contact_person: Option<String>,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	pub alternate_phone: Option<String>,
	#[serde(default)]
	pub address: Option<String>,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub district: Option<String>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub credit_limit: Option<Decimal>,
	#[serde(default)]
	pub outstanding_balance: Option<Decimal>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default)]
	pub is_active: Option<bool>,
}
