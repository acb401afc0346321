//! Storage-related types.

use std::str::FromStr;

/// Storage namespaces for the different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Namespace for order aggregates
	Orders,
	/// Namespace for customer records
	Customers,
	/// Namespace for invoices
	Invoices,
	/// Namespace for payments
	Payments,
	/// Namespace for expenses
	Expenses,
	/// Namespace for design tasks
	DesignTasks,
	/// Namespace for design proofs
	DesignProofs,
	/// Namespace for production tasks
	ProductionTasks,
	/// Namespace for equipment records
	Equipment,
	/// Namespace for delivery runs
	Deliveries,
	/// Namespace for sequential-number counters
	Counters,
}

impl StorageKey {
	/// Returns the string representation of the storage namespace.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Customers => "customers",
			StorageKey::Invoices => "invoices",
			StorageKey::Payments => "payments",
			StorageKey::Expenses => "expenses",
			StorageKey::DesignTasks => "design_tasks",
			StorageKey::DesignProofs => "design_proofs",
			StorageKey::ProductionTasks => "production_tasks",
			StorageKey::Equipment => "equipment",
			StorageKey::Deliveries => "deliveries",
			StorageKey::Counters => "counters",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Customers,
			Self::Invoices,
			Self::Payments,
			Self::Expenses,
			Self::DesignTasks,
			Self::DesignProofs,
			Self::ProductionTasks,
			Self::Equipment,
			Self::Deliveries,
			Self::Counters,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"customers" => Ok(Self::Customers),
			"invoices" => Ok(Self::Invoices),
			"payments" => Ok(Self::Payments),
			"expenses" => Ok(Self::Expenses),
			"design_tasks" => Ok(Self::DesignTasks),
			"design_proofs" => Ok(Self::DesignProofs),
			"production_tasks" => Ok(Self::ProductionTasks),
			"equipment" => Ok(Self::Equipment),
			"deliveries" => Ok(Self::Deliveries),
			"counters" => Ok(Self::Counters),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
