//! Customer records service.

use crate::utils::truncate_id;
use crate::CoreError;
use chrono::Utc;
use presswork_storage::StorageService;
use presswork_types::{money, Customer, CustomerInput, CustomerPatch, StorageKey};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Plain CRUD over customer records.
///
/// Customers are soft-deactivated, never deleted; order creation checks that
/// the referenced customer is still active.
pub struct CustomerService {
	storage: Arc<StorageService>,
}

impl CustomerService {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Registers a new customer.
	pub async fn create(&self, input: CustomerInput) -> Result<Customer, CoreError> {
		if input.company_name.trim().is_empty() {
			return Err(CoreError::Validation(
				"company_name must not be empty".into(),
			));
		}
		money::validate_non_negative("credit_limit", input.credit_limit)?;

		let now = Utc::now();
		let customer = Customer {
			id: Uuid::new_v4().to_string(),
			company_name: input.company_name,
			contact_person: input.contact_person,
			email: input.email,
			phone: input.phone,
			alternate_phone: input.alternate_phone,
			address: input.address,
			city: input.city,
			district: input.district,
			category: input.category,
			credit_limit: input.credit_limit,
			outstanding_balance: Decimal::ZERO,
			notes: input.notes,
			is_active: true,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::Customers.as_str(), &customer.id, &customer)
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;

		tracing::info!(
			customer_id = %truncate_id(&customer.id),
			company = %customer.company_name,
			"Customer registered"
		);
		Ok(customer)
	}

	/// Applies a partial update to a customer.
	pub async fn update(
		&self,
		customer_id: &str,
		patch: CustomerPatch,
	) -> Result<Customer, CoreError> {
		let mut customer = self.get(customer_id).await?;

		if let Some(company_name) = patch.company_name {
			if company_name.trim().is_empty() {
				return Err(CoreError::Validation(
					"company_name must not be empty".into(),
				));
			}
			customer.company_name = company_name;
		}
		if let Some(contact_person) = patch.contact_person {
			customer.contact_person = Some(contact_person);
		}
		if let Some(email) = patch.email {
			customer.email = Some(email);
		}
		if let Some(phone) = patch.phone {
			customer.phone = Some(phone);
		}
		if let Some(alternate_phone) = patch.alternate_phone {
			customer.alternate_phone = Some(alternate_phone);
		}
		if let Some(address) = patch.address {
			customer.address = Some(address);
		}
		if let Some(city) = patch.city {
			customer.city = Some(city);
		}
		if let Some(district) = patch.district {
			customer.district = Some(district);
		}
		if let Some(category) = patch.category {
			customer.category = Some(category);
		}
		if let Some(credit_limit) = patch.credit_limit {
			money::validate_non_negative("credit_limit", credit_limit)?;
			customer.credit_limit = credit_limit;
		}
		if let Some(outstanding_balance) = patch.outstanding_balance {
			money::validate_non_negative("outstanding_balance", outstanding_balance)?;
			customer.outstanding_balance = outstanding_balance;
		}
		if let Some(notes) = patch.notes {
			customer.notes = Some(notes);
		}
		if let Some(is_active) = patch.is_active {
			customer.is_active = is_active;
		}
		customer.updated_at = Utc::now();

		self.storage
			.update(StorageKey::Customers.as_str(), customer_id, &customer)
			.await
			.map_err(|e| CoreError::from_storage("customer", customer_id, e))?;

		Ok(customer)
	}

	pub async fn get(&self, customer_id: &str) -> Result<Customer, CoreError> {
		self.storage
			.retrieve(StorageKey::Customers.as_str(), customer_id)
			.await
			.map_err(|e| CoreError::from_storage("customer", customer_id, e))
	}

	/// Lists customers, optionally only the active ones.
	pub async fn list(&self, active_only: bool) -> Result<Vec<Customer>, CoreError> {
		let mut customers: Vec<Customer> = self
			.storage
			.list(StorageKey::Customers.as_str())
			.await
			.map_err(|e| CoreError::Storage(e.to_string()))?;
		if active_only {
			customers.retain(|c| c.is_active);
		}
		Ok(customers)
	}

	/// Marks a customer inactive without deleting the record.
	pub async fn deactivate(&self, customer_id: &str) -> Result<Customer, CoreError> {
		let customer = self
			.update(
				customer_id,
				CustomerPatch {
					is_active: Some(false),
					..Default::default()
				},
			)
			.await?;

		tracing::info!(
			customer_id = %truncate_id(customer_id),
			company = %customer.company_name,
			"Customer deactivated"
		);
		Ok(customer)
	}
}
