//! Domain services of the back office.
//!
//! Each service owns one slice of the shop's data and goes through the
//! shared [`StorageService`](presswork_storage::StorageService). Order
//! status is never written here directly: services that need to move an
//! order hand a [`StatusRequest`](presswork_types::StatusRequest) to the
//! state machine, which is the only writer of that field.

pub mod billing;
pub mod customers;
pub mod delivery;
pub mod design;
pub mod orders;
pub mod production;

pub use billing::BillingService;
pub use customers::CustomerService;
pub use delivery::DeliveryService;
pub use design::DesignService;
pub use orders::OrderService;
pub use production::ProductionService;
