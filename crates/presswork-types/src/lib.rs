//! Shared domain types for the presswork order-management core.
//!
//! This crate defines the entities, status vocabularies, patch structures,
//! domain events and money helpers used by all other crates. Types here carry
//! no I/O; behavior that touches storage or the event bus lives in the core
//! crate.

/// Invoice, payment and expense types.
pub mod billing;
/// Customer records.
pub mod customer;
/// Delivery workflow types.
pub mod delivery;
/// Design task and proof types.
pub mod design;
/// Domain events and the status-request command.
pub mod events;
/// Decimal money helpers and input validation.
pub mod money;
/// The order aggregate and its children.
pub mod order;
/// Production task and equipment types.
pub mod production;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Storage namespace keys.
pub mod storage;
/// TOML configuration schema validation.
pub mod validation;

pub use billing::*;
pub use customer::*;
pub use delivery::*;
pub use design::*;
pub use events::*;
pub use money::*;
pub use order::*;
pub use production::*;
pub use registry::*;
pub use storage::*;
pub use validation::*;
