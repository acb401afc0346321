//! Registry trait for self-registering implementations.
//!
//! Pluggable implementations (currently storage backends) register themselves
//! with their configuration name and a factory function. The service binary
//! collects factories into a map keyed by `NAME` and hands it to the engine
//! builder, which instantiates only what the configuration references.

/// Base trait for implementation registries.
///
/// Each implementation module must provide a Registry struct implementing
/// this trait, declaring the configuration name and the factory function that
/// builds the implementation from its validated TOML table.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example "memory" for `storage.implementations.memory`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
