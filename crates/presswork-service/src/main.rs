//! Main entry point for the presswork service.
//!
//! This binary runs the complete order-management backend for a print
//! shop: order intake and lifecycle, billing and payment reconciliation,
//! design proofing, production tracking and delivery dispatch. Storage is
//! pluggable and selected through the configuration file.

use clap::Parser;
use presswork_config::Config;
use presswork_core::{Engine, EngineBuilder, EngineFactories};
use std::path::PathBuf;

/// Command-line arguments for the presswork service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the presswork service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine with the registered storage backends
/// 5. Runs the engine until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	// Create env filter with default from args
	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started presswork");

	// Load configuration
	let config = Config::from_file_async(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	// Build the engine with the registered storage implementations
	let engine = build_engine(config)?;
	engine.run().await?;

	tracing::info!("Stopped presswork");
	Ok(())
}

/// Builds the engine with every storage backend this binary ships.
///
/// The configuration's `storage.primary` key decides which of the
/// registered backends actually persists data.
fn build_engine(config: Config) -> Result<Engine, Box<dyn std::error::Error>> {
	let storage = presswork_storage::get_all_implementations()
		.into_iter()
		.map(|(name, factory)| (name.to_string(), factory))
		.collect();

	let engine = EngineBuilder::new(config).build(EngineFactories { storage })?;
	Ok(engine)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn test_config() -> Config {
		r#"
			[service]
			id = "press-main-test"

			[storage]
			primary = "memory"

			[storage.implementations.memory]
		"#
		.parse()
		.unwrap()
	}

	#[test]
	fn args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn build_engine_with_minimal_config() {
		let engine = build_engine(test_config());
		assert!(engine.is_ok(), "Failed to build engine: {:?}", engine.err());

		let engine = engine.unwrap();
		assert_eq!(engine.config().service.id, "press-main-test");
	}

	#[test]
	fn build_engine_rejects_unregistered_primary() {
		let config: Config = r#"
			[service]
			id = "press-main-test"

			[storage]
			primary = "cabinet"

			[storage.implementations.cabinet]
		"#
		.parse()
		.unwrap();

		assert!(build_engine(config).is_err());
	}

	#[tokio::test]
	async fn file_backend_loads_from_a_config_file() {
		let temp_dir = tempdir().unwrap();
		let config_path = temp_dir.path().join("presswork.toml");
		let data_path = temp_dir.path().join("data");

		let config_content = format!(
			r#"
				[service]
				id = "press-file-test"

				[storage]
				primary = "file"
				cleanup_interval_seconds = 120

				[storage.implementations.file]
				storage_path = "{}"
			"#,
			data_path.display()
		);
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file_async(&config_path).await.unwrap();
		assert_eq!(config.service.id, "press-file-test");
		assert_eq!(config.storage.cleanup_interval_seconds, 120);

		let engine = build_engine(config).unwrap();
		assert_eq!(engine.config().storage.primary, "file");
	}
}
