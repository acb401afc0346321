//! Configuration module for the presswork order-management core.
//!
//! This module provides structures and utilities for managing service
//! configuration. It supports loading configuration from TOML files,
//! resolving `${VAR}` environment references, and validating that all
//! required configuration values are properly set.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the presswork service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this service instance.
	pub service: ServiceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for the sequential numbering service.
	#[serde(default)]
	pub numbering: NumberingConfig,
	/// Configuration for the engine run loop and event bus.
	#[serde(default)]
	pub engine: EngineConfig,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval_seconds() -> u64 {
	3600
}

/// Configuration for the sequential numbering service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NumberingConfig {
	/// Attempts per number allocation before a conflict is surfaced.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
}

impl Default for NumberingConfig {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
		}
	}
}

fn default_max_attempts() -> u32 {
	3
}

/// Configuration for the engine run loop and event bus.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	/// Capacity of the broadcast event bus.
	#[serde(default = "default_event_buffer_size")]
	pub event_buffer_size: usize,
	/// Maximum number of concurrently running event handlers.
	#[serde(default = "default_max_concurrent_handlers")]
	pub max_concurrent_handlers: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			event_buffer_size: default_event_buffer_size(),
			max_concurrent_handlers: default_max_concurrent_handlers(),
		}
	}
}

fn default_event_buffer_size() -> usize {
	1000
}

fn default_max_concurrent_handlers() -> usize {
	100
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).ok_or_else(|| {
			ConfigError::Parse("Malformed environment variable reference".into())
		})?;
		let var_name = cap
			.get(1)
			.ok_or_else(|| {
				ConfigError::Parse("Malformed environment variable reference".into())
			})?
			.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads and validates configuration from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		raw.parse()
	}

	/// Async variant of [`Config::from_file`].
	pub async fn from_file_async(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		raw.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// - Ensures the service ID is not empty
	/// - Validates that a known primary storage backend is configured
	/// - Checks the cleanup interval and engine sizes are sane
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if self.numbering.max_attempts == 0 {
			return Err(ConfigError::Validation(
				"Numbering max_attempts must be at least 1".into(),
			));
		}
		if self.numbering.max_attempts > 10 {
			return Err(ConfigError::Validation(
				"Numbering max_attempts cannot exceed 10".into(),
			));
		}

		if self.engine.event_buffer_size == 0 {
			return Err(ConfigError::Validation(
				"Engine event_buffer_size must be greater than 0".into(),
			));
		}
		if self.engine.max_concurrent_handlers == 0 {
			return Err(ConfigError::Validation(
				"Engine max_concurrent_handlers must be at least 1".into(),
			));
		}
		if self.engine.max_concurrent_handlers > 1000 {
			return Err(ConfigError::Validation(
				"Engine max_concurrent_handlers cannot exceed 1000".into(),
			));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// Environment variables are resolved and the configuration is automatically
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const BASE_CONFIG: &str = r#"
[service]
id = "presswork-test"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("PRESSWORK_TEST_HOST", "localhost");
		std::env::set_var("PRESSWORK_TEST_PORT", "5432");

		let input = "host = \"${PRESSWORK_TEST_HOST}:${PRESSWORK_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("PRESSWORK_TEST_HOST");
		std::env::remove_var("PRESSWORK_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${PRESSWORK_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${PRESSWORK_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("PRESSWORK_MISSING_VAR"));
	}

	#[test]
	fn test_config_with_env_vars_and_defaults() {
		std::env::set_var("PRESSWORK_TEST_SERVICE_ID", "press-1");

		let config_str = r#"
[service]
id = "${PRESSWORK_TEST_SERVICE_ID}"

[storage]
primary = "file"
cleanup_interval_seconds = 600
[storage.implementations.file]
storage_path = "./data/presswork"
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.service.id, "press-1");
		assert_eq!(config.storage.cleanup_interval_seconds, 600);
		// Absent sections fall back to defaults.
		assert_eq!(config.numbering.max_attempts, 3);
		assert_eq!(config.engine.event_buffer_size, 1000);
		assert_eq!(config.engine.max_concurrent_handlers, 100);

		std::env::remove_var("PRESSWORK_TEST_SERVICE_ID");
	}

	#[test]
	fn test_validation_rejects_empty_service_id() {
		let config_str = BASE_CONFIG.replace("presswork-test", "");
		let result: Result<Config, _> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_validation_rejects_unknown_primary() {
		let config_str = r#"
[service]
id = "presswork-test"

[storage]
primary = "redis"
[storage.implementations.memory]
"#;
		let result: Result<Config, _> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_validation_rejects_zero_cleanup_interval() {
		let config_str = r#"
[service]
id = "presswork-test"

[storage]
primary = "memory"
cleanup_interval_seconds = 0
[storage.implementations.memory]
"#;
		let result: Result<Config, _> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_validation_rejects_zero_max_attempts() {
		let config_str = format!("{}\n[numbering]\nmax_attempts = 0\n", BASE_CONFIG);
		let result: Result<Config, _> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file(file.path()).unwrap();
		assert_eq!(config.service.id, "presswork-test");
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_from_file_async() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE_CONFIG.as_bytes()).unwrap();

		let config = Config::from_file_async(file.path()).await.unwrap();
		assert_eq!(config.service.id, "presswork-test");
	}
}
