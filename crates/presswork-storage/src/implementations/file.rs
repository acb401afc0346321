//! File-based storage backend implementation.
//!
//! Stores each value as a binary file under a per-namespace subdirectory,
//! providing simple persistence without external dependencies. Files carry a
//! fixed-size header with TTL information for automatic expiration.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use presswork_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

#[allow(clippy::doc_nested_refdefs)]
/// Fixed-size file header for TTL support.
///
/// Binary layout (64 bytes total):
/// - [0-3]: Magic bytes "PWRK"
/// - [4-5]: Version (u16, little-endian)
/// - [6-13]: Expiration timestamp (u64, little-endian, Unix seconds, 0 = never)
/// - [14-63]: Reserved/padding for future use
#[derive(Debug, Clone)]
struct FileHeader {
	magic: [u8; 4],
	version: u16,
	expires_at: u64,
	padding: [u8; 50],
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"PWRK";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	/// Creates a new header with the given TTL.
	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0 // Permanent storage
		} else {
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap_or_default()
				.as_secs()
				.saturating_add(ttl.as_secs())
		};

		Self {
			magic: *Self::MAGIC,
			version: Self::VERSION,
			expires_at,
			padding: [0; 50],
		}
	}

	/// Serializes the header to bytes.
	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(&self.magic);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes[14..64].copy_from_slice(&self.padding);
		bytes
	}

	/// Deserializes a header from bytes.
	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}

		let mut magic = [0u8; 4];
		magic.copy_from_slice(&bytes[0..4]);

		if magic != *Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut expires_bytes = [0u8; 8];
		expires_bytes.copy_from_slice(&bytes[6..14]);
		let expires_at = u64::from_le_bytes(expires_bytes);

		let mut padding = [0u8; 50];
		padding.copy_from_slice(&bytes[14..64]);

		Ok(Self {
			magic,
			version,
			expires_at,
			padding,
		})
	}

	/// Checks if the data has expired.
	fn is_expired(&self) -> bool {
		if self.expires_at == 0 {
			return false; // Permanent storage
		}

		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_secs();

		now >= self.expires_at
	}
}

/// File-based storage implementation.
///
/// Keys of the form `namespace:id` land in `<base>/<namespace>/<id>.bin`,
/// which keeps prefix listing a single directory read. Keys without a
/// namespace land in the base directory.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	fn sanitize(part: &str) -> String {
		part.replace(['/', ':', '\\'], "_")
	}

	/// Converts a storage key to its filesystem path.
	fn file_path(&self, key: &str) -> PathBuf {
		match key.split_once(':') {
			Some((namespace, id)) => self
				.base_path
				.join(Self::sanitize(namespace))
				.join(format!("{}.bin", Self::sanitize(id))),
			None => self.base_path.join(format!("{}.bin", Self::sanitize(key))),
		}
	}

	/// Reads a file and returns its payload, treating expired data as absent.
	async fn read_live(&self, path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
		let data = match fs::read(path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let header = FileHeader::deserialize(&data)?;
		if header.is_expired() {
			return Ok(None);
		}

		if data.len() > FileHeader::SIZE {
			Ok(Some(data[FileHeader::SIZE..].to_vec()))
		} else {
			Ok(Some(Vec::new()))
		}
	}

	/// Removes expired `.bin` files from one directory, non-recursively.
	async fn cleanup_dir(&self, dir: &Path) -> Result<usize, StorageError> {
		let mut removed = 0;
		let mut entries = fs::read_dir(dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("bin")) {
				continue;
			}
			match fs::read(&path).await {
				Ok(data) if data.len() >= FileHeader::SIZE => {
					if let Ok(header) = FileHeader::deserialize(&data[..FileHeader::SIZE]) {
						if header.is_expired() {
							if let Err(e) = fs::remove_file(&path).await {
								tracing::warn!(
									"Failed to remove expired file {:?}: {}",
									path,
									e
								);
							} else {
								removed += 1;
							}
						}
					}
				},
				Ok(_) => {
					tracing::debug!("Skipping file {:?}: too small for header", path);
				},
				Err(e) => {
					tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
				},
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);
		self.read_live(&path).await?.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let header = FileHeader::new(ttl.unwrap_or(Duration::ZERO));
		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&header.serialize());
		file_data.extend_from_slice(&value);

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.file_path(key);
		Ok(self.read_live(&path).await?.is_some())
	}

	async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let namespace = prefix.split(':').next().unwrap_or("");
		let dir = self.base_path.join(Self::sanitize(namespace));
		if !dir.is_dir() {
			return Ok(Vec::new());
		}

		let mut keys = Vec::new();
		let mut entries = fs::read_dir(&dir)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("bin")) {
				continue;
			}
			let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
				continue;
			};
			let key = format!("{}:{}", namespace, stem);
			if key.starts_with(prefix) && self.read_live(&path).await?.is_some() {
				keys.push(key);
			}
		}

		keys.sort();
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		if !self.base_path.is_dir() {
			return Ok(0);
		}

		let mut removed = self.cleanup_dir(&self.base_path).await?;

		let mut entries = fs::read_dir(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.is_dir() {
				removed += self.cleanup_dir(&path).await?;
			}
		}

		Ok(removed)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(s) if !s.trim().is_empty() => Ok(()),
						_ => Err("storage_path must not be empty".to_string()),
					}
				}),
			],
		);

		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/presswork")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/presswork")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file storage implementation.
pub struct Registry;

impl presswork_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn storage() -> (tempfile::TempDir, FileStorage) {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().to_path_buf());
		(dir, storage)
	}

	#[tokio::test]
	async fn roundtrip_and_delete() {
		let (_dir, storage) = storage();

		storage
			.set_bytes("orders:o1", b"payload".to_vec(), None)
			.await
			.unwrap();
		assert_eq!(storage.get_bytes("orders:o1").await.unwrap(), b"payload");
		assert!(storage.exists("orders:o1").await.unwrap());

		storage.delete("orders:o1").await.unwrap();
		assert!(!storage.exists("orders:o1").await.unwrap());
		// Deleting again is not an error.
		storage.delete("orders:o1").await.unwrap();
	}

	#[tokio::test]
	async fn namespaces_map_to_subdirectories() {
		let (dir, storage) = storage();
		storage
			.set_bytes("orders:o1", vec![1], None)
			.await
			.unwrap();

		assert!(dir.path().join("orders").join("o1.bin").is_file());
	}

	#[tokio::test]
	async fn prefix_listing_is_sorted_and_scoped() {
		let (_dir, storage) = storage();
		for key in ["counters:SAP2508", "counters:INV2508", "orders:o1"] {
			storage.set_bytes(key, vec![1], None).await.unwrap();
		}

		let keys = storage.list_keys("counters:").await.unwrap();
		assert_eq!(
			keys,
			vec!["counters:INV2508".to_string(), "counters:SAP2508".to_string()]
		);
		let keys = storage.list_keys("counters:SAP").await.unwrap();
		assert_eq!(keys, vec!["counters:SAP2508".to_string()]);
	}

	#[tokio::test]
	async fn expired_files_read_as_missing_and_get_cleaned() {
		let (dir, storage) = storage();

		// Craft a file whose header expired long ago.
		let header = FileHeader {
			magic: *FileHeader::MAGIC,
			version: FileHeader::VERSION,
			expires_at: 1,
			padding: [0; 50],
		};
		let mut data = header.serialize().to_vec();
		data.extend_from_slice(b"stale");
		let subdir = dir.path().join("orders");
		std::fs::create_dir_all(&subdir).unwrap();
		std::fs::write(subdir.join("old.bin"), data).unwrap();

		storage
			.set_bytes("orders:fresh", vec![1], None)
			.await
			.unwrap();

		assert!(matches!(
			storage.get_bytes("orders:old").await,
			Err(StorageError::NotFound)
		));
		let keys = storage.list_keys("orders:").await.unwrap();
		assert_eq!(keys, vec!["orders:fresh".to_string()]);

		let removed = storage.cleanup_expired().await.unwrap();
		assert_eq!(removed, 1);
		assert!(!subdir.join("old.bin").exists());
	}
}
