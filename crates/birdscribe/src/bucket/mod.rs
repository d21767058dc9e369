//! Object storage abstraction.
//!
//! A bucket stores opaque image bytes under a key and hands out a public URL
//! for each key. Writes never overwrite: a key that already exists is an
//! error, so a generated-key collision fails instead of clobbering an object.

pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalBucket;

/// Default `Cache-Control` lifetime for uploaded objects, in seconds.
pub const DEFAULT_CACHE_CONTROL_SECS: u32 = 3600;

/// Errors raised by bucket backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An object already exists under the key and overwrite is disabled.
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    /// No object exists under the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The key is empty, absolute, or escapes the bucket.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The write itself failed.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// The backend rejected or could not serve the request.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Local file system failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bucket operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Options for a single object write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    /// MIME type of the object.
    pub content_type: String,
    /// `Cache-Control` header value served with the object.
    pub cache_control: String,
    /// Whether an existing object may be replaced.
    pub overwrite: bool,
}

impl PutOptions {
    /// Options for an image upload: caching enabled, overwrite disabled.
    #[must_use]
    pub fn for_upload(content_type: impl Into<String>, cache_control_secs: u32) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: format!("max-age={cache_control_secs}"),
            overwrite: false,
        }
    }
}

/// Outcome of a successful bucket write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Key the bytes were written under.
    pub key: String,
    /// Number of bytes written.
    pub size: u64,
    /// BLAKE3 digest of the bytes, hex encoded.
    pub digest: String,
}

impl StoredObject {
    /// Describe a write of `bytes` under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            key: key.into(),
            size: bytes.len() as u64,
            digest: blake3::hash(bytes).to_hex().to_string(),
        }
    }
}

/// A bucket that holds uploaded images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the backend (for logging).
    fn name(&self) -> &'static str;

    /// Write `bytes` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] when the key is taken and
    /// `options.overwrite` is false, or another variant if the write fails.
    async fn put(&self, key: &str, bytes: &[u8], options: &PutOptions)
        -> StorageResult<StoredObject>;

    /// Read the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored under the key.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Public URL under which `key` is served.
    fn public_url(&self, key: &str) -> String;
}

/// Reject keys that are empty, absolute, or contain parent segments.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] for a rejected key.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.starts_with('/') || key.split('/').any(|s| s == "..") {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
