//! Upload pipeline: bucket write, then metadata insert.
//!
//! The two writes are not atomic. If the insert fails after the bucket write
//! succeeded, the object stays in the bucket with no row pointing at it; the
//! key is logged and nothing reconciles it.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::bucket::{ObjectStore, PutOptions, DEFAULT_CACHE_CONTROL_SECS};
use crate::error::{Error, Result};
use crate::records::{NewUpload, UploadRecord};
use crate::storage::UploadStore;

/// Extension used when neither the file name nor the content type give one.
const FALLBACK_EXTENSION: &str = "bin";

/// Build a storage key for a file named `original_name`.
///
/// Keys are `<unix-nanos>-<random hex>.<ext>`. If the clock cannot be
/// expressed in nanoseconds the key falls back to a random fraction,
/// `0.<digits>.<ext>`.
#[must_use]
pub fn generate_storage_key(original_name: &str, content_type: &str) -> String {
    let ext = key_extension(original_name, content_type);
    match Utc::now().timestamp_nanos_opt() {
        Some(nanos) => format!("{nanos}-{:08x}.{ext}", fastrand::u32(..)),
        None => random_fraction_key(&ext),
    }
}

fn random_fraction_key(ext: &str) -> String {
    format!("0.{:016}.{ext}", fastrand::u64(..10_000_000_000_000_000))
}

/// Extension for the storage key: the file's own, else one for its type.
fn key_extension(original_name: &str, content_type: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|ext| (*ext).to_string())
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Writes image bytes to a bucket and records them in the `uploads` table.
#[derive(Clone)]
pub struct UploadPipeline {
    bucket: Arc<dyn ObjectStore>,
    uploads: Arc<dyn UploadStore>,
    cache_control_secs: u32,
}

impl UploadPipeline {
    /// Create a pipeline over the given bucket and table.
    #[must_use]
    pub fn new(bucket: Arc<dyn ObjectStore>, uploads: Arc<dyn UploadStore>) -> Self {
        Self {
            bucket,
            uploads,
            cache_control_secs: DEFAULT_CACHE_CONTROL_SECS,
        }
    }

    /// Set the `Cache-Control` max-age for uploaded objects.
    #[must_use]
    pub fn with_cache_control_secs(mut self, secs: u32) -> Self {
        self.cache_control_secs = secs;
        self
    }

    /// Store `bytes` and record them under `original_name`.
    ///
    /// Single attempt, no retry. Every successful call creates a new object
    /// and a new row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageWrite`] if the bucket write fails (no row is
    /// inserted), or [`Error::MetadataWrite`] if the insert fails after the
    /// object was stored.
    pub async fn upload(
        &self,
        bytes: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> Result<UploadRecord> {
        let key = generate_storage_key(original_name, content_type);
        let options = PutOptions::for_upload(content_type, self.cache_control_secs);

        debug!(key = %key, size_bytes = bytes.len(), bucket = self.bucket.name(), "Writing object");
        let stored = self.bucket.put(&key, bytes, &options).await?;

        let image_url = self.bucket.public_url(&stored.key);
        let row = NewUpload::new(image_url.clone(), original_name);

        let record = match self.uploads.insert_upload(&row).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    key = %stored.key,
                    image_url = %image_url,
                    error = %e,
                    "Metadata insert failed; object left in bucket without a record"
                );
                return Err(Error::metadata_write(image_url, e.to_string()));
            }
        };

        info!(
            id = %record.id,
            key = %stored.key,
            digest = %stored.digest,
            size_bytes = stored.size,
            "Upload successful"
        );
        Ok(record)
    }
}

impl std::fmt::Debug for UploadPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPipeline")
            .field("bucket", &self.bucket.name())
            .field("cache_control_secs", &self.cache_control_secs)
            .finish_non_exhaustive()
    }
}
