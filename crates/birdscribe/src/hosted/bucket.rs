//! Storage API bucket.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::HostedClient;
use crate::bucket::{validate_key, ObjectStore, PutOptions, StorageError, StorageResult, StoredObject};

/// A public bucket in a hosted project.
#[derive(Debug, Clone)]
pub struct HostedBucket {
    client: HostedClient,
    bucket: String,
}

impl HostedBucket {
    /// Use `bucket` in the project behind `client`.
    #[must_use]
    pub fn new(client: HostedClient, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

/// The storage API reports duplicates either as 409 or as a 400 whose body
/// carries the conflict.
fn is_duplicate(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("\"409\"") || body.contains("Duplicate")))
}

#[async_trait]
impl ObjectStore for HostedBucket {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        options: &PutOptions,
    ) -> StorageResult<StoredObject> {
        validate_key(key)?;
        let url = self.client.object_url(&self.bucket, key);

        let request = self
            .client
            .http()
            .post(&url)
            .header("content-type", &options.content_type)
            .header("cache-control", &options.cache_control)
            .header("x-upsert", options.overwrite.to_string())
            .body(bytes.to_vec());

        let response = self
            .client
            .authorized(request)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_duplicate(status, &body) {
                return Err(StorageError::AlreadyExists(key.to_string()));
            }
            return Err(StorageError::UploadFailed(format!("{status}: {body}")));
        }

        debug!(key, bucket = %self.bucket, size_bytes = bytes.len(), "Stored hosted object");
        Ok(StoredObject::new(key, bytes))
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        let url = self.client.object_url(&self.bucket, key);

        let response = self
            .client
            .authorized(self.client.http().get(&url))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Backend(format!("{status}: {body}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn public_url(&self, key: &str) -> String {
        self.client.public_object_url(&self.bucket, key)
    }
}
