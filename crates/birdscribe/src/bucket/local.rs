//! Directory-backed bucket.
//!
//! Objects live at `<root>/<bucket>/<key>`. Public URLs are built from a
//! configured base URL (for a directory served by a static file server) or
//! fall back to `file://` URLs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{validate_key, ObjectStore, PutOptions, StorageError, StorageResult, StoredObject};

/// Bucket stored in a local directory.
#[derive(Debug, Clone)]
pub struct LocalBucket {
    dir: PathBuf,
    bucket: String,
    public_base_url: Option<String>,
}

impl LocalBucket {
    /// Open (creating if needed) the bucket directory `<root>/<bucket>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(
        root: impl AsRef<Path>,
        bucket: impl Into<String>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let bucket = bucket.into();
        let dir = root.as_ref().join(&bucket);
        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::Backend(format!(
                "failed to create bucket directory {}: {e}",
                dir.display()
            ))
        })?;
        debug!("Opened local bucket at {}", dir.display());
        Ok(Self {
            dir,
            bucket,
            public_base_url,
        })
    }

    /// Directory holding this bucket's objects.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalBucket {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        options: &PutOptions,
    ) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut open = fs::OpenOptions::new();
        open.write(true);
        if options.overwrite {
            open.create(true).truncate(true);
        } else {
            open.create_new(true);
        }

        let mut file = match open.open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(key.to_string()));
            }
            Err(e) => {
                return Err(StorageError::UploadFailed(format!(
                    "failed to create {}: {e}",
                    path.display()
                )));
            }
        };

        let written = async {
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            // Never leave a truncated object behind under a fresh key.
            let _ = fs::remove_file(&path).await;
            return Err(StorageError::UploadFailed(format!(
                "failed to write {}: {e}",
                path.display()
            )));
        }

        let stored = StoredObject::new(key, bytes);
        info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = stored.size,
            cache_control = %options.cache_control,
            content_type = %options.content_type,
            "Local bucket write successful"
        );
        Ok(stored)
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}/{}", base.trim_end_matches('/'), self.bucket, key),
            None => format!("file://{}", self.dir.join(key).display()),
        }
    }
}
