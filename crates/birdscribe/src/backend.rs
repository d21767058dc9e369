//! Wiring of buckets, tables and annotation providers from configuration.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::annotation::{AnnotationProvider, ConstantAnnotations, RandomAnnotations};
use crate::bucket::{LocalBucket, ObjectStore};
use crate::config::{AnnotationStrategy, BackendKind, Config};
use crate::error::{Error, Result};
use crate::hosted::{HostedBucket, HostedClient, HostedTables};
use crate::session::{Alerter, Session};
use crate::storage::{AnnotationStore, Storage, StorageStats, UploadStore};
use crate::upload::UploadPipeline;

/// The stores behind one configured backend.
#[derive(Clone)]
pub struct Backend {
    kind: BackendKind,
    bucket_name: String,
    bucket: Arc<dyn ObjectStore>,
    uploads: Arc<dyn UploadStore>,
    annotation_store: Arc<dyn AnnotationStore>,
    local: Option<Arc<Storage>>,
    cache_control_secs: u32,
    strategy: AnnotationStrategy,
}

/// Summary printed by `birdscribe status`.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    /// Backend kind.
    pub backend: BackendKind,
    /// Bucket receiving uploads.
    pub bucket: String,
    /// Annotation strategy.
    pub strategy: AnnotationStrategy,
    /// Rows in `uploads`.
    pub uploads: u64,
    /// Rows in `bird_descriptions`.
    pub descriptions: u64,
    /// Rows in `responses`.
    pub responses: u64,
    /// Database details, for the local backend.
    pub database: Option<StorageStats>,
}

impl Backend {
    /// Open the backend selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database or bucket directory cannot be opened,
    /// or if the hosted settings are missing.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let bucket_name = config.storage.bucket.clone();

        let (bucket, uploads, annotation_store, local): (
            Arc<dyn ObjectStore>,
            Arc<dyn UploadStore>,
            Arc<dyn AnnotationStore>,
            Option<Arc<Storage>>,
        ) = match config.backend.kind {
            BackendKind::Local => {
                let storage = Arc::new(Storage::open(config.database_path())?);
                let bucket = LocalBucket::open(
                    config.bucket_dir(),
                    bucket_name.as_str(),
                    config.local.public_base_url.clone(),
                )
                .await?;
                debug!(database = %storage.path().display(), "Opened local backend");
                (Arc::new(bucket), storage.clone(), storage.clone(), Some(storage))
            }
            BackendKind::Hosted => {
                let (Some(url), Some(api_key)) = (&config.hosted.url, &config.hosted.api_key)
                else {
                    return Err(Error::ConfigValidation {
                        message: "hosted.url and hosted.api_key are required".to_string(),
                    });
                };
                let client = HostedClient::new(url.as_str(), api_key.as_str())?;
                let tables = Arc::new(HostedTables::new(client.clone()));
                debug!(url = %client.base_url(), "Using hosted backend");
                (
                    Arc::new(HostedBucket::new(client, bucket_name.as_str())),
                    tables.clone(),
                    tables,
                    None,
                )
            }
        };

        info!(
            backend = ?config.backend.kind,
            bucket = %bucket_name,
            strategy = %config.annotations.strategy,
            "Backend ready"
        );

        Ok(Self {
            kind: config.backend.kind,
            bucket_name,
            bucket,
            uploads,
            annotation_store,
            local,
            cache_control_secs: config.storage.cache_control_secs,
            strategy: config.annotations.strategy,
        })
    }

    /// The bucket.
    #[must_use]
    pub fn bucket(&self) -> Arc<dyn ObjectStore> {
        self.bucket.clone()
    }

    /// The `uploads` table.
    #[must_use]
    pub fn uploads(&self) -> Arc<dyn UploadStore> {
        self.uploads.clone()
    }

    /// The annotation tables.
    #[must_use]
    pub fn annotation_store(&self) -> Arc<dyn AnnotationStore> {
        self.annotation_store.clone()
    }

    /// An upload pipeline over this backend.
    #[must_use]
    pub fn pipeline(&self) -> UploadPipeline {
        UploadPipeline::new(self.bucket.clone(), self.uploads.clone())
            .with_cache_control_secs(self.cache_control_secs)
    }

    /// The configured annotation provider.
    #[must_use]
    pub fn annotation_provider(&self) -> Arc<dyn AnnotationProvider> {
        match self.strategy {
            AnnotationStrategy::Random => {
                Arc::new(RandomAnnotations::new(self.annotation_store.clone()))
            }
            AnnotationStrategy::Constant => Arc::new(ConstantAnnotations::new()),
        }
    }

    /// A session that reports alerts to `alerter`.
    #[must_use]
    pub fn session(&self, alerter: Arc<dyn Alerter>) -> Session {
        Session::new(self.pipeline(), self.annotation_provider(), alerter)
    }

    /// Row counts and, for the local backend, database details.
    ///
    /// # Errors
    ///
    /// Returns an error if any table cannot be read.
    pub async fn status(&self) -> Result<BackendStatus> {
        let database = match &self.local {
            Some(storage) => Some(storage.stats()?),
            None => None,
        };

        Ok(BackendStatus {
            backend: self.kind,
            bucket: self.bucket_name.clone(),
            strategy: self.strategy,
            uploads: self.uploads.count_uploads().await?,
            descriptions: self.annotation_store.count_descriptions().await?,
            responses: self.annotation_store.count_responses().await?,
            database,
        })
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind)
            .field("bucket", &self.bucket_name)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
