//! Table access traits shared by the `SQLite` and hosted backends.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::records::{
    AnalysisResponse, BirdDescription, NewAnalysisResponse, NewBirdDescription, NewUpload,
    UploadRecord,
};

/// The `uploads` table. Insert-only from the workflow; reads are for listing.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Insert a row and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn insert_upload(&self, upload: &NewUpload) -> Result<UploadRecord>;

    /// All uploads, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn list_uploads(&self) -> Result<Vec<UploadRecord>>;

    /// A single upload by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>>;

    /// Number of upload rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn count_uploads(&self) -> Result<u64>;
}

/// The `bird_descriptions` and `responses` tables.
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Number of description rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn count_descriptions(&self) -> Result<u64>;

    /// Insert description rows in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn insert_descriptions(&self, rows: &[NewBirdDescription]) -> Result<()>;

    /// One description chosen uniformly at random, if any exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn random_description(&self) -> Result<Option<BirdDescription>>;

    /// Number of response rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn count_responses(&self) -> Result<u64>;

    /// Insert response rows in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn insert_responses(&self, rows: &[NewAnalysisResponse]) -> Result<()>;

    /// One response chosen uniformly at random, if any exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn random_response(&self) -> Result<Option<AnalysisResponse>>;
}
