//! Error types for birdscribe.
//!
//! The workflow failures (`CaptureFailure`, `StorageWrite`, `MetadataWrite`,
//! `AnnotationFetch`) sit next to the ambient storage, configuration and I/O
//! errors so that every layer can return the same [`Result`].

use std::path::PathBuf;
use thiserror::Error;

use crate::bucket::StorageError;

/// The main error type for birdscribe operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Workflow Errors ===
    /// Producing image bytes failed (bitmap render, file read, rejected file).
    #[error("capture failed in '{source_name}': {message}")]
    CaptureFailure {
        /// Name of the capture source.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// Writing the object to the bucket failed.
    #[error("storage write failed: {0}")]
    StorageWrite(#[from] StorageError),

    /// Recording the upload metadata row failed.
    #[error("metadata write failed for {image_url}: {message}")]
    MetadataWrite {
        /// Public URL of the object that was already written.
        image_url: String,
        /// Description of what went wrong.
        message: String,
    },

    /// Fetching or seeding annotation rows failed.
    #[error("annotation fetch failed for '{table}': {message}")]
    AnnotationFetch {
        /// Table that was being read or seeded.
        table: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Database Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Hosted Backend Errors ===
    /// An HTTP request to the hosted backend failed.
    #[error("hosted backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The hosted backend answered with an error status.
    #[error("hosted backend returned {status} for {endpoint}: {body}")]
    HostedStatus {
        /// HTTP status code.
        status: u16,
        /// Endpoint path that was called.
        endpoint: String,
        /// Response body, as returned.
        body: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for birdscribe operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a capture failure for the named source.
    #[must_use]
    pub fn capture(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::CaptureFailure {
            source_name,
            message: message.into(),
        }
    }

    /// Create a metadata write failure for an object that is already stored.
    #[must_use]
    pub fn metadata_write(image_url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetadataWrite {
            image_url: image_url.into(),
            message: message.into(),
        }
    }

    /// Create an annotation fetch failure.
    #[must_use]
    pub fn annotation_fetch(table: &'static str, message: impl Into<String>) -> Self {
        Self::AnnotationFetch {
            table,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error aborted a capture.
    #[must_use]
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, Self::CaptureFailure { .. })
    }
}
