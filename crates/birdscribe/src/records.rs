//! Row types for the `uploads`, `bird_descriptions` and `responses` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata row recorded after an image is written to the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Store-assigned identifier.
    pub id: Uuid,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// Public URL of the stored object.
    pub image_url: String,
    /// Original file name as selected or captured.
    pub file_name: String,
}

/// An upload row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUpload {
    /// Public URL of the stored object.
    pub image_url: String,
    /// Original file name.
    pub file_name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewUpload {
    /// A new row stamped with the current time.
    #[must_use]
    pub fn new(image_url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            file_name: file_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// A species description shown next to the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirdDescription {
    /// Row identifier.
    pub id: Uuid,
    /// Common name of the species.
    pub bird_name: String,
    /// Free-text description.
    pub description: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

/// An analysis paragraph shown next to the preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Row identifier.
    pub id: Uuid,
    /// Free-text analysis.
    pub response: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

/// A description row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBirdDescription {
    /// Common name of the species.
    pub bird_name: String,
    /// Free-text description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// An analysis row that has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAnalysisResponse {
    /// Free-text analysis.
    pub response: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
