//! Capture sources for birdscribe.
//!
//! A capture source produces the raw bytes of one image together with a
//! displayable preview URL. Two sources exist: a selected or dropped file,
//! and a screenshot of a rendered surface.

pub mod file;
pub mod screenshot;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use file::{FileSource, SelectionOrigin, ACCEPTED_EXTENSIONS};
pub use screenshot::{RasterSurface, ScreenshotSource, Surface, TriggerControl, TriggerHandle};

/// Which kind of source produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    /// A file chosen through a picker or dropped onto the drop target.
    File,
    /// A screenshot of a rendered surface.
    Screenshot,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Screenshot => write!(f, "screenshot"),
        }
    }
}

/// One captured image, ready for upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedImage {
    /// Raw image bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Original (or derived) file name.
    pub file_name: String,
    /// MIME type of the bytes.
    pub content_type: String,
    /// `data:` URL that displays the image locally.
    pub preview_url: String,
    /// Source that produced the image.
    pub kind: CaptureKind,
}

impl CapturedImage {
    /// Build a captured image, deriving its preview URL from the bytes.
    #[must_use]
    pub fn new(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        kind: CaptureKind,
    ) -> Self {
        let content_type = content_type.into();
        let preview_url = data_url(&content_type, &bytes);
        Self {
            bytes,
            file_name: file_name.into(),
            content_type,
            preview_url,
            kind,
        }
    }
}

// Preview URLs carry the whole image; keep them out of debug output.
impl std::fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedImage")
            .field("len", &self.bytes.len())
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Build a `data:` URL for the given bytes.
#[must_use]
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", BASE64.encode(bytes))
}

/// Something that can produce image bytes on demand.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// The name of this capture source (for logging and errors).
    fn name(&self) -> &'static str;

    /// The kind of images this source produces.
    fn kind(&self) -> CaptureKind;

    /// Produce one image.
    ///
    /// Returns `Ok(None)` when there is nothing to capture (an empty file
    /// selection).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CaptureFailure`] if the image cannot be produced.
    async fn capture(&self) -> Result<Option<CapturedImage>>;
}
