//! File capture: one image chosen with a picker or dropped on the target.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{CaptureKind, CaptureSource, CapturedImage};
use crate::error::{Error, Result};

/// Extensions offered by the file picker filter.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif"];

const SOURCE_NAME: &str = "file";

/// How the file reached the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionOrigin {
    /// Chosen in a file picker that only offers [`ACCEPTED_EXTENSIONS`].
    #[default]
    Picker,
    /// Dropped onto the drop target; any file can arrive this way.
    Drop,
}

/// Capture source backed by the files of one selection event.
///
/// Only the first file is used.
#[derive(Debug, Clone)]
pub struct FileSource {
    files: Vec<PathBuf>,
    origin: SelectionOrigin,
}

impl FileSource {
    /// Create a source for the files of one picker or drop event.
    #[must_use]
    pub fn new(files: Vec<PathBuf>, origin: SelectionOrigin) -> Self {
        Self { files, origin }
    }

    /// Convenience for a single picked file.
    #[must_use]
    pub fn picked(path: impl Into<PathBuf>) -> Self {
        Self::new(vec![path.into()], SelectionOrigin::Picker)
    }

    /// The file that will be captured, if any.
    ///
    /// A drop of more than one file selects nothing.
    #[must_use]
    pub fn selected(&self) -> Option<&Path> {
        if self.origin == SelectionOrigin::Drop && self.files.len() > 1 {
            return None;
        }
        self.files.first().map(PathBuf::as_path)
    }

    fn check_picker_filter(path: &Path) -> Result<()> {
        let accepted = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if accepted {
            Ok(())
        } else {
            Err(Error::capture(
                SOURCE_NAME,
                format!(
                    "{} is outside the picker filter ({})",
                    path.display(),
                    ACCEPTED_EXTENSIONS.join(", ")
                ),
            ))
        }
    }
}

#[async_trait]
impl CaptureSource for FileSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn kind(&self) -> CaptureKind {
        CaptureKind::File
    }

    async fn capture(&self) -> Result<Option<CapturedImage>> {
        let Some(path) = self.selected() else {
            debug!(files = self.files.len(), origin = ?self.origin, "Nothing selected");
            return Ok(None);
        };

        let guessed = mime_guess::from_path(path).first();
        let content_type = guessed.as_ref().map(|m| m.essence_str().to_string());
        match self.origin {
            SelectionOrigin::Drop => {
                if !content_type.as_deref().is_some_and(|m| m.starts_with("image/")) {
                    debug!(
                        file = %path.display(),
                        content_type = content_type.as_deref().unwrap_or("unknown"),
                        "Dropped file rejected"
                    );
                    return Ok(None);
                }
            }
            SelectionOrigin::Picker => Self::check_picker_filter(path)?,
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::capture(SOURCE_NAME, format!("failed to read {}: {e}", path.display()))
        })?;

        let file_name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        debug!(
            file = %path.display(),
            size_bytes = bytes.len(),
            origin = ?self.origin,
            "Read selected file"
        );

        Ok(Some(CapturedImage::new(
            bytes,
            file_name,
            content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            CaptureKind::File,
        )))
    }
}
