//! Screenshot capture of a rendered surface.
//!
//! The trigger control is hidden while the surface renders so it does not
//! appear in its own screenshot, and is shown again on every exit path.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use image::{ImageFormat, RgbaImage};
use tracing::{debug, trace};

use super::{CaptureKind, CaptureSource, CapturedImage};
use crate::error::{Error, Result};

const SOURCE_NAME: &str = "screenshot";

/// A surface that can render itself to an in-memory bitmap.
pub trait Surface: Send + Sync {
    /// Render the current contents.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&self) -> Result<RgbaImage>;
}

/// The control that triggers a capture.
pub trait TriggerControl: Send + Sync {
    /// Show or hide the control.
    fn set_visible(&self, visible: bool);
}

/// A cloneable visibility flag for a trigger control.
///
/// Clones share the same flag, so the presentation layer can keep one handle
/// and pass another to the screenshot source.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    visible: Arc<AtomicBool>,
}

impl TriggerHandle {
    /// Create a visible trigger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check whether the trigger is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }
}

impl Default for TriggerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerControl for TriggerHandle {
    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }
}

/// Hides a trigger for as long as it is alive.
struct HiddenTrigger<'a> {
    trigger: &'a dyn TriggerControl,
}

impl<'a> HiddenTrigger<'a> {
    fn new(trigger: &'a dyn TriggerControl) -> Self {
        trigger.set_visible(false);
        trace!("Trigger hidden for capture");
        Self { trigger }
    }
}

impl Drop for HiddenTrigger<'_> {
    fn drop(&mut self) {
        self.trigger.set_visible(true);
        trace!("Trigger restored");
    }
}

/// A surface whose contents are a bitmap stored in an image file.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    path: PathBuf,
}

impl RasterSurface {
    /// Create a surface backed by the image at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Surface for RasterSurface {
    fn render(&self) -> Result<RgbaImage> {
        let image = image::open(&self.path).map_err(|e| {
            Error::capture(
                SOURCE_NAME,
                format!("failed to render {}: {e}", self.path.display()),
            )
        })?;
        Ok(image.to_rgba8())
    }
}

/// Capture source that screenshots a surface.
#[derive(Clone)]
pub struct ScreenshotSource {
    surface: Arc<dyn Surface>,
    trigger: Arc<dyn TriggerControl>,
}

impl ScreenshotSource {
    /// Create a screenshot source for `surface`, hiding `trigger` while it renders.
    #[must_use]
    pub fn new(surface: Arc<dyn Surface>, trigger: Arc<dyn TriggerControl>) -> Self {
        Self { surface, trigger }
    }

    fn render_hidden(&self) -> Result<RgbaImage> {
        let _hidden = HiddenTrigger::new(self.trigger.as_ref());
        self.surface.render()
    }
}

impl std::fmt::Debug for ScreenshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenshotSource").finish_non_exhaustive()
    }
}

/// Encode a bitmap as PNG.
///
/// # Errors
///
/// Returns a capture failure for an empty bitmap or an encoder error.
pub fn encode_png(bitmap: &RgbaImage) -> Result<Vec<u8>> {
    if bitmap.width() == 0 || bitmap.height() == 0 {
        return Err(Error::capture(
            SOURCE_NAME,
            format!(
                "rendered surface is empty ({}x{})",
                bitmap.width(),
                bitmap.height()
            ),
        ));
    }

    let mut buffer = Cursor::new(Vec::new());
    bitmap
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| Error::capture(SOURCE_NAME, format!("PNG encoding failed: {e}")))?;
    Ok(buffer.into_inner())
}

#[async_trait]
impl CaptureSource for ScreenshotSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn kind(&self) -> CaptureKind {
        CaptureKind::Screenshot
    }

    async fn capture(&self) -> Result<Option<CapturedImage>> {
        let bitmap = self.render_hidden()?;
        let png = encode_png(&bitmap)?;
        let file_name = format!("screenshot-{}.png", Utc::now().format("%Y%m%d-%H%M%S%3f"));

        debug!(
            width = bitmap.width(),
            height = bitmap.height(),
            size_bytes = png.len(),
            "Encoded screenshot"
        );

        Ok(Some(CapturedImage::new(
            png,
            file_name,
            "image/png",
            CaptureKind::Screenshot,
        )))
    }
}
