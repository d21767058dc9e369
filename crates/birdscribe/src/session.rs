//! The capture workflow and the state it presents.
//!
//! [`SessionState`] is a plain value: [`Session::run`] takes it, drives one
//! capture through upload and annotation, and hands back the updated value.
//! Intermediate states are published to an optional [`StateListener`].

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::annotation::AnnotationProvider;
use crate::capture::{CaptureKind, CaptureSource};
use crate::records::{AnalysisResponse, BirdDescription, UploadRecord};
use crate::upload::UploadPipeline;

/// Title shown above the session.
pub const TITLE: &str = "Birdscribe AI";

/// Alert shown when a storage or metadata write fails.
pub const UPLOAD_ALERT: &str = "Error uploading image. Please try again.";
/// Alert shown when a screenshot cannot be rendered or encoded.
pub const SCREENSHOT_ALERT: &str = "Error capturing screenshot. Please try again.";
/// Alert shown when a selected file cannot be read.
pub const FILE_ALERT: &str = "Error reading image. Please try again.";

/// Longest preview URL printed in full by [`render_text`].
const PREVIEW_DISPLAY_LIMIT: usize = 96;

/// What the session is busy with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyKind {
    /// Producing image bytes.
    Capturing,
    /// Writing to the bucket and the uploads table.
    Uploading,
}

/// Where the session is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for a capture.
    #[default]
    Idle,
    /// A workflow is in flight; the trigger is disabled.
    Busy(BusyKind),
    /// The last workflow completed.
    Settled,
}

/// Everything the presentation layer shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Workflow phase.
    pub phase: Phase,
    /// Preview of the most recent captured image.
    pub preview_url: Option<String>,
    /// Description panel contents.
    pub description: Option<BirdDescription>,
    /// Analysis panel contents.
    pub analysis: Option<AnalysisResponse>,
    /// Record of the most recent successful upload.
    pub last_upload: Option<UploadRecord>,
}

impl SessionState {
    /// Check whether a workflow is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Busy(_))
    }

    /// Status line for the current phase, if any.
    #[must_use]
    pub fn status_text(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Busy(BusyKind::Capturing) => Some("Capturing..."),
            Phase::Busy(BusyKind::Uploading) => Some("Uploading image..."),
            Phase::Idle | Phase::Settled => None,
        }
    }

    fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }
}

/// Modal alert sink.
pub trait Alerter: Send + Sync {
    /// Show `message` to the user.
    fn alert(&self, message: &str);
}

/// Receives every state the session passes through.
pub trait StateListener: Send + Sync {
    /// Called after each transition.
    fn state_changed(&self, state: &SessionState);
}

/// Alert text for a capture failure from a source of `kind`.
#[must_use]
pub fn capture_alert(kind: CaptureKind) -> &'static str {
    match kind {
        CaptureKind::File => FILE_ALERT,
        CaptureKind::Screenshot => SCREENSHOT_ALERT,
    }
}

/// Drives captures through upload and annotation.
pub struct Session {
    pipeline: UploadPipeline,
    annotations: Arc<dyn AnnotationProvider>,
    alerter: Arc<dyn Alerter>,
    listener: Option<Arc<dyn StateListener>>,
}

impl Session {
    /// Create a session.
    #[must_use]
    pub fn new(
        pipeline: UploadPipeline,
        annotations: Arc<dyn AnnotationProvider>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            pipeline,
            annotations,
            alerter,
            listener: None,
        }
    }

    /// Publish intermediate states to `listener`.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn StateListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    fn publish(&self, state: SessionState) -> SessionState {
        if let Some(listener) = &self.listener {
            listener.state_changed(&state);
        }
        state
    }

    /// Run one capture from `source`.
    ///
    /// A busy state is returned untouched. An empty selection returns the
    /// state as it was. A capture, storage or metadata failure raises one
    /// alert and returns to [`Phase::Idle`]; the preview of an image that
    /// was captured stays.
    pub async fn run(&self, state: SessionState, source: &dyn CaptureSource) -> SessionState {
        if state.is_busy() {
            debug!(source = source.name(), "Capture ignored while busy");
            return state;
        }

        let previous = state.clone();
        let state = self.publish(state.with_phase(Phase::Busy(BusyKind::Capturing)));

        let image = match source.capture().await {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!(source = source.name(), "Empty selection");
                return self.publish(previous);
            }
            Err(e) => {
                warn!(source = source.name(), error = %e, "Capture failed");
                self.alerter.alert(capture_alert(source.kind()));
                return self.publish(state.with_phase(Phase::Idle));
            }
        };

        let state = self.publish(SessionState {
            phase: Phase::Busy(BusyKind::Uploading),
            preview_url: Some(image.preview_url.clone()),
            description: None,
            analysis: None,
            last_upload: None,
        });

        let record = match self
            .pipeline
            .upload(&image.bytes, &image.file_name, &image.content_type)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                warn!(file_name = %image.file_name, error = %e, "Upload failed");
                self.alerter.alert(UPLOAD_ALERT);
                return self.publish(state.with_phase(Phase::Idle));
            }
        };

        let annotation = self.annotations.annotation().await;
        info!(
            id = %record.id,
            kind = %image.kind,
            strategy = self.annotations.name(),
            described = annotation.description.is_some(),
            analyzed = annotation.analysis.is_some(),
            "Capture settled"
        );

        self.publish(SessionState {
            phase: Phase::Settled,
            preview_url: state.preview_url,
            description: annotation.description,
            analysis: annotation.analysis,
            last_upload: Some(record),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("pipeline", &self.pipeline)
            .field("annotations", &self.annotations.name())
            .finish_non_exhaustive()
    }
}

/// Render the session as plain text. Panels without data are omitted.
#[must_use]
pub fn render_text(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");

    if let Some(status) = state.status_text() {
        let _ = writeln!(out, "{status}");
    }

    if let Some(preview) = &state.preview_url {
        if preview.len() > PREVIEW_DISPLAY_LIMIT {
            let cut = preview
                .char_indices()
                .map(|(i, _)| i)
                .take_while(|i| *i <= PREVIEW_DISPLAY_LIMIT)
                .last()
                .unwrap_or(0);
            let _ = writeln!(
                out,
                "\nPreview: {}... ({} bytes)",
                &preview[..cut],
                preview.len()
            );
        } else {
            let _ = writeln!(out, "\nPreview: {preview}");
        }
    }

    if let Some(upload) = &state.last_upload {
        let _ = writeln!(out, "Stored:  {}", upload.image_url);
    }

    if let Some(description) = &state.description {
        let _ = writeln!(out, "\n== {} ==", description.bird_name);
        let _ = writeln!(out, "{}", description.description);
    }

    if let Some(analysis) = &state.analysis {
        let _ = writeln!(out, "\n== Analysis ==");
        let _ = writeln!(out, "{}", analysis.response);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, ConstantAnnotations};
    use crate::bucket::{LocalBucket, ObjectStore, PutOptions, StorageError, StorageResult, StoredObject};
    use crate::capture::{
        CapturedImage, FileSource, ScreenshotSource, SelectionOrigin, Surface, TriggerHandle,
    };
    use crate::error::{Error, Result};
    use crate::storage::{Storage, UploadStore};
    use async_trait::async_trait;
    use image::RgbaImage;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingAlerter {
        alerts: Mutex<Vec<String>>,
    }

    impl RecordingAlerter {
        fn alerts(&self) -> Vec<String> {
            self.alerts.lock().clone()
        }
    }

    impl Alerter for RecordingAlerter {
        fn alert(&self, message: &str) {
            self.alerts.lock().push(message.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        phases: Mutex<Vec<Phase>>,
    }

    impl StateListener for RecordingListener {
        fn state_changed(&self, state: &SessionState) {
            self.phases.lock().push(state.phase);
        }
    }

    struct NoAnnotations;

    #[async_trait]
    impl AnnotationProvider for NoAnnotations {
        fn name(&self) -> &'static str {
            "none"
        }

        async fn annotation(&self) -> Annotation {
            Annotation::default()
        }
    }

    struct FailingBucket;

    #[async_trait]
    impl ObjectStore for FailingBucket {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn put(&self, _: &str, _: &[u8], _: &PutOptions) -> StorageResult<StoredObject> {
            Err(StorageError::UploadFailed("bucket not found".to_string()))
        }

        async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            Err(StorageError::NotFound(key.to_string()))
        }

        fn public_url(&self, key: &str) -> String {
            format!("http://failing/{key}")
        }
    }

    struct EmptySurface;

    impl Surface for EmptySurface {
        fn render(&self) -> Result<RgbaImage> {
            Ok(RgbaImage::new(0, 0))
        }
    }

    struct FixedSource;

    #[async_trait]
    impl CaptureSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn kind(&self) -> CaptureKind {
            CaptureKind::File
        }

        async fn capture(&self) -> Result<Option<CapturedImage>> {
            Ok(Some(CapturedImage::new(
                vec![0xAB; 10 * 1024],
                "cardinal.jpg",
                "image/jpeg",
                CaptureKind::File,
            )))
        }
    }

    struct BrokenSource;

    #[async_trait]
    impl CaptureSource for BrokenSource {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn kind(&self) -> CaptureKind {
            CaptureKind::File
        }

        async fn capture(&self) -> Result<Option<CapturedImage>> {
            Err(Error::capture("broken", "permission denied"))
        }
    }

    struct Harness {
        temp: tempfile::TempDir,
        bucket: Arc<LocalBucket>,
        storage: Arc<Storage>,
        alerter: Arc<RecordingAlerter>,
        listener: Arc<RecordingListener>,
        session: Session,
    }

    async fn harness(annotations: Arc<dyn AnnotationProvider>) -> Harness {
        let temp = tempfile::tempdir().unwrap();
        let bucket = Arc::new(
            LocalBucket::open(temp.path(), "birdscribe_ai", None)
                .await
                .unwrap(),
        );
        let storage = Arc::new(Storage::open_in_memory().unwrap());
        let alerter = Arc::new(RecordingAlerter::default());
        let listener = Arc::new(RecordingListener::default());
        let session = Session::new(
            UploadPipeline::new(bucket.clone(), storage.clone()),
            annotations,
            alerter.clone(),
        )
        .with_listener(listener.clone());

        Harness {
            temp,
            bucket,
            storage,
            alerter,
            listener,
            session,
        }
    }

    #[tokio::test]
    async fn test_successful_run_settles() {
        let h = harness(Arc::new(ConstantAnnotations::new())).await;

        let state = h.session.run(SessionState::default(), &FixedSource).await;

        assert_eq!(state.phase, Phase::Settled);
        assert!(state.preview_url.unwrap().starts_with("data:image/jpeg;base64,"));
        assert!(state.description.is_some());
        assert!(state.analysis.is_some());

        let record = state.last_upload.unwrap();
        assert!(record.image_url.ends_with(".jpg"));
        let key = record.image_url.rsplit('/').next().unwrap();
        assert_eq!(h.bucket.get(key).await.unwrap(), vec![0xAB; 10 * 1024]);
        assert!(h.alerter.alerts().is_empty());
        assert_eq!(
            *h.listener.phases.lock(),
            vec![
                Phase::Busy(BusyKind::Capturing),
                Phase::Busy(BusyKind::Uploading),
                Phase::Settled,
            ]
        );
    }

    #[tokio::test]
    async fn test_busy_state_is_ignored() {
        let h = harness(Arc::new(NoAnnotations)).await;
        let busy = SessionState {
            phase: Phase::Busy(BusyKind::Uploading),
            ..SessionState::default()
        };

        let state = h.session.run(busy.clone(), &FixedSource).await;

        assert_eq!(state, busy);
        assert!(h.storage.list_uploads().await.unwrap().is_empty());
        assert!(h.listener.phases.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_selection_leaves_state() {
        let h = harness(Arc::new(NoAnnotations)).await;
        let before = SessionState {
            phase: Phase::Settled,
            preview_url: Some("data:image/png;base64,AAAA".to_string()),
            ..SessionState::default()
        };

        let source = FileSource::new(Vec::new(), SelectionOrigin::Drop);
        let state = h.session.run(before.clone(), &source).await;

        assert_eq!(state, before);
        assert!(h.alerter.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_drop_raises_no_alert() {
        let h = harness(Arc::new(NoAnnotations)).await;
        let notes = h.temp.path().join("notes.txt");
        std::fs::write(&notes, b"hello").unwrap();

        let source = FileSource::new(vec![notes], SelectionOrigin::Drop);
        let state = h.session.run(SessionState::default(), &source).await;

        assert_eq!(state, SessionState::default());
        assert!(h.alerter.alerts().is_empty());
        assert!(h.storage.list_uploads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_screenshot_alerts_once_and_restores_trigger() {
        let h = harness(Arc::new(NoAnnotations)).await;
        let trigger = TriggerHandle::new();
        let source = ScreenshotSource::new(Arc::new(EmptySurface), Arc::new(trigger.clone()));

        let state = h.session.run(SessionState::default(), &source).await;

        assert_eq!(state.phase, Phase::Idle);
        assert!(!state.is_busy());
        assert!(trigger.is_visible());
        assert_eq!(h.alerter.alerts(), vec![SCREENSHOT_ALERT.to_string()]);
        assert!(h.storage.list_uploads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_capture_failure_alert() {
        let h = harness(Arc::new(NoAnnotations)).await;

        let state = h.session.run(SessionState::default(), &BrokenSource).await;

        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(h.alerter.alerts(), vec![FILE_ALERT.to_string()]);
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_preview() {
        let storage = Arc::new(Storage::open_in_memory().unwrap());
        let alerter = Arc::new(RecordingAlerter::default());
        let session = Session::new(
            UploadPipeline::new(Arc::new(FailingBucket), storage.clone()),
            Arc::new(ConstantAnnotations::new()),
            alerter.clone(),
        );

        let state = session.run(SessionState::default(), &FixedSource).await;

        assert_eq!(state.phase, Phase::Idle);
        assert!(state.preview_url.is_some());
        assert!(state.last_upload.is_none());
        assert!(state.description.is_none());
        assert_eq!(alerter.alerts(), vec![UPLOAD_ALERT.to_string()]);
        assert!(storage.list_uploads().await.unwrap().is_empty());
    }

    #[test]
    fn test_status_text() {
        let mut state = SessionState::default();
        assert_eq!(state.status_text(), None);
        state.phase = Phase::Busy(BusyKind::Capturing);
        assert_eq!(state.status_text(), Some("Capturing..."));
        state.phase = Phase::Busy(BusyKind::Uploading);
        assert_eq!(state.status_text(), Some("Uploading image..."));
        state.phase = Phase::Settled;
        assert_eq!(state.status_text(), None);
    }

    #[test]
    fn test_capture_alert_by_kind() {
        assert_eq!(capture_alert(CaptureKind::File), FILE_ALERT);
        assert_eq!(capture_alert(CaptureKind::Screenshot), SCREENSHOT_ALERT);
    }

    #[test]
    fn test_render_omits_empty_panels() {
        let text = render_text(&SessionState::default());
        assert_eq!(text, "Birdscribe AI\n");
    }

    #[tokio::test]
    async fn test_render_settled_state() {
        let annotation = ConstantAnnotations::new().annotation().await;
        let state = SessionState {
            phase: Phase::Settled,
            preview_url: Some(format!("data:image/png;base64,{}", "A".repeat(500))),
            description: annotation.description,
            analysis: annotation.analysis,
            last_upload: None,
        };

        let text = render_text(&state);
        assert!(text.starts_with("Birdscribe AI\n"));
        assert!(text.contains("== Northern Cardinal =="));
        assert!(text.contains("== Analysis =="));
        assert!(text.contains("..."));
        assert!(!text.contains(&"A".repeat(200)));
    }

    #[test]
    fn test_render_busy_status() {
        let state = SessionState {
            phase: Phase::Busy(BusyKind::Uploading),
            preview_url: Some("data:image/gif;base64,R0lG".to_string()),
            ..SessionState::default()
        };
        let text = render_text(&state);
        assert!(text.contains("Uploading image..."));
        assert!(text.contains("Preview: data:image/gif;base64,R0lG"));
    }
}
