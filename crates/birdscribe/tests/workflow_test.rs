//! End-to-end capture workflow against the local backend.

use std::path::Path;
use std::sync::Arc;

use birdscribe::annotation::RandomAnnotations;
use birdscribe::capture::{FileSource, RasterSurface, ScreenshotSource, SelectionOrigin, TriggerHandle};
use birdscribe::config::{AnnotationStrategy, Config};
use birdscribe::session::{Alerter, Phase, SessionState, FILE_ALERT, SCREENSHOT_ALERT};
use birdscribe::Backend;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

#[derive(Default)]
struct Alerts(Mutex<Vec<String>>);

impl Alerter for Alerts {
    fn alert(&self, message: &str) {
        self.0.lock().push(message.to_string());
    }
}

impl Alerts {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.local.database_path = Some(dir.join("birdscribe.db"));
    config.local.bucket_dir = Some(dir.join("buckets"));
    config.local.public_base_url = Some("http://localhost:9000".to_string());
    config
}

fn key_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or_default()
}

#[tokio::test]
async fn test_file_upload_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let backend = Backend::from_config(&config_in(temp.path())).await.unwrap();
    let alerts = Arc::new(Alerts::default());
    let session = backend.session(alerts.clone());

    let bytes: Vec<u8> = (0..10 * 1024).map(|i| (i % 251) as u8).collect();
    let file = temp.path().join("cardinal.jpg");
    std::fs::write(&file, &bytes).unwrap();

    let state = session
        .run(SessionState::default(), &FileSource::picked(&file))
        .await;

    assert_eq!(state.phase, Phase::Settled);
    assert!(alerts.take().is_empty());
    assert!(state.description.is_some());
    assert!(state.analysis.is_some());

    let record = state.last_upload.expect("upload recorded");
    assert!(record.file_name.contains("cardinal.jpg"));
    assert!(record.image_url.starts_with("http://localhost:9000/birdscribe_ai/"));
    assert!(record.image_url.ends_with(".jpg"));
    assert_eq!(backend.bucket().get(key_of(&record.image_url)).await.unwrap(), bytes);

    let listed = backend.uploads().list_uploads().await.unwrap();
    assert_eq!(listed, vec![record.clone()]);
    assert_eq!(
        backend.uploads().get_upload(record.id).await.unwrap(),
        Some(record)
    );
}

#[tokio::test]
async fn test_uploads_listed_newest_first() {
    let temp = tempfile::tempdir().unwrap();
    let backend = Backend::from_config(&config_in(temp.path())).await.unwrap();
    let session = backend.session(Arc::new(Alerts::default()));

    for name in ["first.png", "second.png", "third.png"] {
        let file = temp.path().join(name);
        std::fs::write(&file, name.as_bytes()).unwrap();
        let state = session
            .run(SessionState::default(), &FileSource::picked(&file))
            .await;
        assert_eq!(state.phase, Phase::Settled);
    }

    let names: Vec<_> = backend
        .uploads()
        .list_uploads()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.file_name)
        .collect();
    assert_eq!(names, vec!["third.png", "second.png", "first.png"]);
}

#[tokio::test]
async fn test_screenshot_upload() {
    let temp = tempfile::tempdir().unwrap();
    let backend = Backend::from_config(&config_in(temp.path())).await.unwrap();
    let alerts = Arc::new(Alerts::default());
    let session = backend.session(alerts.clone());

    let page = temp.path().join("page.png");
    RgbaImage::from_pixel(32, 24, Rgba([20, 120, 40, 255]))
        .save(&page)
        .unwrap();
    let trigger = TriggerHandle::new();
    let source = ScreenshotSource::new(
        Arc::new(RasterSurface::new(&page)),
        Arc::new(trigger.clone()),
    );

    let state = session.run(SessionState::default(), &source).await;

    assert_eq!(state.phase, Phase::Settled);
    assert!(trigger.is_visible());
    let record = state.last_upload.unwrap();
    assert!(record.file_name.starts_with("screenshot-"));
    assert!(record.image_url.ends_with(".png"));

    let stored = backend.bucket().get(key_of(&record.image_url)).await.unwrap();
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (32, 24));
}

#[tokio::test]
async fn test_failures_alert_and_return_to_idle() {
    let temp = tempfile::tempdir().unwrap();
    let backend = Backend::from_config(&config_in(temp.path())).await.unwrap();
    let alerts = Arc::new(Alerts::default());
    let session = backend.session(alerts.clone());

    let missing = FileSource::picked(temp.path().join("missing.gif"));
    let state = session.run(SessionState::default(), &missing).await;
    assert_eq!(state.phase, Phase::Idle);
    assert_eq!(alerts.take(), vec![FILE_ALERT.to_string()]);

    let source = ScreenshotSource::new(
        Arc::new(RasterSurface::new(temp.path().join("missing.png"))),
        Arc::new(TriggerHandle::new()),
    );
    let state = session.run(state, &source).await;
    assert_eq!(state.phase, Phase::Idle);
    assert_eq!(alerts.take(), vec![SCREENSHOT_ALERT.to_string()]);

    let empty = FileSource::new(Vec::new(), SelectionOrigin::Picker);
    let unchanged = session.run(state.clone(), &empty).await;
    assert_eq!(unchanged, state);
    assert!(alerts.take().is_empty());

    assert!(backend.uploads().list_uploads().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_seeding_persists_across_backends() {
    let temp = tempfile::tempdir().unwrap();
    let config = config_in(temp.path());

    {
        let backend = Backend::from_config(&config).await.unwrap();
        let report = RandomAnnotations::new(backend.annotation_store())
            .ensure_seeded()
            .await
            .unwrap();
        assert_eq!((report.descriptions, report.responses), (5, 3));
    }

    let backend = Backend::from_config(&config).await.unwrap();
    let report = RandomAnnotations::new(backend.annotation_store())
        .ensure_seeded()
        .await
        .unwrap();
    assert_eq!((report.descriptions, report.responses), (0, 0));

    let status = backend.status().await.unwrap();
    assert_eq!((status.descriptions, status.responses), (5, 3));
}

#[tokio::test]
async fn test_constant_strategy_from_config() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = config_in(temp.path());
    config.annotations.strategy = AnnotationStrategy::Constant;

    let backend = Backend::from_config(&config).await.unwrap();
    let first = backend.annotation_provider().annotation().await;
    let second = backend.annotation_provider().annotation().await;
    assert_eq!(
        first.description.map(|d| d.bird_name),
        second.description.map(|d| d.bird_name)
    );
}
