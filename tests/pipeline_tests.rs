use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageBuffer, Rgb};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atelier::config::{PipelineConfig, StorageConfig};
use atelier::error::AppError;
use atelier::models::{ImageFile, ImageRef};
use atelier::services::{ImagePipeline, PipelineEvent};
use atelier::storage::{create_storage, LocalStorage, ObjectStorage};

fn png_file(name: &str, width: u32, height: u32) -> ImageFile {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .unwrap();
    ImageFile::new(name, "image/png", bytes)
}

fn decode_data_uri(reference: &ImageRef) -> DynamicImage {
    let uri = match reference {
        ImageRef::DataUri(uri) => uri,
        other => panic!("expected data URI, got {other:?}"),
    };
    let encoded = uri
        .strip_prefix("data:image/jpeg;base64,")
        .expect("data URI prefix");
    let bytes = STANDARD.decode(encoded).unwrap();
    image::load_from_memory(&bytes).unwrap()
}

struct FailingStorage;

#[async_trait]
impl ObjectStorage for FailingStorage {
    async fn upload(&self, _data: &[u8], _mime: &str) -> atelier::Result<String> {
        Err(AppError::StorageUnavailable("offline".to_string()))
    }
}

/// First upload stalls so the second image finishes first.
struct SlowFirstStorage {
    calls: AtomicUsize,
}

#[async_trait]
impl ObjectStorage for SlowFirstStorage {
    async fn upload(&self, _data: &[u8], _mime: &str) -> atelier::Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        Ok(format!("https://store.example/obj-{n}.jpg"))
    }
}

#[tokio::test]
async fn oversized_files_are_rejected_before_decoding() {
    let storage = Arc::new(FailingStorage);
    let pipeline = ImagePipeline::new(PipelineConfig::default(), storage);

    // 11 MiB of zeros is not decodable; the size check must fire first.
    let file = ImageFile::new("big.png", "image/png", vec![0u8; 11 * 1024 * 1024]);
    let err = pipeline
        .prepare(&file, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        AppError::FileTooLarge { size, limit } => {
            assert_eq!(size, 11 * 1024 * 1024);
            assert_eq!(limit, 10 * 1024 * 1024);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_image_payloads_are_rejected() {
    let pipeline = ImagePipeline::new(PipelineConfig::default(), Arc::new(FailingStorage));
    let file = ImageFile::new("notes.txt", "text/plain", b"hello".to_vec());
    let err = pipeline
        .prepare(&file, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidFileKind));
}

#[tokio::test]
async fn unsupported_image_formats_are_rejected() {
    let pipeline = ImagePipeline::new(PipelineConfig::default(), Arc::new(FailingStorage));
    let file = ImageFile::new("anim.gif", "image/gif", vec![0u8; 64]);
    let err = pipeline
        .prepare(&file, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        AppError::UnsupportedFormat(mime) => assert_eq!(mime, "image/gif"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn large_images_are_downscaled_and_uploaded() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());
    let pipeline = ImagePipeline::new(PipelineConfig::default(), storage);

    let prepared = pipeline
        .prepare(&png_file("wide.png", 2500, 1700), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.width, 2048);
    assert_eq!(prepared.height, 1393);

    let url = match &prepared.reference {
        ImageRef::Remote(url) => url.clone(),
        other => panic!("expected remote URL, got {other:?}"),
    };
    let stored = std::fs::read(url.strip_prefix("file://").unwrap()).unwrap();
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (2048, 1393));
}

#[tokio::test]
async fn small_images_keep_their_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());
    let pipeline = ImagePipeline::new(PipelineConfig::default(), storage);

    let prepared = pipeline
        .prepare(&png_file("small.png", 320, 200), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((prepared.width, prepared.height), (320, 200));
}

#[tokio::test]
async fn storage_failure_falls_back_to_an_inline_image() {
    let pipeline = ImagePipeline::new(PipelineConfig::default(), Arc::new(FailingStorage));

    let prepared = pipeline
        .prepare(&png_file("wide.png", 2500, 1700), &CancellationToken::new())
        .await
        .unwrap();

    let decoded = decode_data_uri(&prepared.reference);
    assert!(decoded.width() <= 1024);
    assert!(decoded.height() <= 1024);
    assert_eq!(decoded.width(), 1024);
}

#[tokio::test]
async fn exhausted_fallback_budget_is_an_error() {
    let mut config = PipelineConfig::default();
    config.fallback_size = 1;
    let pipeline = ImagePipeline::new(config, Arc::new(FailingStorage));

    let err = pipeline
        .prepare(&png_file("a.png", 256, 256), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CompressionExhausted));
}

#[tokio::test]
async fn impossible_primary_target_still_uploads_the_last_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());

    let mut config = PipelineConfig::default();
    config.target_size = 1;
    let quality_floor = *config.quality_levels.last().unwrap();
    let total_levels = config.quality_levels.len();
    let (pipeline, mut events) = ImagePipeline::with_events(config, storage);

    let prepared = pipeline
        .prepare(&png_file("a.png", 400, 400), &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(prepared.reference, ImageRef::Remote(_)));
    assert_eq!(prepared.quality, quality_floor);

    let mut attempts = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, PipelineEvent::CompressionAttempt { .. }) {
            attempts += 1;
        }
    }
    assert_eq!(attempts, total_levels);
}

#[tokio::test]
async fn generous_target_accepts_the_first_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).unwrap());

    let config = PipelineConfig::default();
    let first_quality = config.quality_levels[0];
    let (pipeline, mut events) = ImagePipeline::with_events(config, storage);

    let prepared = pipeline
        .prepare(&png_file("a.png", 120, 90), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(prepared.quality, first_quality);

    let mut attempts = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, PipelineEvent::CompressionAttempt { .. }) {
            attempts += 1;
        }
    }
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn cancelled_batches_return_immediately() {
    let pipeline = ImagePipeline::new(PipelineConfig::default(), Arc::new(FailingStorage));
    let token = CancellationToken::new();
    token.cancel();

    let files = vec![png_file("a.png", 64, 64), png_file("b.png", 64, 64)];
    let err = pipeline.prepare_all(&files, &token).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled));
}

#[tokio::test]
async fn batch_results_keep_input_order() {
    let storage = Arc::new(SlowFirstStorage {
        calls: AtomicUsize::new(0),
    });
    let pipeline = ImagePipeline::new(PipelineConfig::default(), storage);

    let files = vec![png_file("first.png", 100, 50), png_file("second.png", 80, 40)];
    let prepared = pipeline
        .prepare_all(&files, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(prepared.len(), 2);
    assert_eq!((prepared[0].width, prepared[0].height), (100, 50));
    assert_eq!((prepared[1].width, prepared[1].height), (80, 40));
    match (&prepared[0].reference, &prepared[1].reference) {
        (ImageRef::Remote(a), ImageRef::Remote(b)) => {
            assert!(a.ends_with("obj-0.jpg"));
            assert!(b.ends_with("obj-1.jpg"));
        }
        other => panic!("expected remote URLs, got {other:?}"),
    }
}

#[tokio::test]
async fn http_storage_round_trips_through_the_upload_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Authorization", "Key sekrit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://cdn.example/objects/abc.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = StorageConfig {
        backend: "http".to_string(),
        upload_url: Some(format!("{}/upload", server.uri())),
        api_key: Some("sekrit".to_string()),
        ..StorageConfig::default()
    };
    let storage: Arc<dyn ObjectStorage> = Arc::from(create_storage(&config).unwrap());
    let pipeline = ImagePipeline::new(PipelineConfig::default(), storage);

    let prepared = pipeline
        .prepare(&png_file("a.png", 64, 64), &CancellationToken::new())
        .await
        .unwrap();
    match prepared.reference {
        ImageRef::Remote(url) => assert_eq!(url, "https://cdn.example/objects/abc.jpg"),
        other => panic!("expected remote URL, got {other:?}"),
    }
}

#[tokio::test]
async fn http_storage_errors_drive_the_inline_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = StorageConfig {
        backend: "http".to_string(),
        upload_url: Some(server.uri()),
        api_key: None,
        ..StorageConfig::default()
    };
    let storage: Arc<dyn ObjectStorage> = Arc::from(create_storage(&config).unwrap());
    let pipeline = ImagePipeline::new(PipelineConfig::default(), storage);

    let prepared = pipeline
        .prepare(&png_file("a.png", 64, 64), &CancellationToken::new())
        .await
        .unwrap();
    let decoded = decode_data_uri(&prepared.reference);
    assert_eq!((decoded.width(), decoded.height()), (64, 64));
}
