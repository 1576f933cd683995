//! Integration tests against a stand-in conversion server.
//!
//! A `wiremock` server plays the `/upload` and `/download/..` endpoints, and
//! real image files are written to a temp dir so intake probes real bytes.
//!
//! Run with:
//!   cargo test --test upload -- --nocapture

use edgequake_imgconvert::{
    download, Action, ArchiveSource, CancellationToken, ClientConfig, ConversionOptions,
    ConversionRequest, ConversionResult, Dimensions, HttpTransport, ImgConvertError, OutputFormat,
    RawFile, RendererState, ResultRenderer, Selection, Transport,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, png_bytes(width, height)).expect("write png");
    p
}

/// Byte-level body matcher; multipart bodies carry binary image data, so
/// they are not valid UTF-8.
fn body_contains(needle: &'static str) -> impl Fn(&Request) -> bool + Send + Sync {
    move |req: &Request| {
        req.body
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }
}

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .base_url(server.uri())
        .request_timeout_secs(5)
        .download_timeout_secs(5)
        .build()
        .expect("config")
}

async fn selection_of(dir: &Path, files: &[(&str, u32, u32)], config: &ClientConfig) -> Selection {
    let raw = files
        .iter()
        .map(|(n, w, h)| RawFile::from_path(write_png(dir, n, *w, *h)).expect("raw file"))
        .collect();
    let mut selection = Selection::new();
    selection.ingest(raw, config).await.expect("ingest");
    selection
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_conversion_and_download() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_contains("filename=\"photo.png\""))
        .and(body_contains("WEBP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "batch": false,
            "filename": "photo.png",
            "original_size": [80, 40],
            "output_dimensions": [40, 20],
            "compression_ratio": "55.0%",
            "output_filename": "photo.webp",
            "download_url": "/download/photo.webp",
            "is_ico": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/photo.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFxxxxWEBP".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    let selection = selection_of(dir.path(), &[("photo.png", 80, 40)], &config).await;
    assert_eq!(
        selection.reference_dimensions(),
        Some(Dimensions::new(80, 40))
    );

    let mut options = ConversionOptions::default();
    options.set_format(OutputFormat::Webp);
    options.set_width(Some(40), selection.reference_dimensions());
    assert_eq!(options.height, Some(20));

    let request = ConversionRequest::build(&options, &selection, &config).unwrap();
    assert_eq!(request.field("height"), Some("20"));

    let transport = HttpTransport::new(config.clone()).unwrap();
    let mut renderer = ResultRenderer::new(config.clone());
    renderer
        .submit(&transport, request, &CancellationToken::new())
        .await;

    let view = renderer.view();
    assert!(view.lines.iter().any(|l| l == "Converted size: 40×20 px"));

    let out_dir = dir.path().join("out");
    let saved = download::perform(&view.actions[0], transport.http(), &config, &out_dir)
        .await
        .unwrap()
        .expect("download action");
    assert_eq!(saved, out_dir.join("photo.webp"));
    assert_eq!(std::fs::read(saved).unwrap(), b"RIFFxxxxWEBP");
}

#[tokio::test]
async fn batch_conversion_downloads_zip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_contains("filename=\"a.png\""))
        .and(body_contains("filename=\"b.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "batch": true,
            "zip_filename": "converted_images.zip",
            "download_url": "/download/converted_images.zip",
            "results": [
                {"filename": "a.png", "success": true, "output_filename": "a.jpg"},
                {"filename": "b.png", "success": false, "error": "cannot identify image"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/download/converted_images.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    let selection =
        selection_of(dir.path(), &[("a.png", 10, 10), ("b.png", 20, 10)], &config).await;

    let options = ConversionOptions::builder().batch(true).build();
    let request = ConversionRequest::build(&options, &selection, &config).unwrap();
    assert_eq!(request.file_count(), 2);
    assert_eq!(request.field("batch"), Some("true"));

    let transport = HttpTransport::new(config.clone()).unwrap();
    let result = transport
        .send(request, &CancellationToken::new())
        .await
        .unwrap();
    match &result {
        ConversionResult::Batch {
            results, archive, ..
        } => {
            assert_eq!(results.len(), 2);
            assert!(matches!(archive, ArchiveSource::Url { .. }));
        }
        other => panic!("expected batch, got {other:?}"),
    }

    let saved = download::save_from_url(
        transport.http(),
        &config,
        "/download/converted_images.zip",
        "converted_images.zip",
        dir.path(),
    )
    .await
    .unwrap();
    assert_eq!(std::fs::read(saved).unwrap(), b"PK\x03\x04");
}

#[tokio::test]
async fn server_rejection_keeps_selection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"success": false, "error": "bad format"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    let selection = selection_of(dir.path(), &[("a.png", 4, 4)], &config).await;

    let request =
        ConversionRequest::build(&ConversionOptions::default(), &selection, &config).unwrap();
    let transport = HttpTransport::new(config.clone()).unwrap();
    let mut renderer = ResultRenderer::new(config.clone());
    renderer
        .submit(&transport, request, &CancellationToken::new())
        .await;

    assert_eq!(
        renderer.state(),
        &RendererState::ShowingError {
            message: "bad format".into()
        }
    );
    assert_eq!(renderer.view().actions, vec![Action::Retry]);
    assert_eq!(selection.count(), 1);
}

#[tokio::test]
async fn html_error_page_shows_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let request = ConversionRequest::from_files(
        &ConversionOptions::default(),
        vec![RawFile::from_bytes("a.png", "image/png", png_bytes(2, 2))],
        &config,
    )
    .unwrap();
    let transport = HttpTransport::new(config.clone()).unwrap();
    let mut renderer = ResultRenderer::new(config);
    renderer
        .submit(&transport, request, &CancellationToken::new())
        .await;

    assert_eq!(
        renderer.state(),
        &RendererState::ShowingError {
            message: "Conversion failed (HTTP 502)".into()
        }
    );
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let request = ConversionRequest::from_files(
        &ConversionOptions::default(),
        vec![RawFile::from_bytes("a.png", "image/png", png_bytes(2, 2))],
        &config,
    )
    .unwrap();
    let transport = HttpTransport::new(config).unwrap();
    let err = transport
        .send(request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ImgConvertError::RequestTimeout { secs: 1, .. }));
}

#[tokio::test]
async fn in_flight_upload_can_be_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let request = ConversionRequest::from_files(
        &ConversionOptions::default(),
        vec![RawFile::from_bytes("a.png", "image/png", png_bytes(2, 2))],
        &config,
    )
    .unwrap();
    let transport = HttpTransport::new(config).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = transport.send(request, &cancel).await.unwrap_err();
    assert!(matches!(err, ImgConvertError::Cancelled { .. }));
}

#[tokio::test]
async fn missing_download_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    let err = download::save_from_url(
        &reqwest::Client::new(),
        &config,
        "/download/gone.png",
        "gone.png",
        dir.path(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ImgConvertError::DownloadFailed { .. }));
    assert!(!dir.path().join("gone.png").exists());
}

#[tokio::test]
async fn oversized_file_rejects_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let small = write_png(dir.path(), "small.png", 2, 2);
    let big = dir.path().join("big.png");
    std::fs::write(&big, vec![0u8; 4096]).unwrap();

    let config = ClientConfig::builder().max_file_bytes(1024).build().unwrap();
    let mut selection = Selection::new();
    let err = selection
        .ingest(
            vec![
                RawFile::from_path(&small).unwrap(),
                RawFile::from_path(&big).unwrap(),
            ],
            &config,
        )
        .await
        .unwrap_err();

    match err {
        ImgConvertError::FilesTooLarge { names, .. } => assert_eq!(names, vec!["big.png"]),
        other => panic!("expected FilesTooLarge, got {other:?}"),
    }
    assert!(selection.is_empty());
}

#[tokio::test]
async fn undecodable_image_is_still_admitted() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.png");
    std::fs::write(&broken, b"not really a png").unwrap();

    let mut selection = Selection::new();
    selection
        .ingest(
            vec![RawFile::from_path(&broken).unwrap()],
            &ClientConfig::default(),
        )
        .await
        .unwrap();

    let record = &selection.records()[0];
    assert_eq!(record.dimensions, None);
    assert!(!record.probe_errors.is_empty());
}
