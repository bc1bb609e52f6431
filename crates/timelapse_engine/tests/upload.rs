use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use timelapse_engine::{FailureKind, ReqwestUploader, UploadForm, UploadSettings, Uploader};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_clip(dir: &Path) -> UploadForm {
    let video_path = dir.join("clip.mp4");
    fs::write(&video_path, "fake-video-bytes").unwrap();
    UploadForm {
        video_path,
        file_name: "clip.mp4".to_string(),
        mime_type: "video/mp4".to_string(),
        speed: 8,
        quality: "high".to_string(),
        remove_audio: false,
    }
}

fn uploader_for(endpoint: String) -> ReqwestUploader {
    ReqwestUploader::new(UploadSettings {
        endpoint,
        ..UploadSettings::default()
    })
}

#[tokio::test]
async fn upload_sends_multipart_fields_and_returns_download_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains(r#"name="video"; filename="clip.mp4""#))
        .and(body_string_contains("fake-video-bytes"))
        .and(body_string_contains(r#"name="speed""#))
        .and(body_string_contains(r#"name="quality""#))
        .and(body_string_contains(r#"name="removeAudio""#))
        .and(body_string_contains("false"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "downloadUrl": "http://host/out.mp4" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for(format!("{}/upload", server.uri()));

    let outcome = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .expect("upload ok");
    assert_eq!(outcome.download_url, "http://host/out.mp4");
}

#[tokio::test]
async fn relative_download_url_resolves_against_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Video processed successfully",
            "download_url": "/static/videos/clip_timelapse.mp4"
        })))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for(format!("{}/upload", server.uri()));

    let outcome = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        outcome.download_url,
        format!("{}/static/videos/clip_timelapse.mp4", server.uri())
    );
    assert_eq!(outcome.message.as_deref(), Some("Video processed successfully"));
}

#[tokio::test]
async fn server_error_carries_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({ "error": "Processing failed" })),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for(format!("{}/upload", server.uri()));

    let err = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::HttpStatus {
            status: 500,
            server_message: Some("Processing failed".to_string()),
        }
    );
}

#[tokio::test]
async fn success_without_download_url_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>done</html>"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for(format!("{}/upload", server.uri()));

    let err = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedResponse);
}

#[tokio::test]
async fn unreachable_service_is_a_network_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for(format!("http://127.0.0.1:{port}/upload"));

    let err = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "download_url": "http://host/out.mp4" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = ReqwestUploader::new(UploadSettings {
        endpoint: format!("{}/upload", server.uri()),
        connect_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_millis(200),
    });

    let err = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for(format!("{}/upload", server.uri()));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = uploader.upload(&form, &cancel).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn missing_file_is_reported_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut form = write_clip(temp.path());
    form.video_path = temp.path().join("gone.mp4");
    let uploader = uploader_for(format!("{}/upload", server.uri()));

    let err = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::FileUnreadable);
}

#[tokio::test]
async fn invalid_endpoint_is_rejected() {
    let temp = TempDir::new().unwrap();
    let form = write_clip(temp.path());
    let uploader = uploader_for("localhost:5000".to_string());

    let err = uploader
        .upload(&form, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidEndpoint);
}
