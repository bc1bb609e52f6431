use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use timelapse_logging::{tl_debug, tl_info};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use crate::{FailureKind, UploadError, UploadForm, UploadOutcome};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/upload";

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Covers upload plus server-side processing, which the service caps at 300 s.
    pub request_timeout: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(330),
        }
    }
}

#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    /// Sends the form and waits for the processing result.
    ///
    /// Resolves to `FailureKind::Cancelled` as soon as `cancel` fires; the
    /// in-flight request is dropped.
    async fn upload(
        &self,
        form: &UploadForm,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, UploadError>;
}

#[derive(Debug, Deserialize)]
struct SuccessBody {
    #[serde(alias = "downloadUrl")]
    download_url: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: UploadSettings,
}

impl ReqwestUploader {
    pub fn new(settings: UploadSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    fn build_client(&self) -> Result<reqwest::Client, UploadError> {
        build_client(self.settings.connect_timeout, self.settings.request_timeout)
    }

    async fn build_form(&self, form: &UploadForm) -> Result<Form, UploadError> {
        let unreadable = |err: std::io::Error| {
            UploadError::new(
                FailureKind::FileUnreadable,
                format!("{}: {err}", form.video_path.display()),
            )
        };
        let file = tokio::fs::File::open(&form.video_path)
            .await
            .map_err(unreadable)?;
        let len = file.metadata().await.map_err(unreadable)?.len();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let video = Part::stream_with_length(body, len)
            .file_name(form.file_name.clone())
            .mime_str(&form.mime_type)
            .map_err(|err| UploadError::new(FailureKind::InvalidRequest, err.to_string()))?;

        Ok(Form::new()
            .part("video", video)
            .text("speed", form.speed.to_string())
            .text("quality", form.quality.clone())
            .text("removeAudio", form.remove_audio.to_string()))
    }

    async fn send(&self, form: &UploadForm) -> Result<UploadOutcome, UploadError> {
        let endpoint = parse_endpoint(&self.settings.endpoint)?;
        let client = self.build_client()?;
        let multipart = self.build_form(form).await?;

        tl_info!(
            "Uploading {} to {} (speed={} quality={} removeAudio={})",
            form.file_name,
            endpoint,
            form.speed,
            form.quality,
            form.remove_audio
        );
        let response = client
            .post(endpoint.clone())
            .multipart(multipart)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(UploadError::new(
                FailureKind::HttpStatus {
                    status: status.as_u16(),
                    server_message: parse_error_body(&body),
                },
                status.to_string(),
            ));
        }

        parse_success_body(&endpoint, &body)
    }
}

#[async_trait::async_trait]
impl Uploader for ReqwestUploader {
    async fn upload(
        &self,
        form: &UploadForm,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, UploadError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                Err(UploadError::new(FailureKind::Cancelled, "upload cancelled"))
            }
            result = self.send(form) => result,
        }
    }
}

pub(crate) fn build_client(
    connect_timeout: Duration,
    request_timeout: Duration,
) -> Result<reqwest::Client, UploadError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(|err| UploadError::new(FailureKind::Network, err.to_string()))
}

pub(crate) fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url, UploadError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|err| UploadError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UploadError::new(
            FailureKind::InvalidEndpoint,
            format!("unsupported scheme {other}"),
        )),
    }
}

/// Extracts the download location from a success body, resolving relative urls.
fn parse_success_body(endpoint: &reqwest::Url, body: &[u8]) -> Result<UploadOutcome, UploadError> {
    let malformed = |message: String| UploadError::new(FailureKind::MalformedResponse, message);

    let parsed: SuccessBody =
        serde_json::from_slice(body).map_err(|err| malformed(err.to_string()))?;
    let raw = parsed.download_url.trim();
    if raw.is_empty() {
        return Err(malformed("empty download_url".to_string()));
    }
    let resolved = endpoint
        .join(raw)
        .map_err(|err| malformed(format!("download_url {raw:?}: {err}")))?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return Err(malformed(format!("download_url {raw:?} is not http(s)")));
    }

    Ok(UploadOutcome {
        download_url: resolved.to_string(),
        message: parsed.message,
    })
}

fn parse_error_body(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    if let Some(details) = parsed.details.as_deref() {
        tl_debug!("Service error details: {}", details);
    }
    parsed
        .error
        .map(|error| error.trim().to_string())
        .filter(|error| !error.is_empty())
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> UploadError {
    if err.is_timeout() {
        return UploadError::new(FailureKind::Timeout, err.to_string());
    }
    UploadError::new(FailureKind::Network, err.to_string())
}
