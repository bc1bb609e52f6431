use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use timelapse_logging::tl_info;
use tokio_util::sync::CancellationToken;

use crate::filename::download_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::upload::{build_client, map_reqwest_error};
use crate::FailureKind;

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub output_dir: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid download url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("download timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("download cancelled")]
    Cancelled,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Streams the processed artifact at `url` into the output directory.
pub async fn download_result(
    url: &str,
    settings: &DownloadSettings,
    cancel: &CancellationToken,
) -> Result<PathBuf, DownloadError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
        result = fetch_to_file(url, settings) => result,
    }
}

async fn fetch_to_file(url: &str, settings: &DownloadSettings) -> Result<PathBuf, DownloadError> {
    let parsed = reqwest::Url::parse(url).map_err(|err| DownloadError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    let client = build_client(settings.connect_timeout, settings.request_timeout)
        .map_err(|err| DownloadError::Network(err.message))?;

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(from_reqwest)?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus(status.as_u16()));
    }

    let writer = AtomicFileWriter::new(settings.output_dir.clone());
    let mut pending = writer.begin(&download_filename(url))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(from_reqwest)?;
        pending.write_chunk(&chunk)?;
    }
    let written = pending.bytes_written();
    let path = pending.commit()?;
    tl_info!("Downloaded {} ({} bytes) to {:?}", url, written, path);
    Ok(path)
}

fn from_reqwest(err: reqwest::Error) -> DownloadError {
    let mapped = map_reqwest_error(err);
    match mapped.kind {
        FailureKind::Timeout => DownloadError::Timeout,
        _ => DownloadError::Network(mapped.message),
    }
}
