use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::preview::PreviewInfo;

pub type SubmissionId = u64;
pub type PreviewKey = u64;

/// Multipart payload of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub video_path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub speed: u32,
    pub quality: String,
    pub remove_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Absolute download location, already resolved against the endpoint.
    pub download_url: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ProgressTick {
        submission: SubmissionId,
        increment: f32,
    },
    SubmissionCompleted {
        submission: SubmissionId,
        result: Result<UploadOutcome, UploadError>,
    },
    PreviewOpened {
        preview: PreviewKey,
        result: Result<PreviewInfo, String>,
    },
    DownloadCompleted {
        url: String,
        result: Result<PathBuf, String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    pub kind: FailureKind,
    pub message: String,
}

impl UploadError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    InvalidRequest,
    FileUnreadable,
    HttpStatus {
        status: u16,
        server_message: Option<String>,
    },
    MalformedResponse,
    Timeout,
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::FileUnreadable => write!(f, "file unreadable"),
            FailureKind::HttpStatus {
                status,
                server_message: Some(message),
            } => write!(f, "http status {status} ({message})"),
            FailureKind::HttpStatus {
                status,
                server_message: None,
            } => write!(f, "http status {status}"),
            FailureKind::MalformedResponse => write!(f, "malformed response"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
