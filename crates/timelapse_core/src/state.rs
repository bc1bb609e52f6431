use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use timelapse_logging::{tl_debug, tl_info, tl_warn};

use crate::file::{FileRules, PreviewId, SelectedFile, Selection};
use crate::options::{OptionsError, ProcessingOptions, Quality, SpeedMultiplier};
use crate::view_model::{AppViewModel, PreviewView, Stage};
use crate::{Effect, UploadRequest};

pub type SubmissionId = u64;

/// Simulated progress never passes this value while a submission is outstanding.
pub const PROGRESS_CAP: f32 = 90.0;
pub const PROGRESS_COMPLETE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Progress(f32);

impl Progress {
    pub fn value(self) -> f32 {
        self.0
    }

    pub fn is_capped(self) -> bool {
        self.0 >= PROGRESS_CAP
    }

    fn advanced(self, increment: f32) -> Self {
        if !increment.is_finite() || increment <= 0.0 {
            return self;
        }
        Self((self.0 + increment).min(PROGRESS_CAP))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("invalid result url {url:?}: {reason}")]
    Invalid { url: String, reason: String },
    #[error("result url {0:?} is not http or https")]
    UnsupportedScheme(String),
}

/// Location of the processed artifact returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultResource(url::Url);

impl ResultResource {
    pub fn parse(raw: &str) -> Result<Self, ResourceError> {
        let url = url::Url::parse(raw.trim()).map_err(|err| ResourceError::Invalid {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;
        Self::from_url(url)
    }

    pub fn from_url(url: url::Url) -> Result<Self, ResourceError> {
        match url.scheme() {
            "http" | "https" => Ok(Self(url)),
            _ => Err(ResourceError::UnsupportedScheme(url.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &url::Url {
        &self.0
    }
}

impl fmt::Display for ResultResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The service could not be reached at all.
    Network,
    Timeout,
    /// The service answered with a non-success status.
    Server { status: u16, message: Option<String> },
    /// Success status but the body was not the expected JSON.
    MalformedResponse,
    FileUnreadable,
    InvalidEndpoint,
    InvalidRequest,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl SubmissionFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Text shown to the user for this failure.
    pub fn notice_text(&self) -> String {
        match &self.kind {
            FailureKind::Network => {
                "Could not reach the processing service. Check that it is running and try again."
                    .to_string()
            }
            FailureKind::Timeout => {
                "The processing service did not answer in time. Try again or pick a lower quality."
                    .to_string()
            }
            FailureKind::Server {
                status,
                message: Some(message),
            } => format!("The processing service reported an error ({status}): {message}"),
            FailureKind::Server {
                status,
                message: None,
            } => format!("The processing service reported an error ({status})."),
            FailureKind::MalformedResponse => {
                "The processing service returned an unexpected response.".to_string()
            }
            FailureKind::FileUnreadable => {
                format!("The selected file could not be read: {}", self.detail)
            }
            FailureKind::InvalidEndpoint => {
                format!("The processing endpoint is not usable: {}", self.detail)
            }
            FailureKind::InvalidRequest => {
                format!("The upload could not be prepared: {}", self.detail)
            }
            FailureKind::Cancelled => "Processing was cancelled.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DownloadState {
    #[default]
    NotRequested,
    InProgress,
    Saved(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight {
        submission: SubmissionId,
        progress: Progress,
    },
    Succeeded {
        submission: SubmissionId,
        result: ResultResource,
        download: DownloadState,
    },
    Failed {
        submission: SubmissionId,
        failure: SubmissionFailure,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    options: ProcessingOptions,
    file_rules: FileRules,
    selection: Option<Selection>,
    selecting: bool,
    submission: SubmissionState,
    notice: Option<Notice>,
    last_submission: SubmissionId,
    last_preview: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: ProcessingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_file_rules(mut self, rules: FileRules) -> Self {
        self.file_rules = rules;
        self
    }

    pub fn options(&self) -> ProcessingOptions {
        self.options
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.submission, SubmissionState::InFlight { .. })
    }

    pub fn view(&self) -> AppViewModel {
        let stage = self.stage();
        let (progress, result_url, download) = match &self.submission {
            SubmissionState::InFlight { progress, .. } => (progress.value(), None, None),
            SubmissionState::Succeeded {
                result, download, ..
            } => (
                PROGRESS_COMPLETE,
                Some(result.as_str().to_string()),
                Some(download.clone()),
            ),
            SubmissionState::Idle | SubmissionState::Failed { .. } => (0.0, None, None),
        };

        AppViewModel {
            stage,
            file_name: self
                .selection
                .as_ref()
                .map(|selection| selection.file().display_name.clone()),
            file_size: self
                .selection
                .as_ref()
                .map(|selection| selection.file().size_bytes),
            preview: self.selection.as_ref().map(|selection| PreviewView {
                id: selection.preview(),
                summary: selection.preview_summary().map(ToOwned::to_owned),
            }),
            speed: self.options.speed.get(),
            quality: self.options.quality,
            remove_audio: self.options.remove_audio,
            show_progress: stage == Stage::Submitting,
            progress,
            result_url,
            download,
            notice: self.notice.clone(),
            can_submit: self.selection.is_some() && !self.is_submitting(),
        }
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn stage(&self) -> Stage {
        if self.selecting {
            return Stage::Selecting;
        }
        match &self.submission {
            SubmissionState::InFlight { .. } => Stage::Submitting,
            SubmissionState::Succeeded { .. } => Stage::Succeeded,
            SubmissionState::Failed { .. } => Stage::Failed,
            SubmissionState::Idle if self.selection.is_some() => Stage::Ready,
            SubmissionState::Idle => Stage::Idle,
        }
    }

    pub(crate) fn begin_selecting(&mut self) {
        self.selecting = true;
        self.dirty = true;
    }

    pub(crate) fn cancel_selecting(&mut self) {
        if self.selecting {
            self.selecting = false;
            self.dirty = true;
        }
    }

    pub(crate) fn select_file(&mut self, file: SelectedFile) -> Vec<Effect> {
        self.cancel_selecting();
        let container = match self.file_rules.check(&file) {
            Ok(container) => container,
            Err(rejection) => {
                tl_info!("Rejected selection {:?}: {}", file.path, rejection);
                self.notice = Some(Notice::error(rejection.to_string()));
                self.dirty = true;
                return Vec::new();
            }
        };

        let mut effects: Vec<Effect> = self.abandon_download().into_iter().collect();
        if let Some(previous) = self.selection.take() {
            effects.push(Effect::ReleasePreview {
                preview: previous.preview(),
            });
        }
        self.last_preview += 1;
        let preview = PreviewId(self.last_preview);
        effects.push(Effect::OpenPreview {
            preview,
            path: file.path.clone(),
        });
        tl_debug!(
            "Selected {:?} ({} bytes) as preview {:?}",
            file.path,
            file.size_bytes,
            preview
        );
        self.selection = Some(Selection::new(file, container, preview));
        self.submission = SubmissionState::Idle;
        self.notice = None;
        self.dirty = true;
        effects
    }

    pub(crate) fn attach_preview_summary(&mut self, preview: PreviewId, summary: String) {
        match self.selection.as_mut() {
            Some(selection) if selection.preview() == preview => {
                selection.set_preview_summary(summary);
                self.dirty = true;
            }
            _ => tl_debug!("Ignoring summary for released preview {:?}", preview),
        }
    }

    pub(crate) fn set_speed(&mut self, speed: Result<SpeedMultiplier, OptionsError>) {
        match speed {
            Ok(speed) => {
                self.options.speed = speed;
                self.clear_error_notice();
            }
            Err(err) => {
                tl_info!("Rejected speed: {}", err);
                self.notice = Some(Notice::error(err.to_string()));
            }
        }
        self.dirty = true;
    }

    pub(crate) fn set_quality(&mut self, quality: Quality) {
        self.options.quality = quality;
        self.dirty = true;
    }

    pub(crate) fn set_remove_audio(&mut self, remove_audio: bool) {
        self.options.remove_audio = remove_audio;
        self.dirty = true;
    }

    /// Moves to `InFlight`. Returns `None` when nothing is selected.
    pub(crate) fn start_submission(&mut self) -> Option<(SubmissionId, UploadRequest)> {
        let selection = self.selection.as_ref()?;
        // A picker left open must not mask the in-flight stage.
        self.selecting = false;
        let request = UploadRequest {
            path: selection.file().path.clone(),
            file_name: selection.file().display_name.clone(),
            mime_type: selection.container().mime_type(),
            options: self.options,
        };
        self.last_submission += 1;
        let submission = self.last_submission;
        self.submission = SubmissionState::InFlight {
            submission,
            progress: Progress::default(),
        };
        self.notice = None;
        self.dirty = true;
        Some((submission, request))
    }

    /// Applies a simulator tick. Returns `true` when progress just reached the cap.
    pub(crate) fn apply_tick(&mut self, tick_for: SubmissionId, increment: f32) -> bool {
        let SubmissionState::InFlight {
            submission,
            progress,
        } = &mut self.submission
        else {
            return false;
        };
        if *submission != tick_for || progress.is_capped() {
            return false;
        }
        let next = progress.advanced(increment);
        if next != *progress {
            *progress = next;
            self.dirty = true;
        }
        next.is_capped()
    }

    /// Records the outcome of the current submission. Stale ids are ignored.
    pub(crate) fn complete_submission(
        &mut self,
        completed: SubmissionId,
        outcome: Result<ResultResource, SubmissionFailure>,
    ) -> bool {
        match self.submission {
            SubmissionState::InFlight { submission, .. } if submission == completed => {}
            _ => {
                tl_debug!("Ignoring stale completion for submission {}", completed);
                return false;
            }
        }

        self.submission = match outcome {
            Ok(result) => {
                tl_info!("Submission {} succeeded: {}", completed, result);
                self.notice = None;
                SubmissionState::Succeeded {
                    submission: completed,
                    result,
                    download: DownloadState::NotRequested,
                }
            }
            Err(failure) => {
                tl_warn!(
                    "Submission {} failed ({:?}): {}",
                    completed,
                    failure.kind,
                    failure.detail
                );
                self.notice = Some(Notice::error(failure.notice_text()));
                SubmissionState::Failed {
                    submission: completed,
                    failure,
                }
            }
        };
        self.dirty = true;
        true
    }

    pub(crate) fn reset(&mut self) -> Vec<Effect> {
        let mut effects: Vec<Effect> = self.abandon_download().into_iter().collect();
        if let SubmissionState::InFlight { submission, .. } = self.submission {
            tl_info!("Abandoning submission {} on reset", submission);
            effects.push(Effect::CancelSubmission { submission });
            effects.push(Effect::StopProgress { submission });
        }
        if let Some(selection) = self.selection.take() {
            effects.push(Effect::ReleasePreview {
                preview: selection.preview(),
            });
        }

        let changed = !effects.is_empty()
            || self.selecting
            || self.notice.is_some()
            || !matches!(self.submission, SubmissionState::Idle);
        self.submission = SubmissionState::Idle;
        self.selecting = false;
        self.notice = None;
        if changed {
            self.dirty = true;
        }
        effects
    }

    /// Cancel effect for a running download whose result is about to be dropped.
    pub(crate) fn abandon_download(&self) -> Option<Effect> {
        match &self.submission {
            SubmissionState::Succeeded {
                result,
                download: DownloadState::InProgress,
                ..
            } => Some(Effect::CancelDownload {
                url: result.clone(),
            }),
            _ => None,
        }
    }

    /// Marks the result as downloading. Returns the url to fetch, if any.
    pub(crate) fn begin_download(&mut self) -> Option<ResultResource> {
        let SubmissionState::Succeeded {
            result, download, ..
        } = &mut self.submission
        else {
            return None;
        };
        match download {
            DownloadState::NotRequested | DownloadState::Failed(_) => {
                *download = DownloadState::InProgress;
                self.dirty = true;
                Some(result.clone())
            }
            DownloadState::InProgress | DownloadState::Saved(_) => None,
        }
    }

    pub(crate) fn finish_download(
        &mut self,
        url: &ResultResource,
        outcome: Result<PathBuf, String>,
    ) {
        let SubmissionState::Succeeded {
            result, download, ..
        } = &mut self.submission
        else {
            return;
        };
        if result != url || *download != DownloadState::InProgress {
            tl_debug!("Ignoring download result for {}", url);
            return;
        }
        match outcome {
            Ok(path) => {
                self.notice = Some(Notice::info(format!("Saved to {}", path.display())));
                *download = DownloadState::Saved(path);
            }
            Err(message) => {
                self.notice = Some(Notice::error(format!("Download failed: {message}")));
                *download = DownloadState::Failed(message);
            }
        }
        self.dirty = true;
    }

    fn clear_error_notice(&mut self) {
        if matches!(&self.notice, Some(notice) if notice.level == NoticeLevel::Error) {
            self.notice = None;
        }
    }
}
