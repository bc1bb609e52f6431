//! Timelapse core: pure upload state machine and view-model helpers.
mod effect;
mod file;
mod msg;
mod options;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, UploadRequest};
pub use file::{
    FileRejection, FileRules, PreviewId, SelectedFile, Selection, VideoContainer,
    DEFAULT_MAX_VIDEO_BYTES,
};
pub use msg::Msg;
pub use options::{
    OptionsError, ProcessingOptions, Quality, SpeedMultiplier, DEFAULT_SPEED, MAX_SPEED,
    MIN_SPEED, SPEED_PRESETS,
};
pub use state::{
    AppState, DownloadState, FailureKind, Notice, NoticeLevel, Progress, ResourceError,
    ResultResource, SubmissionFailure, SubmissionId, SubmissionState, PROGRESS_CAP,
    PROGRESS_COMPLETE,
};
pub use update::update;
pub use view_model::{AppViewModel, PreviewView, Stage};
