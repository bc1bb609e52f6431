//! Timelapse engine: upload, progress simulation and artifact IO.
mod download;
mod engine;
mod filename;
mod health;
mod persist;
mod preview;
mod ticker;
mod types;
mod upload;

pub use download::{download_result, DownloadError, DownloadSettings};
pub use engine::{EngineConfig, EngineError, EngineHandle};
pub use filename::download_filename;
pub use health::{check_health, health_url, ServiceHealth};
pub use persist::{ensure_output_dir, AtomicFileWriter, PendingFile, PersistError};
pub use preview::{format_size, ContainerSignature, PreviewInfo, PreviewRegistry};
pub use ticker::{spawn_ticker, ChannelEventSink, EventSink, TickerGuard, TickerSettings};
pub use types::{
    EngineEvent, FailureKind, PreviewKey, SubmissionId, UploadError, UploadForm, UploadOutcome,
};
pub use upload::{ReqwestUploader, UploadSettings, Uploader, DEFAULT_ENDPOINT};
