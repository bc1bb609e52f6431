use std::path::PathBuf;

use crate::{PreviewId, ProcessingOptions, ResultResource, SubmissionId};

/// Everything the upload needs, captured at the moment of submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
    pub options: ProcessingOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenFilePicker,
    OpenPreview { preview: PreviewId, path: PathBuf },
    ReleasePreview { preview: PreviewId },
    StartProgress { submission: SubmissionId },
    StopProgress { submission: SubmissionId },
    Submit {
        submission: SubmissionId,
        request: UploadRequest,
    },
    /// Abandon an in-flight upload; its completion must not reach the state.
    CancelSubmission { submission: SubmissionId },
    DownloadResult { url: ResultResource },
    /// Stop a download whose result is no longer wanted.
    CancelDownload { url: ResultResource },
}
