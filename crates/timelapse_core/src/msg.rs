use std::path::PathBuf;

use crate::{PreviewId, Quality, ResultResource, SelectedFile, SubmissionFailure, SubmissionId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked to choose a file.
    BrowseClicked,
    /// The picker returned. `None` when it was dismissed.
    FileSelected(Option<SelectedFile>),
    /// The preview for a selection has been opened.
    PreviewLoaded { preview: PreviewId, summary: String },
    SpeedPresetSelected(u32),
    /// Raw text of the custom speed field.
    CustomSpeedEntered(String),
    QualitySelected(Quality),
    RemoveAudioToggled(bool),
    SubmitClicked,
    /// Simulator tick carrying a random increment.
    ProgressTick {
        submission: SubmissionId,
        increment: f32,
    },
    /// Engine completion for an upload.
    SubmissionCompleted {
        submission: SubmissionId,
        outcome: Result<ResultResource, SubmissionFailure>,
    },
    ResetClicked,
    DownloadClicked,
    DownloadFinished {
        url: ResultResource,
        result: Result<PathBuf, String>,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
}
