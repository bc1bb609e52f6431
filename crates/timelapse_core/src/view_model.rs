use crate::{DownloadState, Notice, PreviewId, Quality};

/// Stage of the form as the user sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Selecting,
    Ready,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewView {
    pub id: PreviewId,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub stage: Stage,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub preview: Option<PreviewView>,
    pub speed: u32,
    pub quality: Quality,
    pub remove_audio: bool,
    /// The progress bar is only shown while submitting.
    pub show_progress: bool,
    /// Percent in `[0, 100]`; exactly 100 only once succeeded.
    pub progress: f32,
    pub result_url: Option<String>,
    pub download: Option<DownloadState>,
    pub notice: Option<Notice>,
    pub can_submit: bool,
}
