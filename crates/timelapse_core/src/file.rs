use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Video containers accepted for upload, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoContainer {
    Mp4,
    M4v,
    QuickTime,
    Avi,
    Matroska,
    WebM,
    Wmv,
    Flv,
    Mpeg,
    ThreeGp,
}

impl VideoContainer {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        let container = match ext.as_str() {
            "mp4" => VideoContainer::Mp4,
            "m4v" => VideoContainer::M4v,
            "mov" | "qt" => VideoContainer::QuickTime,
            "avi" => VideoContainer::Avi,
            "mkv" => VideoContainer::Matroska,
            "webm" => VideoContainer::WebM,
            "wmv" => VideoContainer::Wmv,
            "flv" => VideoContainer::Flv,
            "mpg" | "mpeg" => VideoContainer::Mpeg,
            "3gp" => VideoContainer::ThreeGp,
            _ => return None,
        };
        Some(container)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type sent with the `video` multipart field.
    pub fn mime_type(self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "video/mp4",
            VideoContainer::M4v => "video/x-m4v",
            VideoContainer::QuickTime => "video/quicktime",
            VideoContainer::Avi => "video/x-msvideo",
            VideoContainer::Matroska => "video/x-matroska",
            VideoContainer::WebM => "video/webm",
            VideoContainer::Wmv => "video/x-ms-wmv",
            VideoContainer::Flv => "video/x-flv",
            VideoContainer::Mpeg => "video/mpeg",
            VideoContainer::ThreeGp => "video/3gpp",
        }
    }
}

/// A file chosen by the user. Only metadata is held; bytes are read at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            display_name,
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileRejection {
    #[error("{name} is empty")]
    Empty { name: String },
    #[error("{name} is {size} bytes, the limit is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },
    #[error("{name} is not a supported video file")]
    UnsupportedType { name: String },
}

/// Client-side acceptance rules applied before a file becomes the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRules {
    pub max_bytes: u64,
}

impl Default for FileRules {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_VIDEO_BYTES,
        }
    }
}

impl FileRules {
    pub fn check(&self, file: &SelectedFile) -> Result<VideoContainer, FileRejection> {
        let container = VideoContainer::from_path(&file.path).ok_or_else(|| {
            FileRejection::UnsupportedType {
                name: file.display_name.clone(),
            }
        })?;
        if file.size_bytes == 0 {
            return Err(FileRejection::Empty {
                name: file.display_name.clone(),
            });
        }
        if file.size_bytes > self.max_bytes {
            return Err(FileRejection::TooLarge {
                name: file.display_name.clone(),
                size: file.size_bytes,
                max: self.max_bytes,
            });
        }
        Ok(container)
    }
}

/// Handle of the local preview derived from a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewId(pub u64);

/// The selected file together with its preview. One cannot exist without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    file: SelectedFile,
    container: VideoContainer,
    preview: PreviewId,
    preview_summary: Option<String>,
}

impl Selection {
    pub(crate) fn new(file: SelectedFile, container: VideoContainer, preview: PreviewId) -> Self {
        Self {
            file,
            container,
            preview,
            preview_summary: None,
        }
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub fn container(&self) -> VideoContainer {
        self.container
    }

    pub fn preview(&self) -> PreviewId {
        self.preview
    }

    pub fn preview_summary(&self) -> Option<&str> {
        self.preview_summary.as_deref()
    }

    pub(crate) fn set_preview_summary(&mut self, summary: String) {
        self.preview_summary = Some(summary);
    }
}
