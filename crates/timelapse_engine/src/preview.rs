use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use timelapse_logging::{tl_debug, tl_warn};

use crate::PreviewKey;

const SIGNATURE_LEN: usize = 12;

/// Container family recognized from the first bytes of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerSignature {
    /// `ftyp` box: MP4, QuickTime, M4V, 3GP.
    IsoMedia,
    Avi,
    /// EBML header: Matroska and WebM.
    Matroska,
    Asf,
    Flv,
    MpegProgram,
}

impl ContainerSignature {
    pub fn sniff(head: &[u8]) -> Option<Self> {
        if head.len() >= 8 && &head[4..8] == b"ftyp" {
            return Some(Self::IsoMedia);
        }
        if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"AVI " {
            return Some(Self::Avi);
        }
        if head.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Some(Self::Matroska);
        }
        if head.starts_with(&[0x30, 0x26, 0xB2, 0x75]) {
            return Some(Self::Asf);
        }
        if head.starts_with(b"FLV") {
            return Some(Self::Flv);
        }
        if head.starts_with(&[0x00, 0x00, 0x01, 0xBA]) {
            return Some(Self::MpegProgram);
        }
        None
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::IsoMedia => "MP4/QuickTime",
            Self::Avi => "AVI",
            Self::Matroska => "Matroska/WebM",
            Self::Asf => "Windows Media",
            Self::Flv => "Flash Video",
            Self::MpegProgram => "MPEG program stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub signature: Option<ContainerSignature>,
}

impl PreviewInfo {
    /// One-line description for the terminal preview.
    pub fn summary(&self) -> String {
        let kind = self
            .signature
            .map(ContainerSignature::label)
            .unwrap_or("unrecognized container");
        format!("{kind}, {}", format_size(self.size_bytes))
    }
}

struct OpenPreview {
    info: PreviewInfo,
    // Held so the previewed bytes stay reachable until release.
    _file: File,
}

/// Open local preview handles, keyed by the id the state machine allocated.
#[derive(Default)]
pub struct PreviewRegistry {
    open: Mutex<HashMap<PreviewKey, OpenPreview>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` and registers it under `key`, replacing any previous handle.
    pub fn open(&self, key: PreviewKey, path: &Path) -> io::Result<PreviewInfo> {
        let mut file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        let mut head = Vec::with_capacity(SIGNATURE_LEN);
        (&mut file).take(SIGNATURE_LEN as u64).read_to_end(&mut head)?;

        let info = PreviewInfo {
            path: path.to_path_buf(),
            size_bytes,
            signature: ContainerSignature::sniff(&head),
        };
        if info.signature.is_none() {
            tl_warn!("No known video signature in {:?}", path);
        }

        let mut open = self.lock();
        if open
            .insert(
                key,
                OpenPreview {
                    info: info.clone(),
                    _file: file,
                },
            )
            .is_some()
        {
            tl_debug!("Preview {} reopened", key);
        }
        Ok(info)
    }

    /// Closes the handle. Returns `false` when `key` was not open.
    pub fn release(&self, key: PreviewKey) -> bool {
        self.lock().remove(&key).is_some()
    }

    pub fn get(&self, key: PreviewKey) -> Option<PreviewInfo> {
        self.lock().get(&key).map(|preview| preview.info.clone())
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PreviewKey, OpenPreview>> {
        // A poisoned map is still structurally valid.
        self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
