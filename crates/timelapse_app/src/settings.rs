use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timelapse_core::{ProcessingOptions, Quality, SpeedMultiplier};
use timelapse_engine::{AtomicFileWriter, PersistError, DEFAULT_ENDPOINT};
use timelapse_logging::{tl_info, tl_warn};

const SETTINGS_FILENAME: &str = ".timelapse_settings.ron";

/// What is remembered between runs. Every field is optional so older or
/// hand-edited files still load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedSettings {
    pub endpoint: Option<String>,
    pub speed: Option<u32>,
    pub quality: Option<String>,
    pub remove_audio: Option<bool>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Overrides taken from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub endpoint: Option<&'a str>,
    pub speed: Option<SpeedMultiplier>,
    pub quality: Option<Quality>,
    pub keep_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub endpoint: String,
    pub options: ProcessingOptions,
}

impl SavedSettings {
    pub fn remember(resolved: &Resolved) -> Self {
        Self {
            endpoint: Some(resolved.endpoint.clone()),
            speed: Some(resolved.options.speed.get()),
            quality: Some(resolved.options.quality.as_str().to_string()),
            remove_audio: Some(resolved.options.remove_audio),
        }
    }
}

/// Missing or unreadable files yield defaults.
pub fn load_settings(dir: &Path) -> SavedSettings {
    let path = dir.join(SETTINGS_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return SavedSettings::default();
        }
        Err(err) => {
            tl_warn!("Failed to read settings from {:?}: {}", path, err);
            return SavedSettings::default();
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => {
            tl_info!("Loaded settings from {:?}", path);
            settings
        }
        Err(err) => {
            tl_warn!("Failed to parse settings from {:?}: {}", path, err);
            SavedSettings::default()
        }
    }
}

pub fn save_settings(dir: &Path, settings: &SavedSettings) -> Result<PathBuf, SettingsError> {
    let content = ron::ser::to_string_pretty(settings, ron::ser::PrettyConfig::new())?;
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    Ok(writer.write(SETTINGS_FILENAME, content.as_bytes())?)
}

/// Layers defaults, saved settings and overrides, lowest to highest.
pub fn resolve(saved: &SavedSettings, overrides: &Overrides<'_>) -> Resolved {
    let defaults = ProcessingOptions::default();

    let saved_speed = saved.speed.and_then(|speed| {
        SpeedMultiplier::new(i64::from(speed))
            .map_err(|err| tl_warn!("Ignoring saved speed: {}", err))
            .ok()
    });
    let saved_quality = saved.quality.as_deref().and_then(|quality| {
        quality
            .parse::<Quality>()
            .map_err(|err| tl_warn!("Ignoring saved quality: {}", err))
            .ok()
    });

    let remove_audio = if overrides.keep_audio {
        false
    } else {
        saved.remove_audio.unwrap_or(defaults.remove_audio)
    };

    Resolved {
        endpoint: overrides
            .endpoint
            .map(str::to_string)
            .or_else(|| saved.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        options: ProcessingOptions {
            speed: overrides
                .speed
                .or(saved_speed)
                .unwrap_or(defaults.speed),
            quality: overrides
                .quality
                .or(saved_quality)
                .unwrap_or(defaults.quality),
            remove_audio,
        },
    }
}
