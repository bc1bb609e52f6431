use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 100;
pub const DEFAULT_SPEED: u32 = 4;
pub const SPEED_PRESETS: [u32; 4] = [2, 4, 8, 16];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("speed must be a whole number, got {0:?}")]
    NotAnInteger(String),
    #[error("speed must be at least {MIN_SPEED}x, got {0}")]
    TooSlow(i64),
    #[error("speed must be at most {MAX_SPEED}x, got {0}")]
    TooFast(i64),
    #[error("unknown quality {0:?}, expected low, medium or high")]
    UnknownQuality(String),
}

/// Playback speed-up factor. Always within `MIN_SPEED..=MAX_SPEED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeedMultiplier(u32);

impl SpeedMultiplier {
    pub fn new(value: i64) -> Result<Self, OptionsError> {
        if value < i64::from(MIN_SPEED) {
            return Err(OptionsError::TooSlow(value));
        }
        if value > i64::from(MAX_SPEED) {
            return Err(OptionsError::TooFast(value));
        }
        // Range checked above.
        Ok(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_preset(self) -> bool {
        SPEED_PRESETS.contains(&self.0)
    }
}

impl Default for SpeedMultiplier {
    fn default() -> Self {
        Self(DEFAULT_SPEED)
    }
}

impl FromStr for SpeedMultiplier {
    type Err = OptionsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_suffix(['x', 'X'])
            .map(str::trim_end)
            .unwrap_or(trimmed);
        let value: i64 = trimmed
            .parse()
            .map_err(|_| OptionsError::NotAnInteger(raw.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for SpeedMultiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    /// Wire value sent in the `quality` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Low => "Low (Fast)",
            Quality::Medium => "Medium",
            Quality::High => "High (Slow)",
        }
    }
}

impl FromStr for Quality {
    type Err = OptionsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        Quality::ALL
            .into_iter()
            .find(|quality| quality.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OptionsError::UnknownQuality(raw.to_string()))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessingOptions {
    pub speed: SpeedMultiplier,
    pub quality: Quality,
    pub remove_audio: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            speed: SpeedMultiplier::default(),
            quality: Quality::default(),
            remove_audio: true,
        }
    }
}
