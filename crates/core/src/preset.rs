//! Preset durations and long-break cadence.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::session::SessionType;

/// Which named preset a session runs under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    #[default]
    Short,
    Long,
}

impl PresetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

/// Phase durations (minutes) and long-break cadence for one preset.
///
/// Immutable except via an explicit settings update from the settings
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Preset {
    /// Work phase length in minutes
    #[validate(range(min = 1, max = 240))]
    pub work_duration: u32,
    /// Short break length in minutes
    #[validate(range(min = 1, max = 240))]
    pub short_break: u32,
    /// Long break length in minutes
    #[validate(range(min = 1, max = 240))]
    pub long_break: u32,
    /// Work sessions between long breaks
    #[validate(range(min = 1, max = 12))]
    pub sessions_before_long_break: u32,
}

impl Preset {
    /// Duration of the given phase, in seconds.
    pub fn duration_secs(&self, session_type: SessionType) -> u64 {
        let minutes = match session_type {
            SessionType::Work => self.work_duration,
            SessionType::ShortBreak => self.short_break,
            SessionType::LongBreak => self.long_break,
        };
        u64::from(minutes) * 60
    }
}

/// The two named presets every account carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PresetTable {
    #[validate(nested)]
    pub short: Preset,
    #[validate(nested)]
    pub long: Preset,
}

impl PresetTable {
    pub fn get(&self, kind: PresetKind) -> &Preset {
        match kind {
            PresetKind::Short => &self.short,
            PresetKind::Long => &self.long,
        }
    }

    /// Validate both presets, mapping validator output into our error type.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(e.to_string()))
    }
}

impl Default for PresetTable {
    fn default() -> Self {
        Self {
            short: Preset {
                work_duration: 25,
                short_break: 5,
                long_break: 15,
                sessions_before_long_break: 4,
            },
            long: Preset {
                work_duration: 50,
                short_break: 10,
                long_break: 30,
                sessions_before_long_break: 4,
            },
        }
    }
}
