//! User settings and partial updates

use serde::{Deserialize, Serialize};

use super::SessionType;
use crate::utils::time::minutes_to_seconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

/// Timer durations, cycle threshold and preferences
/// Longest accepted session, one day
pub const MAX_DURATION_MIN: u64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub focus_min: u64,
    pub short_break_min: u64,
    pub long_break_min: u64,
    pub cycles_until_long_break: u32,
    pub sound: bool,
    pub vibration: bool,
    pub theme: Theme,
    pub locale: Locale,
}

impl Settings {
    /// Configured length of a session of the given type, in seconds
    pub fn total_duration_for(&self, session_type: SessionType) -> u64 {
        let minutes = match session_type {
            SessionType::Focus => self.focus_min,
            SessionType::ShortBreak => self.short_break_min,
            SessionType::LongBreak => self.long_break_min,
        };
        minutes_to_seconds(minutes)
    }

    /// Durations must lie within `1..=MAX_DURATION_MIN` and the cycle
    /// threshold must be at least 1
    pub fn validate(&self) -> Result<(), String> {
        for (name, minutes) in [
            ("focusMin", self.focus_min),
            ("shortBreakMin", self.short_break_min),
            ("longBreakMin", self.long_break_min),
        ] {
            if minutes == 0 {
                return Err(format!("{} must be at least 1", name));
            }
            if minutes > MAX_DURATION_MIN {
                return Err(format!("{} must be at most {}", name, MAX_DURATION_MIN));
            }
        }
        if self.cycles_until_long_break == 0 {
            return Err("cyclesUntilLongBreak must be at least 1".to_string());
        }
        Ok(())
    }

    /// Merge a partial update into a copy of these settings
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            focus_min: patch.focus_min.unwrap_or(self.focus_min),
            short_break_min: patch.short_break_min.unwrap_or(self.short_break_min),
            long_break_min: patch.long_break_min.unwrap_or(self.long_break_min),
            cycles_until_long_break: patch
                .cycles_until_long_break
                .unwrap_or(self.cycles_until_long_break),
            sound: patch.sound.unwrap_or(self.sound),
            vibration: patch.vibration.unwrap_or(self.vibration),
            theme: patch.theme.unwrap_or(self.theme),
            locale: patch.locale.unwrap_or(self.locale),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_min: 25,
            short_break_min: 5,
            long_break_min: 15,
            cycles_until_long_break: 4,
            sound: true,
            vibration: true,
            theme: Theme::System,
            locale: Locale::PtBr,
        }
    }
}

/// Partial settings update; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub focus_min: Option<u64>,
    pub short_break_min: Option<u64>,
    pub long_break_min: Option<u64>,
    pub cycles_until_long_break: Option<u32>,
    pub sound: Option<bool>,
    pub vibration: Option<bool>,
    pub theme: Option<Theme>,
    pub locale: Option<Locale>,
}
