use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CELEBRATION_MS: u64 = 2_000;
pub const DEFAULT_SHAKE_MS: u64 = 500;
pub const DEFAULT_QUIZ_ADVANCE_MS: u64 = 2_500;

/// Longest delay accepted for any deferred effect.
pub const MAX_DELAY_MS: u64 = 60_000;

/// Timing of the lab's deferred effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LabSettings {
    celebration_ms: u64,
    shake_ms: u64,
    quiz_advance_ms: u64,
}

/// Unvalidated settings, as read from a config file or the environment.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabSettingsDraft {
    pub celebration_ms: Option<u64>,
    pub shake_ms: Option<u64>,
    pub quiz_advance_ms: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("{name} must be between 1 and 60000 ms, got {value}")]
    DelayOutOfRange { name: &'static str, value: u64 },
}

impl LabSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `other` on top of this draft; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: LabSettingsDraft) -> Self {
        Self {
            celebration_ms: other.celebration_ms.or(self.celebration_ms),
            shake_ms: other.shake_ms.or(self.shake_ms),
            quiz_advance_ms: other.quiz_advance_ms.or(self.quiz_advance_ms),
        }
    }

    /// Fill missing fields with defaults and check ranges.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::DelayOutOfRange` for a zero or overlong delay.
    pub fn validate(self) -> Result<LabSettings, SettingsError> {
        Ok(LabSettings {
            celebration_ms: check_delay(
                "celebration_ms",
                self.celebration_ms.unwrap_or(DEFAULT_CELEBRATION_MS),
            )?,
            shake_ms: check_delay("shake_ms", self.shake_ms.unwrap_or(DEFAULT_SHAKE_MS))?,
            quiz_advance_ms: check_delay(
                "quiz_advance_ms",
                self.quiz_advance_ms.unwrap_or(DEFAULT_QUIZ_ADVANCE_MS),
            )?,
        })
    }
}

impl LabSettings {
    #[must_use]
    pub fn celebration_delay(&self) -> Duration {
        millis(self.celebration_ms)
    }

    #[must_use]
    pub fn shake_delay(&self) -> Duration {
        millis(self.shake_ms)
    }

    /// How long success feedback stays visible before the quiz moves on.
    #[must_use]
    pub fn quiz_advance_delay(&self) -> Duration {
        millis(self.quiz_advance_ms)
    }
}

impl Default for LabSettings {
    fn default() -> Self {
        Self {
            celebration_ms: DEFAULT_CELEBRATION_MS,
            shake_ms: DEFAULT_SHAKE_MS,
            quiz_advance_ms: DEFAULT_QUIZ_ADVANCE_MS,
        }
    }
}

fn check_delay(name: &'static str, value: u64) -> Result<u64, SettingsError> {
    if value == 0 || value > MAX_DELAY_MS {
        return Err(SettingsError::DelayOutOfRange { name, value });
    }
    Ok(value)
}

fn millis(value: u64) -> Duration {
    // Bounded by MAX_DELAY_MS, so the conversion cannot overflow.
    Duration::milliseconds(i64::try_from(value).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_uses_defaults() {
        let settings = LabSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, LabSettings::default());
        assert_eq!(settings.quiz_advance_delay(), Duration::milliseconds(2_500));
        assert_eq!(settings.celebration_delay(), Duration::milliseconds(2_000));
        assert_eq!(settings.shake_delay(), Duration::milliseconds(500));
    }

    #[test]
    fn zero_and_overlong_delays_are_rejected() {
        let zero = LabSettingsDraft {
            shake_ms: Some(0),
            ..LabSettingsDraft::default()
        };
        assert_eq!(
            zero.validate().unwrap_err(),
            SettingsError::DelayOutOfRange {
                name: "shake_ms",
                value: 0
            }
        );

        let long = LabSettingsDraft {
            quiz_advance_ms: Some(MAX_DELAY_MS + 1),
            ..LabSettingsDraft::default()
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn merge_prefers_overlay_fields() {
        let file = LabSettingsDraft {
            celebration_ms: Some(100),
            shake_ms: Some(200),
            quiz_advance_ms: None,
        };
        let env = LabSettingsDraft {
            shake_ms: Some(50),
            ..LabSettingsDraft::default()
        };
        let merged = file.merge(env);
        assert_eq!(merged.celebration_ms, Some(100));
        assert_eq!(merged.shake_ms, Some(50));
        assert_eq!(merged.quiz_advance_ms, None);
    }
}
