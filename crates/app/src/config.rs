use std::fs;
use std::path::{Path, PathBuf};

use lab_core::model::{LabSettings, LabSettingsDraft, SettingsError};
use thiserror::Error;

pub const CONFIG_ENV: &str = "LAB_CONFIG";
pub const CELEBRATION_ENV: &str = "LAB_CELEBRATION_MS";
pub const SHAKE_ENV: &str = "LAB_SHAKE_MS";
pub const QUIZ_ADVANCE_ENV: &str = "LAB_QUIZ_ADVANCE_MS";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{name} must be a whole number of milliseconds, got {raw:?}")]
    InvalidEnv { name: &'static str, raw: String },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Resolve lab settings: defaults, then the TOML file, then environment overrides.
///
/// `env` looks up a variable by name; pass `|name| std::env::var(name).ok()`.
pub fn load_settings(
    file: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LabSettings, ConfigError> {
    let mut draft = LabSettingsDraft::new();
    if let Some(path) = file {
        draft = draft.merge(read_file(path)?);
    }
    draft = draft.merge(env_overrides(&env)?);
    Ok(draft.validate()?)
}

fn read_file(path: &Path) -> Result<LabSettingsDraft, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_toml(raw: &str) -> Result<LabSettingsDraft, toml::de::Error> {
    toml::from_str(raw)
}

fn env_overrides(env: &impl Fn(&str) -> Option<String>) -> Result<LabSettingsDraft, ConfigError> {
    Ok(LabSettingsDraft {
        celebration_ms: env_millis(env, CELEBRATION_ENV)?,
        shake_ms: env_millis(env, SHAKE_ENV)?,
        quiz_advance_ms: env_millis(env, QUIZ_ADVANCE_ENV)?,
    })
}

fn env_millis(
    env: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = env(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { name, raw })
}
