//! Configuration for Attune.
//!
//! Reads `~/.attune/config.toml`, resolves it into validated
//! [`Settings`], and applies the `ATTUNE_SEED` and `ATTUNE_LOG` environment
//! overrides. Every section of the file is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use attune_types::{ExecutionBudget, Settings, SettingsError};

pub const SEED_ENV: &str = "ATTUNE_SEED";
pub const LOG_ENV: &str = "ATTUNE_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config at {}", path.display())]
    Invalid {
        path: PathBuf,
        source: SettingsError,
    },
    #[error("{var} must be an unsigned integer, got {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ConfigError {
    /// The config file involved, if the error came from one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => Some(path),
            ConfigError::InvalidEnv { .. } => None,
        }
    }
}

/// `config.toml` as written on disk.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttuneConfig {
    pub collapse: Option<CollapseConfig>,
    pub executor: Option<ExecutorConfig>,
    pub history: Option<HistoryConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollapseConfig {
    /// Omit for a non-deterministic engine.
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    pub command_timeout_ms: Option<u64>,
    /// Retries after the first attempt.
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub jitter_factor: Option<f64>,
    /// Whole-orchestration deadline.
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    pub default_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl AttuneConfig {
    /// Loads the config from the default location.
    ///
    /// Returns `Ok(None)` when there is no home directory or no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Fills unset values with defaults and validates the result.
    pub fn resolve(&self) -> Result<Settings, SettingsError> {
        let defaults = Settings::default();
        let default_budget = defaults.budget;
        let executor = self.executor.as_ref();
        let millis = |pick: fn(&ExecutorConfig) -> Option<u64>, fallback: Duration| {
            executor
                .and_then(pick)
                .map_or(fallback, Duration::from_millis)
        };

        let budget = ExecutionBudget::new(
            millis(|e| e.command_timeout_ms, default_budget.command_timeout()),
            executor
                .and_then(|e| e.max_retries)
                .unwrap_or(default_budget.max_retries()),
            millis(|e| e.initial_backoff_ms, default_budget.initial_backoff()),
            millis(|e| e.max_backoff_ms, default_budget.max_backoff()),
            executor
                .and_then(|e| e.jitter_factor)
                .unwrap_or(default_budget.jitter_factor()),
        )?;

        let orchestration_deadline = executor
            .and_then(|e| e.deadline_ms)
            .map(Duration::from_millis);
        if orchestration_deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(SettingsError::ZeroDeadline);
        }

        let history_limit = self
            .history
            .as_ref()
            .and_then(|h| h.default_limit)
            .unwrap_or(defaults.history_limit);
        if history_limit == 0 {
            return Err(SettingsError::ZeroHistoryLimit);
        }

        Ok(Settings {
            collapse_seed: self.collapse.as_ref().and_then(|c| c.seed),
            budget,
            orchestration_deadline,
            history_limit,
            log_filter: self
                .logging
                .as_ref()
                .and_then(|l| l.filter.clone())
                .unwrap_or(defaults.log_filter),
        })
    }
}

/// Applies `ATTUNE_SEED` and `ATTUNE_LOG` on top of file settings.
///
/// Takes the raw values so callers decide where they come from.
pub fn apply_overrides(
    mut settings: Settings,
    seed: Option<&str>,
    log_filter: Option<&str>,
) -> Result<Settings, ConfigError> {
    if let Some(raw) = seed.map(str::trim).filter(|raw| !raw.is_empty()) {
        let parsed = raw.parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
            var: SEED_ENV,
            value: raw.to_string(),
        })?;
        settings.collapse_seed = Some(parsed);
    }
    if let Some(filter) = log_filter.map(str::trim).filter(|f| !f.is_empty()) {
        settings.log_filter = filter.to_string();
    }
    Ok(settings)
}

/// Loads, resolves and overrides settings from `path`. A missing file
/// yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let settings = match AttuneConfig::load_from(path)? {
        Some(config) => config.resolve().map_err(|source| {
            tracing::warn!("Invalid config at {:?}: {}", path, source);
            ConfigError::Invalid {
                path: path.to_path_buf(),
                source,
            }
        })?,
        None => Settings::default(),
    };
    apply_overrides(
        settings,
        std::env::var(SEED_ENV).ok().as_deref(),
        std::env::var(LOG_ENV).ok().as_deref(),
    )
}

/// [`load_settings_from`] at the default location.
pub fn load_settings() -> Result<Settings, ConfigError> {
    match config_path() {
        Some(path) => load_settings_from(&path),
        None => apply_overrides(
            Settings::default(),
            std::env::var(SEED_ENV).ok().as_deref(),
            std::env::var(LOG_ENV).ok().as_deref(),
        ),
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".attune").join("config.toml"))
}
