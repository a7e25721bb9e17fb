//! Resolved configuration types shared across crates.
//!
//! Raw TOML deserialization structs stay private in `attune-config`. The
//! config loader resolves them into these types at the parse boundary, so a
//! value of these types is already valid.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("command timeout must be greater than zero")]
    ZeroCommandTimeout,
    #[error("max backoff ({max:?}) must not be shorter than initial backoff ({initial:?})")]
    InvertedBackoff { initial: Duration, max: Duration },
    #[error("jitter factor must be in [0, 1], got {0}")]
    JitterOutOfRange(f64),
    #[error("orchestration deadline must be greater than zero")]
    ZeroDeadline,
    #[error("history limit must be greater than zero")]
    ZeroHistoryLimit,
}

/// Time and retry budget for a single device command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionBudget {
    command_timeout: Duration,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    jitter_factor: f64,
}

impl ExecutionBudget {
    pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(200);

    pub fn new(
        command_timeout: Duration,
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        jitter_factor: f64,
    ) -> Result<Self, SettingsError> {
        if command_timeout.is_zero() {
            return Err(SettingsError::ZeroCommandTimeout);
        }
        if max_backoff < initial_backoff {
            return Err(SettingsError::InvertedBackoff {
                initial: initial_backoff,
                max: max_backoff,
            });
        }
        if !(0.0..=1.0).contains(&jitter_factor) {
            return Err(SettingsError::JitterOutOfRange(jitter_factor));
        }
        Ok(Self {
            command_timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            jitter_factor,
        })
    }

    /// One attempt, no retries.
    #[must_use]
    pub fn single_attempt(command_timeout: Duration) -> Self {
        Self {
            command_timeout: command_timeout.max(Duration::from_millis(1)),
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter_factor: 0.0,
        }
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    #[must_use]
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self {
            command_timeout: Self::DEFAULT_COMMAND_TIMEOUT,
            max_retries: 2,
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(100),
            jitter_factor: 0.25,
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Seed for the collapse engine; `None` draws from OS entropy.
    pub collapse_seed: Option<u64>,
    pub budget: ExecutionBudget,
    pub orchestration_deadline: Option<Duration>,
    pub history_limit: usize,
    pub log_filter: String,
}

impl Settings {
    pub const DEFAULT_HISTORY_LIMIT: usize = 50;
    pub const DEFAULT_LOG_FILTER: &str = "info";
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collapse_seed: None,
            budget: ExecutionBudget::default(),
            orchestration_deadline: None,
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
            log_filter: Self::DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
