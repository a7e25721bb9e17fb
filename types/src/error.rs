use thiserror::Error;

/// Rejection raised at the parse boundary before a value reaches the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} must be a finite number in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("{field} must be a finite, non-negative number, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("invalid time of day {0:?}, expected zero-padded HH:MM")]
    TimeOfDay(String),
    #[error("friction window min ({min}) exceeds max ({max})")]
    InvertedFrictionWindow { min: f64, max: f64 },
    #[error("policy must carry at least one device action")]
    EmptyActions,
    #[error("unknown emotion {0:?}")]
    UnknownEmotion(String),
    #[error("unknown device command {0:?}")]
    UnknownCommand(String),
}

/// Accepts `value` only when it is finite and within `[0, 1]`.
pub(crate) fn unit_interval(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfUnitRange { field, value })
    }
}

/// Clamps into `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
