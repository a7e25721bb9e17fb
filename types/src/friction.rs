use serde::{Deserialize, Serialize};

use crate::error::unit_interval;
use crate::{EmotionVector, FrictionScore, ValidationError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrictionMetrics {
    battery_entropy: f64,
    free_memory_bytes: f64,
    behavioral_auth_error_rate: f64,
    typing_error_rate: f64,
    #[serde(default)]
    emotion_vector: Option<EmotionVector>,
}

/// Raw wellbeing and device metrics fed to the friction model.
///
/// Rates are validated into `[0, 1]` at the deserialization boundary. Values
/// built in code are not checked here; the model clamps every sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrictionMetrics", rename_all = "camelCase")]
pub struct FrictionMetrics {
    pub battery_entropy: f64,
    pub free_memory_bytes: f64,
    pub behavioral_auth_error_rate: f64,
    pub typing_error_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion_vector: Option<EmotionVector>,
}

impl TryFrom<RawFrictionMetrics> for FrictionMetrics {
    type Error = ValidationError;

    fn try_from(raw: RawFrictionMetrics) -> Result<Self, Self::Error> {
        if !raw.free_memory_bytes.is_finite() || raw.free_memory_bytes < 0.0 {
            return Err(ValidationError::Negative {
                field: "freeMemoryBytes",
                value: raw.free_memory_bytes,
            });
        }
        Ok(Self {
            battery_entropy: unit_interval("batteryEntropy", raw.battery_entropy)?,
            free_memory_bytes: raw.free_memory_bytes,
            behavioral_auth_error_rate: unit_interval(
                "behavioralAuthErrorRate",
                raw.behavioral_auth_error_rate,
            )?,
            typing_error_rate: unit_interval("typingErrorRate", raw.typing_error_rate)?,
            emotion_vector: raw.emotion_vector,
        })
    }
}

/// `{ "frictionScore": x }` as returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrictionReport {
    pub friction_score: FrictionScore,
}
