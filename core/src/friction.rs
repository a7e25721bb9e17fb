//! Friction scoring.
//!
//! Collapses battery, memory, authentication, typing and emotional signals
//! into one normalized scalar. Pure: no clock, no randomness, no IO.

use attune_types::{Emotion, FrictionMetrics, FrictionScore, clamp_unit};

/// Free memory at or above this many bytes contributes zero friction.
pub const MEMORY_CEILING_BYTES: f64 = 4.0 * 1024.0 * 1024.0 * 1024.0;

const RUSHED_WEIGHT: f64 = 0.5;
const TIRED_WEIGHT: f64 = 0.3;
const SUB_SCORE_WEIGHT: f64 = 0.2;

/// The five clamped sub-scores behind a friction score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionBreakdown {
    pub battery: f64,
    pub memory: f64,
    pub authentication: f64,
    pub typing: f64,
    pub emotion: f64,
}

impl FrictionBreakdown {
    #[must_use]
    pub fn of(metrics: &FrictionMetrics) -> Self {
        let emotion = metrics.emotion_vector.as_ref().map_or(0.0, |emotions| {
            RUSHED_WEIGHT * emotions.intensity(Emotion::Rushed)
                + TIRED_WEIGHT * emotions.intensity(Emotion::Tired)
        });

        Self {
            battery: clamp_unit(metrics.battery_entropy),
            memory: clamp_unit(1.0 - metrics.free_memory_bytes / MEMORY_CEILING_BYTES),
            authentication: clamp_unit(metrics.behavioral_auth_error_rate),
            typing: clamp_unit(metrics.typing_error_rate),
            emotion: clamp_unit(emotion),
        }
    }

    #[must_use]
    pub fn combined(&self) -> FrictionScore {
        let sum = self.battery + self.memory + self.authentication + self.typing + self.emotion;
        FrictionScore::new(sum * SUB_SCORE_WEIGHT)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrictionModel;

impl FrictionModel {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn calculate(&self, metrics: &FrictionMetrics) -> FrictionScore {
        FrictionBreakdown::of(metrics).combined()
    }
}
