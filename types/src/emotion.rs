//! Emotional-state estimates and the unit-interval scalars built on them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;
use crate::error::{clamp_unit, unit_interval};

/// The closed set of emotions the estimator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Emotion {
    Calm,
    Focused,
    Rushed,
    Tired,
    Stressed,
    Anxious,
    Happy,
    Frustrated,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Calm,
        Emotion::Focused,
        Emotion::Rushed,
        Emotion::Tired,
        Emotion::Stressed,
        Emotion::Anxious,
        Emotion::Happy,
        Emotion::Frustrated,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Emotion::Calm => "calm",
            Emotion::Focused => "focused",
            Emotion::Rushed => "rushed",
            Emotion::Tired => "tired",
            Emotion::Stressed => "stressed",
            Emotion::Anxious => "anxious",
            Emotion::Happy => "happy",
            Emotion::Frustrated => "frustrated",
        }
    }
}

impl FromStr for Emotion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.as_str() == lower)
            .ok_or_else(|| ValidationError::UnknownEmotion(s.to_string()))
    }
}

impl TryFrom<String> for Emotion {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Emotion> for String {
    fn from(value: Emotion) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An emotion intensity (or threshold) in `[0, 1]`.
///
/// Deserialization rejects out-of-range values; [`Intensity::clamped`] is the
/// in-code constructor and clamps instead.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Intensity(f64);

impl Intensity {
    pub const ZERO: Intensity = Intensity(0.0);

    #[must_use]
    pub fn clamped(value: f64) -> Self {
        Self(clamp_unit(value))
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Intensity {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        unit_interval("emotion intensity", value).map(Self)
    }
}

impl From<Intensity> for f64 {
    fn from(value: Intensity) -> Self {
        value.0
    }
}

/// Emotion name to intensity. Used both for live estimates and for policy thresholds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionVector(BTreeMap<Emotion, Intensity>);

impl EmotionVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, emotion: Emotion, value: f64) -> Self {
        self.set(emotion, value);
        self
    }

    pub fn set(&mut self, emotion: Emotion, value: f64) {
        self.0.insert(emotion, Intensity::clamped(value));
    }

    /// Intensity for `emotion`; absent entries read as 0.
    #[must_use]
    pub fn intensity(&self, emotion: Emotion) -> f64 {
        self.0.get(&emotion).map_or(0.0, |i| i.value())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, Intensity)> + '_ {
        self.0.iter().map(|(emotion, intensity)| (*emotion, *intensity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(Emotion, f64)> for EmotionVector {
    fn from_iter<T: IntoIterator<Item = (Emotion, f64)>>(iter: T) -> Self {
        let mut vector = Self::new();
        for (emotion, value) in iter {
            vector.set(emotion, value);
        }
        vector
    }
}

/// Normalized friction estimate in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FrictionScore(f64);

impl FrictionScore {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(clamp_unit(value))
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for FrictionScore {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        unit_interval("frictionScore", value).map(Self)
    }
}

impl From<FrictionScore> for f64 {
    fn from(value: FrictionScore) -> Self {
        value.0
    }
}

impl fmt::Display for FrictionScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
