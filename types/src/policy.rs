//! Conditional automation rules.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::CommandParameters;
use crate::{
    DeviceCommand, DeviceId, EmotionVector, FrictionScore, PolicyId, UserId, ValidationError,
};

/// Zero-padded `HH:MM` wall-clock time.
///
/// Ordering is plain string ordering, which matches chronological ordering
/// within a single day because the format is fixed-width.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(String);

impl TimeOfDay {
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
        if !well_formed {
            return Err(ValidationError::TimeOfDay(value));
        }
        let hours = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
        let minutes = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
        if hours > 23 || minutes > 59 {
            return Err(ValidationError::TimeOfDay(value));
        }
        Ok(Self(value))
    }

    /// Infallible constructor from clock components; out-of-range parts saturate.
    #[must_use]
    pub fn from_clock(hour: u32, minute: u32) -> Self {
        Self(format!("{:02}:{:02}", hour.min(23), minute.min(59)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive `[start, end]` window.
///
/// With `wraps_midnight = false` (the default) a window whose start is after
/// its end never matches. Setting the flag treats such a window as crossing
/// midnight instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub wraps_midnight: bool,
}

#[derive(Deserialize)]
struct RawFrictionWindow {
    #[serde(default)]
    min: Option<FrictionScore>,
    #[serde(default)]
    max: Option<FrictionScore>,
}

/// Inclusive friction-score bounds; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawFrictionWindow")]
pub struct FrictionWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<FrictionScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<FrictionScore>,
}

impl FrictionWindow {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Result<Self, ValidationError> {
        Self::try_from(RawFrictionWindow {
            min: min.map(FrictionScore::new),
            max: max.map(FrictionScore::new),
        })
    }

    #[must_use]
    pub fn min(&self) -> Option<FrictionScore> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<FrictionScore> {
        self.max
    }
}

impl TryFrom<RawFrictionWindow> for FrictionWindow {
    type Error = ValidationError;

    fn try_from(raw: RawFrictionWindow) -> Result<Self, Self::Error> {
        if let (Some(min), Some(max)) = (raw.min, raw.max)
            && min > max
        {
            return Err(ValidationError::InvertedFrictionWindow {
                min: min.value(),
                max: max.value(),
            });
        }
        Ok(Self {
            min: raw.min,
            max: raw.max,
        })
    }
}

/// All present clauses must pass; absent clauses pass trivially.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCondition {
    /// Per-emotion lower bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_vector: Option<EmotionVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction_score: Option<FrictionWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeWindow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAction {
    pub device_id: DeviceId,
    pub command: DeviceCommand,
    #[serde(default)]
    pub parameters: CommandParameters,
}

impl DeviceAction {
    #[must_use]
    pub fn new(device_id: DeviceId, command: DeviceCommand) -> Self {
        Self {
            device_id,
            command,
            parameters: CommandParameters::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicy {
    #[serde(default)]
    id: PolicyId,
    user_id: UserId,
    policy_name: String,
    #[serde(default)]
    condition: PolicyCondition,
    action: Vec<DeviceAction>,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

/// A named rule. Created once, later only deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy", rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub user_id: UserId,
    pub policy_name: String,
    pub condition: PolicyCondition,
    #[serde(rename = "action")]
    pub actions: Vec<DeviceAction>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Policy {
    pub fn new(
        user_id: UserId,
        policy_name: impl Into<String>,
        condition: PolicyCondition,
        actions: Vec<DeviceAction>,
    ) -> Result<Self, ValidationError> {
        Self::try_from(RawPolicy {
            id: PolicyId::generate(),
            user_id,
            policy_name: policy_name.into(),
            condition,
            action: actions,
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

impl TryFrom<RawPolicy> for Policy {
    type Error = ValidationError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        if raw.policy_name.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "policyName",
            });
        }
        if raw.action.is_empty() {
            return Err(ValidationError::EmptyActions);
        }
        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            policy_name: raw.policy_name,
            condition: raw.condition,
            actions: raw.action,
            is_active: raw.is_active,
            created_at: raw.created_at,
        })
    }
}
