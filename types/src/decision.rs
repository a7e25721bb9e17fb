//! Decision inputs and outputs for the state-collapse engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::clamp_unit;
use crate::{DeviceId, EmotionVector, FrictionScore, UserId};

/// Quantized outcome of collapsing one stochastic observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trit {
    False,
    True,
    Superposition,
}

impl Trit {
    /// Tie-break priority: earlier entries win on equal counts.
    pub const PRIORITY: [Trit; 3] = [Trit::True, Trit::False, Trit::Superposition];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Trit::False => "FALSE",
            Trit::True => "TRUE",
            Trit::Superposition => "SUPERPOSITION",
        }
    }
}

/// Routed action for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionAction {
    ProceedLocal,
    SkipLocal,
    DeferUntilCollapse,
    OrchestrateSync,
}

impl DecisionAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DecisionAction::ProceedLocal => "PROCEED_LOCAL",
            DecisionAction::SkipLocal => "SKIP_LOCAL",
            DecisionAction::DeferUntilCollapse => "DEFER_UNTIL_COLLAPSE",
            DecisionAction::OrchestrateSync => "ORCHESTRATE_SYNC",
        }
    }
}

/// Marker attached to decisions that must be coordinated across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuatState {
    Entanglement,
}

/// Per-call decision input. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionContext {
    pub user_id: UserId,
    #[serde(default)]
    pub features: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion_vector: Option<EmotionVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction_score: Option<FrictionScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_device_context: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_ids: Option<BTreeSet<DeviceId>>,
}

impl DecisionContext {
    #[must_use]
    pub fn new(user_id: UserId, features: Vec<f64>) -> Self {
        Self {
            user_id,
            features,
            emotion_vector: None,
            friction_score: None,
            multi_device_context: None,
            device_ids: None,
        }
    }

    #[must_use]
    pub fn with_devices(
        mut self,
        multi_device: bool,
        device_ids: impl IntoIterator<Item = DeviceId>,
    ) -> Self {
        self.multi_device_context = Some(multi_device);
        self.device_ids = Some(device_ids.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_friction(mut self, score: FrictionScore) -> Self {
        self.friction_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_emotions(mut self, emotions: EmotionVector) -> Self {
        self.emotion_vector = Some(emotions);
        self
    }

    /// True only for an explicit multi-device flag with more than one distinct device.
    #[must_use]
    pub fn is_entangled(&self) -> bool {
        self.multi_device_context == Some(true)
            && self.device_ids.as_ref().is_some_and(|ids| ids.len() > 1)
    }
}

/// Outcome of one collapse. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    action: DecisionAction,
    confidence: f64,
    tri_state: Trit,
    quat_state: Option<QuatState>,
    rationale: String,
}

impl DecisionResult {
    #[must_use]
    pub fn new(
        action: DecisionAction,
        confidence: f64,
        tri_state: Trit,
        quat_state: Option<QuatState>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            action,
            confidence: clamp_unit(confidence),
            tri_state,
            quat_state,
            rationale: rationale.into(),
        }
    }

    #[must_use]
    pub fn action(&self) -> DecisionAction {
        self.action
    }

    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    #[must_use]
    pub fn tri_state(&self) -> Trit {
        self.tri_state
    }

    #[must_use]
    pub fn quat_state(&self) -> Option<QuatState> {
        self.quat_state
    }

    #[must_use]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }
}

/// Audit row kept for every emitted decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub user_id: UserId,
    pub tri_state: Trit,
    pub quat_state: Option<QuatState>,
    pub action: DecisionAction,
    pub confidence: f64,
    pub outcome: String,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    #[must_use]
    pub fn from_result(
        user_id: UserId,
        result: &DecisionResult,
        decided_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            tri_state: result.tri_state(),
            quat_state: result.quat_state(),
            action: result.action(),
            confidence: result.confidence(),
            outcome: result.rationale().to_string(),
            decided_at,
        }
    }
}
