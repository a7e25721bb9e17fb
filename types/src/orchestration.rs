//! Per-device command outcomes and the orchestration history entry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{DeviceCommand, DeviceId, PolicyId};

pub const DEVICE_NOT_FOUND: &str = "Device not found";

/// Result of dispatching one command to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    DeviceNotFound,
    ExecutionError { message: String },
    /// No attempt finished inside its time budget. `attempts` is zero when
    /// the caller's deadline had already passed before dispatch.
    TimedOut { attempts: u32 },
}

impl CommandOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Success)
    }

    /// Whether another attempt may change the outcome.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommandOutcome::ExecutionError { .. } | CommandOutcome::TimedOut { .. }
        )
    }

    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            CommandOutcome::Success => None,
            CommandOutcome::DeviceNotFound => Some(DEVICE_NOT_FOUND.to_string()),
            CommandOutcome::ExecutionError { message } => Some(message.clone()),
            CommandOutcome::TimedOut { attempts: 0 } => {
                Some("Orchestration deadline exceeded before dispatch".to_string())
            }
            CommandOutcome::TimedOut { attempts } => {
                Some(format!("Command timed out after {attempts} attempts"))
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireActionOutcome {
    device_id: DeviceId,
    command: DeviceCommand,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ActionOutcome> for WireActionOutcome {
    fn from(value: ActionOutcome) -> Self {
        Self {
            success: value.outcome.is_success(),
            error: value.outcome.error_message(),
            device_id: value.device_id,
            command: value.command,
        }
    }
}

/// One entry of an orchestration result, serialized as
/// `{deviceId, command, success, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "WireActionOutcome")]
pub struct ActionOutcome {
    pub device_id: DeviceId,
    pub command: DeviceCommand,
    pub outcome: CommandOutcome,
}

impl ActionOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.outcome.error_message()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub triggered_at: DateTime<Utc>,
    pub actions: Vec<ActionOutcome>,
}

impl OrchestrationResult {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.actions.iter().all(ActionOutcome::success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.actions.iter().filter(|action| !action.success())
    }
}
