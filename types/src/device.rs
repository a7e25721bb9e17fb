//! Controllable devices and the command vocabulary they accept.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{DeviceId, UserId, ValidationError};

/// State keys stamped on every dispatched command.
pub const LAST_COMMAND_KEY: &str = "lastCommand";
pub const LAST_COMMAND_TIME_KEY: &str = "lastCommandTime";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Light,
    Thermostat,
    Lock,
    Speaker,
    Plug,
    Blinds,
    #[default]
    Other,
}

/// Closed command vocabulary understood by device adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceCommand {
    TurnOn,
    TurnOff,
    SetBrightness,
    SetColor,
    SetTemperature,
    SetMode,
    Lock,
    Unlock,
    Play,
    Pause,
}

impl DeviceCommand {
    pub const ALL: [DeviceCommand; 10] = [
        DeviceCommand::TurnOn,
        DeviceCommand::TurnOff,
        DeviceCommand::SetBrightness,
        DeviceCommand::SetColor,
        DeviceCommand::SetTemperature,
        DeviceCommand::SetMode,
        DeviceCommand::Lock,
        DeviceCommand::Unlock,
        DeviceCommand::Play,
        DeviceCommand::Pause,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceCommand::TurnOn => "turn_on",
            DeviceCommand::TurnOff => "turn_off",
            DeviceCommand::SetBrightness => "set_brightness",
            DeviceCommand::SetColor => "set_color",
            DeviceCommand::SetTemperature => "set_temperature",
            DeviceCommand::SetMode => "set_mode",
            DeviceCommand::Lock => "lock",
            DeviceCommand::Unlock => "unlock",
            DeviceCommand::Play => "play",
            DeviceCommand::Pause => "pause",
        }
    }
}

impl FromStr for DeviceCommand {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        DeviceCommand::ALL
            .into_iter()
            .find(|command| command.as_str() == lower)
            .ok_or_else(|| ValidationError::UnknownCommand(s.to_string()))
    }
}

impl TryFrom<String> for DeviceCommand {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceCommand> for String {
    fn from(value: DeviceCommand) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters attached to a device command, merged shallowly into device state.
pub type CommandParameters = BTreeMap<String, Value>;

/// Last-known key/value state of a device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceState(BTreeMap<String, Value>);

impl DeviceState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow merge: top-level keys in `parameters` overwrite existing keys.
    pub fn merge(&mut self, parameters: &CommandParameters) {
        for (key, value) in parameters {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for DeviceState {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One registered device. Unique per `(user_id, device_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartDevice {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: UserId,
    pub device_id: DeviceId,
    pub device_name: String,
    #[serde(default)]
    pub device_type: DeviceType,
    #[serde(default)]
    pub state: DeviceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl SmartDevice {
    #[must_use]
    pub fn new(
        user_id: UserId,
        device_id: DeviceId,
        device_name: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            device_id,
            device_name: device_name.into(),
            device_type,
            state: DeviceState::new(),
            last_synced_at: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: DeviceState) -> Self {
        self.state = state;
        self
    }

    /// Applies a command to the local state record.
    pub fn apply_command(
        &mut self,
        command: DeviceCommand,
        parameters: &CommandParameters,
        at: DateTime<Utc>,
    ) {
        self.state.merge(parameters);
        self.state
            .insert(LAST_COMMAND_KEY, Value::String(command.as_str().to_string()));
        self.state
            .insert(LAST_COMMAND_TIME_KEY, Value::String(at.to_rfc3339()));
        self.last_synced_at = Some(at);
    }
}
