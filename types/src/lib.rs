//! Core domain types for Attune.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The serde derives here define the JSON boundary: every type that crosses it
//! validates on deserialization, so the core can assume well-typed input.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod decision;
mod device;
mod emotion;
mod error;
mod friction;
mod ids;
mod orchestration;
mod policy;
pub mod settings;

pub use decision::{
    DecisionAction, DecisionContext, DecisionRecord, DecisionResult, QuatState, Trit,
};
pub use device::{
    CommandParameters, DeviceCommand, DeviceState, DeviceType, LAST_COMMAND_KEY,
    LAST_COMMAND_TIME_KEY, SmartDevice,
};
pub use emotion::{Emotion, EmotionVector, FrictionScore, Intensity};
pub use error::{ValidationError, clamp_unit};
pub use friction::{FrictionMetrics, FrictionReport};
pub use ids::{DeviceId, PolicyId, UserId};
pub use orchestration::{ActionOutcome, CommandOutcome, DEVICE_NOT_FOUND, OrchestrationResult};
pub use policy::{DeviceAction, FrictionWindow, Policy, PolicyCondition, TimeOfDay, TimeWindow};
pub use settings::{ExecutionBudget, Settings, SettingsError};
