//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

use attune_core::{Attune, FixedClock, SequenceSource};
use attune_types::{DeviceId, Policy, SmartDevice, TimeOfDay, UserId};

pub const USER: &str = "user-1";

pub fn user() -> UserId {
    UserId::new(USER).unwrap()
}

pub fn device_id(id: &str) -> DeviceId {
    DeviceId::new(id).unwrap()
}

/// 2026-06-01 10:00 UTC, reported as 10:00 local.
pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
}

/// Service with a pinned clock and a repeating observation sequence.
pub fn attune_at(local: &str, observations: Vec<f64>) -> Attune {
    Attune::builder()
        .clock(Arc::new(FixedClock::new(
            morning(),
            TimeOfDay::parse(local).unwrap(),
        )))
        .random_source(SequenceSource::new(observations))
        .build()
}

pub fn attune() -> Attune {
    attune_at("10:00", vec![0.5])
}

pub fn device_json(id: &str, state: Value) -> Value {
    json!({
        "userId": USER,
        "deviceId": id,
        "deviceName": id,
        "deviceType": "light",
        "state": state
    })
}

pub fn device(id: &str, state: Value) -> SmartDevice {
    serde_json::from_value(device_json(id, state)).unwrap()
}

/// `focused >= 0.7` with friction in `[0.3, 0.8]`.
pub fn focus_policy_json(targets: &[&str]) -> Value {
    let actions: Vec<Value> = targets
        .iter()
        .map(|id| {
            json!({
                "deviceId": id,
                "command": "set_brightness",
                "parameters": { "brightness": 40 }
            })
        })
        .collect();
    json!({
        "userId": USER,
        "policyName": "Focus lighting",
        "condition": {
            "emotionVector": { "focused": 0.7 },
            "frictionScore": { "min": 0.3, "max": 0.8 }
        },
        "action": actions
    })
}

pub fn focus_policy(targets: &[&str]) -> Policy {
    serde_json::from_value(focus_policy_json(targets)).unwrap()
}
