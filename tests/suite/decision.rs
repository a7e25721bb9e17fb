//! Decision collapse through the service and the JSON boundary

use serde_json::json;

use attune_core::{Attune, SequenceSource};
use attune_types::{DecisionAction, DecisionContext, QuatState, Trit};

use crate::common::{attune_at, user};

fn context(value: serde_json::Value) -> DecisionContext {
    serde_json::from_value(value).unwrap()
}

#[test]
fn entangled_true_majority_orchestrates() {
    let attune = attune_at("10:00", vec![0.4, 0.5, 0.9]);
    let result = attune.decide(&context(json!({
        "userId": "user-1",
        "features": [0.1, 0.2, 0.3],
        "multiDeviceContext": true,
        "deviceIds": ["phone", "watch"]
    })));

    assert_eq!(result.action(), DecisionAction::OrchestrateSync);
    assert_eq!(result.quat_state(), Some(QuatState::Entanglement));
    assert_eq!(result.tri_state(), Trit::True);

    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["action"], "ORCHESTRATE_SYNC");
    assert_eq!(wire["triState"], "TRUE");
    assert_eq!(wire["quatState"], "ENTANGLEMENT");
}

#[test]
fn entanglement_needs_flag_and_two_devices() {
    let cases = [
        json!({
            "userId": "user-1",
            "features": [1.0],
            "multiDeviceContext": true,
            "deviceIds": ["phone"]
        }),
        json!({
            "userId": "user-1",
            "features": [1.0],
            "multiDeviceContext": false,
            "deviceIds": ["a", "b"]
        }),
        json!({ "userId": "user-1", "features": [1.0], "deviceIds": ["a", "b"] }),
        json!({
            "userId": "user-1",
            "features": [1.0],
            "multiDeviceContext": true,
            "deviceIds": ["a", "a"]
        }),
    ];
    for case in cases {
        let attune = attune_at("10:00", vec![0.5]);
        let result = attune.decide(&context(case));
        assert_eq!(result.action(), DecisionAction::ProceedLocal);
        assert_eq!(result.quat_state(), None);
    }
}

#[test]
fn superposition_majority_always_defers() {
    for entangled in [true, false] {
        let attune = attune_at("10:00", vec![0.7, 0.8, 0.1]);
        let result = attune.decide(&context(json!({
            "userId": "user-1",
            "features": [0.0, 0.0, 0.0],
            "multiDeviceContext": entangled,
            "deviceIds": ["phone", "watch"]
        })));
        assert_eq!(result.action(), DecisionAction::DeferUntilCollapse);
        assert!((result.confidence() - 2.0 / 3.0).abs() < 1e-9);
    }
}

#[test]
fn empty_features_decide_with_zero_confidence() {
    let attune = attune_at("10:00", vec![0.9]);
    let result = attune.decide(&context(json!({ "userId": "user-1" })));
    assert!(result.confidence().abs() < f64::EPSILON);
    assert_eq!(result.action(), DecisionAction::ProceedLocal);
}

#[test]
fn feature_values_do_not_change_the_decision() {
    // Only the number of features is observed, never their values.
    let quiet = context(json!({ "userId": "user-1", "features": [0.0, 0.0, 0.0, 0.0] }));
    let loud = context(json!({ "userId": "user-1", "features": [9.0, -3.0, 1e6, 0.5] }));

    let a = Attune::builder().seed(1234).build();
    let b = Attune::builder().seed(1234).build();
    assert_eq!(a.decide(&quiet), b.decide(&loud));
}

#[test]
fn decisions_are_audited_per_user() {
    let attune = Attune::builder()
        .random_source(SequenceSource::new(vec![0.1]))
        .build();
    attune.decide(&context(json!({ "userId": "user-1", "features": [1.0] })));
    attune.decide(&context(json!({ "userId": "user-1", "features": [1.0, 1.0] })));
    attune.decide(&context(json!({ "userId": "someone-else", "features": [1.0] })));

    let audit = attune.decision_audit(&user(), 10);
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|record| record.action == DecisionAction::SkipLocal));
    assert_eq!(attune.decision_audit(&user(), 1).len(), 1);
}

#[test]
fn unknown_emotion_in_context_is_rejected() {
    let parsed = serde_json::from_value::<DecisionContext>(json!({
        "userId": "user-1",
        "emotionVector": { "bored": 0.4 }
    }));
    assert!(parsed.is_err());
}
