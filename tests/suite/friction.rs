//! Friction scoring through the service and the JSON boundary

use serde_json::json;

use attune_core::FrictionModel;
use attune_types::{FrictionMetrics, FrictionReport};

use crate::common::attune;

fn metrics(battery: f64, free: f64, auth: f64, typing: f64) -> FrictionMetrics {
    FrictionMetrics {
        battery_entropy: battery,
        free_memory_bytes: free,
        behavioral_auth_error_rate: auth,
        typing_error_rate: typing,
        emotion_vector: None,
    }
}

const FOUR_GIB: f64 = 4_294_967_296.0;

#[test]
fn idle_metrics_score_zero() {
    let report = attune().calculate_friction(&metrics(0.0, FOUR_GIB, 0.0, 0.0));
    assert!(report.friction_score.value().abs() < f64::EPSILON);
}

#[test]
fn report_serializes_as_friction_score_object() {
    let report = FrictionReport {
        friction_score: attune_types::FrictionScore::new(0.25),
    };
    assert_eq!(
        serde_json::to_value(report).unwrap(),
        json!({ "frictionScore": 0.25 })
    );
}

#[test]
fn boundary_json_with_emotions_scores_expected_value() {
    let parsed: FrictionMetrics = serde_json::from_value(json!({
        "batteryEntropy": 0.5,
        "freeMemoryBytes": 2_147_483_648u64,
        "behavioralAuthErrorRate": 0.0,
        "typingErrorRate": 0.5,
        "emotionVector": { "rushed": 1.0, "tired": 1.0 }
    }))
    .unwrap();

    // battery 0.5 + memory 0.5 + auth 0 + typing 0.5 + emotion min(0.8, 1)
    let score = attune().calculate_friction(&parsed).friction_score.value();
    assert!((score - 0.2 * 2.3).abs() < 1e-9, "{score}");
}

#[test]
fn monotone_in_each_metric_and_bounded() {
    let model = FrictionModel::new();
    let steps = [0.0, 0.1, 0.4, 0.7, 1.0];
    let mut previous = -1.0;
    for battery in steps {
        let score = model
            .calculate(&metrics(battery, FOUR_GIB / 2.0, 0.3, 0.3))
            .value();
        assert!(score >= previous);
        assert!((0.0..=1.0).contains(&score));
        previous = score;
    }

    let mut previous = 2.0;
    for free in [0.0, 1e9, 2e9, FOUR_GIB, FOUR_GIB * 4.0] {
        let score = model.calculate(&metrics(0.2, free, 0.2, 0.2)).value();
        assert!(score <= previous, "more free memory must not add friction");
        previous = score;
    }
}

#[test]
fn out_of_range_rates_are_rejected_at_the_boundary() {
    let valid = json!({
        "batteryEntropy": 0.0,
        "freeMemoryBytes": 0,
        "behavioralAuthErrorRate": 0.0,
        "typingErrorRate": 0.0
    });
    assert!(serde_json::from_value::<FrictionMetrics>(valid.clone()).is_ok());

    for (field, value) in [
        ("batteryEntropy", json!(1.5)),
        ("freeMemoryBytes", json!(-1)),
        ("typingErrorRate", json!(-0.1)),
        ("emotionVector", json!({ "elated": 0.5 })),
        ("emotionVector", json!({ "rushed": 2.0 })),
    ] {
        let mut bad = valid.clone();
        bad[field] = value;
        assert!(serde_json::from_value::<FrictionMetrics>(bad).is_err());
    }
}
