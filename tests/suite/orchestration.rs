//! Policy orchestration end to end

use std::sync::{Arc, Barrier};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use attune_core::{
    Attune, DeviceAdapter, DeviceRegistry, FixedClock, InMemoryDeviceRegistry,
};
use attune_types::{
    CommandOutcome, CommandParameters, DeviceCommand, DeviceId, Emotion, EmotionVector,
    ExecutionBudget, FrictionScore, LAST_COMMAND_KEY, LAST_COMMAND_TIME_KEY, Policy, TimeOfDay,
    UserId,
};

use crate::common::{
    USER, attune, attune_at, device, device_id, focus_policy, focus_policy_json, morning, user,
};

fn focused(level: f64) -> EmotionVector {
    EmotionVector::new().with(Emotion::Focused, level)
}

#[tokio::test]
async fn living_room_light_follows_focus_policy() {
    let attune = attune();
    attune.register_device(device("light-living-room", json!({ "on": true })));
    attune
        .create_policy(focus_policy(&["light-living-room"]))
        .unwrap();

    let results = attune
        .orchestrate(&user(), &focused(0.8), FrictionScore::new(0.5))
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].policy_name, "Focus lighting");
    assert_eq!(results[0].triggered_at, morning());
    assert_eq!(results[0].actions.len(), 1);
    assert!(results[0].actions[0].success());

    let light = &attune.get_devices(&user())[0];
    assert_eq!(light.state.get("on"), Some(&json!(true)));
    assert_eq!(light.state.get("brightness"), Some(&json!(40)));
    assert_eq!(
        light.state.get(LAST_COMMAND_KEY),
        Some(&json!("set_brightness"))
    );
    assert_eq!(
        light.state.get(LAST_COMMAND_TIME_KEY),
        Some(&json!(morning().to_rfc3339()))
    );
    assert_eq!(light.last_synced_at, Some(morning()));
}

#[tokio::test]
async fn unfocused_user_triggers_nothing() {
    let attune = attune();
    attune.register_device(device("light-living-room", json!({ "on": true })));
    attune
        .create_policy(focus_policy(&["light-living-room"]))
        .unwrap();

    let results = attune
        .orchestrate(&user(), &focused(0.3), FrictionScore::new(0.5))
        .await;
    assert!(results.is_empty());
    assert_eq!(
        attune.get_devices(&user())[0].state.get("brightness"),
        None
    );
}

#[tokio::test]
async fn missing_device_fails_alone() {
    let attune = attune();
    attune.register_device(device("lamp", json!({ "on": false })));
    attune
        .create_policy(focus_policy(&["ghost", "lamp"]))
        .unwrap();

    let results = attune
        .orchestrate(&user(), &focused(0.9), FrictionScore::new(0.4))
        .await;
    assert_eq!(results.len(), 1);

    let wire = serde_json::to_value(&results[0].actions).unwrap();
    assert_eq!(
        wire,
        json!([
            {
                "deviceId": "ghost",
                "command": "set_brightness",
                "success": false,
                "error": "Device not found"
            },
            {
                "deviceId": "lamp",
                "command": "set_brightness",
                "success": true
            }
        ])
    );
    assert_eq!(
        attune.get_devices(&user())[0].state.get("brightness"),
        Some(&json!(40))
    );
}

#[tokio::test]
async fn history_limit_returns_most_recent() {
    let attune = attune();
    attune.register_device(device("lamp", json!({})));
    let first: Policy = serde_json::from_value(json!({
        "userId": USER,
        "policyName": "first",
        "action": [{ "deviceId": "lamp", "command": "turn_on" }]
    }))
    .unwrap();
    let first_id = attune.create_policy(first).unwrap();

    attune
        .orchestrate(&user(), &EmotionVector::new(), FrictionScore::new(0.1))
        .await;

    attune.deactivate_policy(&user(), first_id).unwrap();
    let second: Policy = serde_json::from_value(json!({
        "userId": USER,
        "policyName": "second",
        "action": [{ "deviceId": "lamp", "command": "turn_off" }]
    }))
    .unwrap();
    attune.create_policy(second).unwrap();

    attune
        .orchestrate(&user(), &EmotionVector::new(), FrictionScore::new(0.1))
        .await;

    let latest = attune.get_history(&user(), Some(1));
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].policy_name, "second");

    let all = attune.get_history(&user(), None);
    let names: Vec<&str> = all.iter().map(|r| r.policy_name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn time_of_day_clause_uses_local_clock() {
    let evening: Policy = serde_json::from_value(json!({
        "userId": USER,
        "policyName": "evening",
        "condition": { "timeOfDay": { "start": "18:00", "end": "23:00" } },
        "action": [{ "deviceId": "lamp", "command": "turn_on" }]
    }))
    .unwrap();
    let overnight: Policy = serde_json::from_value(json!({
        "userId": USER,
        "policyName": "overnight",
        "condition": { "timeOfDay": { "start": "22:00", "end": "06:00" } },
        "action": [{ "deviceId": "lamp", "command": "turn_off" }]
    }))
    .unwrap();
    let overnight_wrapping: Policy = serde_json::from_value(json!({
        "userId": USER,
        "policyName": "overnight wrapping",
        "condition": {
            "timeOfDay": { "start": "22:00", "end": "06:00", "wrapsMidnight": true }
        },
        "action": [{ "deviceId": "lamp", "command": "turn_off" }]
    }))
    .unwrap();

    for (local, expected) in [
        ("19:00", vec!["evening"]),
        ("22:30", vec!["evening", "overnight wrapping"]),
        ("02:00", vec!["overnight wrapping"]),
        ("12:00", vec![]),
    ] {
        let attune = attune_at(local, vec![0.5]);
        attune.register_device(device("lamp", json!({})));
        for policy in [&evening, &overnight, &overnight_wrapping] {
            attune.create_policy(policy.clone()).unwrap();
        }
        let results = attune
            .orchestrate(&user(), &EmotionVector::new(), FrictionScore::new(0.5))
            .await;
        let names: Vec<&str> = results.iter().map(|r| r.policy_name.as_str()).collect();
        assert_eq!(names, expected, "at {local}");
    }
}

#[tokio::test]
async fn other_users_policies_and_devices_are_untouched() {
    let attune = attune();
    attune.register_device(device("lamp", json!({ "on": false })));
    attune.create_policy(focus_policy(&["lamp"])).unwrap();

    let stranger = UserId::new("user-2").unwrap();
    let results = attune
        .orchestrate(&stranger, &focused(1.0), FrictionScore::new(0.5))
        .await;
    assert!(results.is_empty());
    assert!(attune.get_history(&stranger, None).is_empty());
    assert_eq!(
        attune.get_devices(&user())[0].state.get("on"),
        Some(&json!(false))
    );
}

#[tokio::test]
async fn failing_policy_does_not_block_sibling_policies() {
    let attune = attune();
    attune.register_device(device("lamp", json!({ "on": false })));
    attune.create_policy(focus_policy(&["ghost"])).unwrap();
    let sibling: Policy = serde_json::from_value(json!({
        "userId": USER,
        "policyName": "Lamp on",
        "action": [{ "deviceId": "lamp", "command": "turn_on" }]
    }))
    .unwrap();
    attune.create_policy(sibling).unwrap();

    let results = attune
        .orchestrate(&user(), &focused(0.9), FrictionScore::new(0.5))
        .await;

    let names: Vec<&str> = results.iter().map(|r| r.policy_name.as_str()).collect();
    assert_eq!(names, vec!["Focus lighting", "Lamp on"]);
    assert!(!results[0].all_succeeded());
    assert_eq!(
        results[0].actions[0].error().as_deref(),
        Some("Device not found")
    );
    assert!(results[1].all_succeeded());
    assert_eq!(
        attune.get_devices(&user())[0].state.get("on"),
        Some(&json!(true))
    );
    assert_eq!(attune.get_history(&user(), None), results);
}

#[test]
fn parallel_writers_on_one_device_lose_nothing() {
    const WRITERS: u64 = 16;

    let registry = InMemoryDeviceRegistry::new();
    registry.upsert(device("lamp", json!({ "count": 0 })));
    let lamp = device_id("lamp");
    let barrier = Barrier::new(WRITERS as usize);

    std::thread::scope(|scope| {
        for writer in 0..WRITERS {
            let (registry, lamp, barrier) = (&registry, &lamp, &barrier);
            scope.spawn(move || {
                barrier.wait();
                let found = registry.update(&user(), lamp, &mut |device| {
                    let count = device
                        .state
                        .get("count")
                        .and_then(serde_json::Value::as_u64)
                        .unwrap_or_default();
                    std::thread::yield_now();
                    device.state.insert("count", json!(count + 1));
                    device.state.insert(format!("writer-{writer}"), json!(writer));
                });
                assert!(found);
            });
        }
    });

    let lamp = registry.get(&user(), &lamp).unwrap();
    assert_eq!(lamp.state.get("count"), Some(&json!(WRITERS)));
    for writer in 0..WRITERS {
        assert_eq!(
            lamp.state.get(&format!("writer-{writer}")),
            Some(&json!(writer)),
            "writer {writer} was lost"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_orchestrations_record_every_run() {
    const RUNS: usize = 16;

    let attune = Arc::new(attune());
    attune.register_device(device("lamp", json!({})));
    attune.create_policy(focus_policy(&["lamp"])).unwrap();

    let handles: Vec<_> = (0..RUNS)
        .map(|_| {
            let attune = Arc::clone(&attune);
            tokio::spawn(async move {
                attune
                    .orchestrate(&user(), &focused(0.9), FrictionScore::new(0.5))
                    .await
            })
        })
        .collect();
    for handle in handles {
        let results = handle.await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].all_succeeded());
    }

    assert_eq!(attune.get_history(&user(), None).len(), RUNS);
    assert_eq!(
        attune.get_devices(&user())[0].state.get("brightness"),
        Some(&json!(40))
    );
}

/// Stalls on one device, answers immediately for the rest.
struct StallingAdapter {
    stalled: DeviceId,
    calls: AtomicU32,
}

impl DeviceAdapter for StallingAdapter {
    async fn dispatch(
        &self,
        _user: &UserId,
        device: &DeviceId,
        _command: DeviceCommand,
        _parameters: &CommandParameters,
        _at: DateTime<Utc>,
    ) -> CommandOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if device == &self.stalled {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        CommandOutcome::Success
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_device_times_out_and_deadline_skips_the_rest() {
    let budget = ExecutionBudget::new(
        Duration::from_millis(200),
        1,
        Duration::from_millis(20),
        Duration::from_millis(100),
        0.0,
    )
    .unwrap();
    let attune = Attune::builder()
        .clock(Arc::new(FixedClock::new(
            morning(),
            TimeOfDay::parse("10:00").unwrap(),
        )))
        .budget(budget)
        .build_with_adapter(StallingAdapter {
            stalled: device_id("stuck"),
            calls: AtomicU32::new(0),
        });
    let policy: Policy =
        serde_json::from_value(focus_policy_json(&["fast", "stuck", "late"])).unwrap();
    attune.create_policy(policy).unwrap();

    let results = attune
        .orchestrate_with_deadline(
            &user(),
            &focused(0.9),
            FrictionScore::new(0.5),
            Duration::from_millis(300),
        )
        .await;

    let outcomes: Vec<&CommandOutcome> =
        results[0].actions.iter().map(|a| &a.outcome).collect();
    assert_eq!(outcomes[0], &CommandOutcome::Success);
    // 200ms first attempt, 20ms backoff, then cut to the remaining 80ms.
    assert_eq!(outcomes[1], &CommandOutcome::TimedOut { attempts: 2 });
    assert_eq!(outcomes[2], &CommandOutcome::TimedOut { attempts: 0 });
    assert_eq!(
        results[0].actions[2].error().as_deref(),
        Some("Orchestration deadline exceeded before dispatch")
    );
    assert_eq!(attune.adapter().calls.load(Ordering::SeqCst), 3);
}
