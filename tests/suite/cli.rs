//! The `attune` binary, driven through files and stdin

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};

use crate::common::{USER, device_json, focus_policy_json};

/// Runs the binary with an isolated home so no user config leaks in.
fn attune(home: &Path, args: &[&str], stdin: Option<&Value>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_attune"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("ATTUNE_SEED")
        .env_remove("ATTUNE_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut pipe = child.stdin.take().unwrap();
    if let Some(input) = stdin {
        pipe.write_all(input.to_string().as_bytes()).unwrap();
    }
    drop(pipe);
    child.wait_with_output().unwrap()
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn friction_reads_a_file() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("metrics.json");
    std::fs::write(
        &input,
        json!({
            "batteryEntropy": 0.0,
            "freeMemoryBytes": 4_294_967_296u64,
            "behavioralAuthErrorRate": 0.0,
            "typingErrorRate": 0.0
        })
        .to_string(),
    )
    .unwrap();

    let output = attune(home.path(), &["friction", input.to_str().unwrap()], None);
    assert_eq!(stdout_json(&output), json!({ "frictionScore": 0.0 }));
}

#[test]
fn decide_with_seed_is_reproducible() {
    let home = tempfile::tempdir().unwrap();
    let context = json!({ "userId": USER, "features": [0.1, 0.2, 0.3, 0.4, 0.5] });

    let first = stdout_json(&attune(
        home.path(),
        &["decide", "-", "--seed", "99"],
        Some(&context),
    ));
    let second = stdout_json(&attune(
        home.path(),
        &["decide", "-", "--seed", "99"],
        Some(&context),
    ));
    assert_eq!(first, second);
    assert!(first["action"].is_string());
    assert!(first["rationale"].is_string());
}

#[test]
fn orchestrate_prints_results_and_final_device_state() {
    let home = tempfile::tempdir().unwrap();
    let scenario = json!({
        "userId": USER,
        "devices": [device_json("light-living-room", json!({ "on": true }))],
        "policies": [focus_policy_json(&["light-living-room", "ghost"])],
        "emotionVector": { "focused": 0.8 },
        "frictionScore": 0.5
    });

    let report = stdout_json(&attune(home.path(), &["orchestrate", "-"], Some(&scenario)));

    let actions = &report["results"][0]["actions"];
    assert_eq!(actions[0]["success"], json!(true));
    assert_eq!(actions[1]["error"], json!("Device not found"));
    assert_eq!(report["devices"][0]["state"]["brightness"], json!(40));
    assert_eq!(report["devices"][0]["state"]["on"], json!(true));
    assert_eq!(report["history"], report["results"]);
}

#[test]
fn config_file_is_honoured() {
    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join(".attune");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[collapse]\nseed = 5\n").unwrap();
    let context = json!({ "userId": USER, "features": [1.0, 1.0, 1.0] });

    let from_config = stdout_json(&attune(home.path(), &["decide", "-"], Some(&context)));
    let from_flag = stdout_json(&attune(
        home.path(),
        &["decide", "-", "--seed", "5"],
        Some(&context),
    ));
    assert_eq!(from_config, from_flag);
}

#[test]
fn invalid_input_exits_non_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = attune(
        home.path(),
        &["friction", "-"],
        Some(&json!({ "batteryEntropy": 3.0 })),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid JSON"));
}

#[test]
fn broken_config_exits_non_zero() {
    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join(".attune");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "[executor\n").unwrap();

    let output = attune(
        home.path(),
        &["friction", "-"],
        Some(&json!({})),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("configuration"));
}
