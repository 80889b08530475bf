mod support;

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use support::{copy_fixture_dir, fixtures_root};
use tempfile::TempDir;

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn resolve_text_prints_the_resolution() {
    let output = cargo_bin_cmd!("scenario-engine")
        .arg("resolve")
        .arg("--store")
        .arg(fixtures_root().join("store"))
        .args(["--text", "hello", "--user", "U-english", "--timestamp", "0"])
        .env_remove("SCENARIO_ENVIRONMENT")
        .output()
        .unwrap();
    assert!(output.status.success());

    let resolution = stdout_json(&output);
    assert_eq!(resolution["partition"], "city#v3#en");
    assert_eq!(resolution["handled_by"], "text_mapping");
    assert_eq!(resolution["reply"]["kind"], "messages");
    assert_eq!(resolution["reply"]["value"][0]["text"], "Hello");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Handled by: text_mapping"));
}

#[test]
fn resolve_webhook_file_handles_each_event() {
    let tmp = TempDir::new().unwrap();
    let event = tmp.path().join("webhook.json");
    fs::write(
        &event,
        r#"{"events": [
            {"type": "follow", "source": {"userId": "U-japanese"}},
            {"type": "message", "timestamp": 1709262299000, "source": {"userId": "U-japanese"},
             "message": {"type": "text", "text": "hello"}},
            {"type": "postback", "timestamp": 1709262299000, "source": {"userId": "U-japanese"},
             "postback": {"data": "{\"facilityName\":\"Central Library\",\"spaceName\":\"Study Room A\",\"id\":\"CONGESTION_SITUATION_SELECT\"}"}}
        ]}"#,
    )
    .unwrap();

    let output = cargo_bin_cmd!("scenario-engine")
        .arg("resolve")
        .arg("--store")
        .arg(fixtures_root().join("store"))
        .arg("--event")
        .arg(&event)
        .env_remove("SCENARIO_ENVIRONMENT")
        .output()
        .unwrap();
    assert!(output.status.success());

    let resolutions = stdout_json(&output);
    let resolutions = resolutions.as_array().unwrap();
    assert_eq!(resolutions.len(), 2);
    assert_eq!(resolutions[0]["reply"]["value"][0]["text"], "こんにちは");
    assert_eq!(resolutions[1]["handled_by"], "congestion_detail");
    let bubble = &resolutions[1]["reply"]["value"][0]["contents"];
    assert_eq!(bubble["body"]["contents"][1]["text"], "open");
    assert_eq!(bubble["body"]["contents"][2]["text"], "2024-03-01 12:04");
}

#[test]
fn environment_comes_from_flag_or_variable() {
    let from_flag = cargo_bin_cmd!("scenario-engine")
        .arg("resolve")
        .arg("--store")
        .arg(fixtures_root().join("store"))
        .args(["--text", "hello", "--env", "sandbox"])
        .env_remove("SCENARIO_ENVIRONMENT")
        .output()
        .unwrap();
    assert!(from_flag.status.success());
    let resolution = stdout_json(&from_flag);
    assert_eq!(resolution["partition"], "city#v4");
    assert!(resolution["reply"].is_null());

    let from_env = cargo_bin_cmd!("scenario-engine")
        .arg("resolve")
        .arg("--store")
        .arg(fixtures_root().join("store"))
        .args(["--text", "hello"])
        .env("SCENARIO_ENVIRONMENT", "sandbox")
        .output()
        .unwrap();
    assert_eq!(stdout_json(&from_env)["partition"], "city#v4");
}

#[test]
fn config_file_changes_the_default_locale() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("engine.yaml");
    fs::write(&config, "default_locale: en\n").unwrap();

    let output = cargo_bin_cmd!("scenario-engine")
        .arg("resolve")
        .arg("--store")
        .arg(fixtures_root().join("store"))
        .arg("--config")
        .arg(&config)
        .args(["--text", "hello", "--user", "U-english"])
        .env_remove("SCENARIO_ENVIRONMENT")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["partition"], "city#v3");
}

#[test]
fn resolve_requires_an_input() {
    cargo_bin_cmd!("scenario-engine")
        .arg("resolve")
        .arg("--store")
        .arg(fixtures_root().join("store"))
        .assert()
        .failure();
}

#[test]
fn disaster_mode_activation_updates_settings() {
    let tmp = TempDir::new().unwrap();
    copy_fixture_dir(&fixtures_root().join("store"), tmp.path());

    let output = cargo_bin_cmd!("scenario-engine")
        .arg("disaster-mode")
        .arg("--store")
        .arg(tmp.path())
        .arg("--activate")
        .env_remove("SCENARIO_ENVIRONMENT")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<Value> = stdout.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["call"], "broadcast");
    assert_eq!(lines[0]["messages"][0]["text"], "An evacuation advisory has been issued.");
    assert_eq!(lines[1]["call"], "set_default_menu");
    assert_eq!(lines[1]["menu_id"], "menu-bosai");
    assert_eq!(lines[2]["result"], "SUCCESS");

    let settings = fs::read_to_string(tmp.path().join("settings.yaml")).unwrap();
    assert!(settings.contains("production: true"));
}

#[test]
fn disaster_mode_failure_exits_non_zero() {
    let tmp = TempDir::new().unwrap();
    copy_fixture_dir(&fixtures_root().join("store"), tmp.path());

    let output = cargo_bin_cmd!("scenario-engine")
        .arg("disaster-mode")
        .arg("--store")
        .arg(tmp.path())
        .args(["--activate", "--env", "sandbox"])
        .env_remove("SCENARIO_ENVIRONMENT")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let outcome: Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(outcome["result"], "ERROR");

    let settings = fs::read_to_string(tmp.path().join("settings.yaml")).unwrap();
    assert!(settings.contains("production: false"));
}
