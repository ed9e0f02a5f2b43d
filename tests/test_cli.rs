//! CLI smoke tests: config validation and template generation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn check_accepts_valid_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("fleetgate.yaml");
    std::fs::write(&config_path, include_str!("fixtures/test_config.yaml")).unwrap();

    Command::cargo_bin("fleetgate")
        .unwrap()
        .arg("check")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"))
        .stdout(predicate::str::contains("wipe_disk"));
}

#[test]
fn check_rejects_bad_tier() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("fleetgate.yaml");
    std::fs::write(
        &config_path,
        r#"
gateway: bad
self_host: gw
actions:
  - name: vm_status
    tier: maybe
    description: x
"#,
    )
    .unwrap();

    Command::cargo_bin("fleetgate")
        .unwrap()
        .arg("check")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tier"));
}

#[test]
fn check_missing_file_fails_cleanly() {
    Command::cargo_bin("fleetgate")
        .unwrap()
        .arg("check")
        .arg("/nonexistent/fleetgate.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn init_writes_a_parseable_template() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("fleetgate.yaml");

    Command::cargo_bin("fleetgate")
        .unwrap()
        .arg("init")
        .arg("--template")
        .arg("pve-fleet")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    // The generated file passes its own validation.
    Command::cargo_bin("fleetgate")
        .unwrap()
        .arg("check")
        .arg(&output)
        .assert()
        .success();
}

#[test]
fn init_unknown_template_lists_alternatives() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("fleetgate.yaml");

    Command::cargo_bin("fleetgate")
        .unwrap()
        .arg("init")
        .arg("--template")
        .arg("galactic")
        .arg("--output")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("pve-fleet"));
}
