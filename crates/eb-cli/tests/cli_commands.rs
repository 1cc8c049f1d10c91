//! Integration tests for the `eb` CLI commands.

#![allow(deprecated)] // Command::cargo_bin – macro replacement not yet stable

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn eb() -> Command {
    Command::cargo_bin("eb").unwrap()
}

fn json_output(args: &[&str]) -> serde_json::Value {
    let output = eb().args(args).output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_prints_tables() {
    eb().args(["run", "--ticks", "5"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Population")
                .and(predicate::str::contains("molecular"))
                .and(predicate::str::contains("Conservation Ledger"))
                .and(predicate::str::contains("System Failures")),
        );
}

#[test]
fn run_json_reports_statistics() {
    let doc = json_output(&["run", "--ticks", "3", "--seed", "7", "--json"]);
    assert_eq!(doc["seed"], 7);
    assert_eq!(doc["ticks"], 3);
    assert_eq!(doc["statistics"]["tick"], 3);
    assert_eq!(doc["statistics"]["state"], "ready");
    assert_eq!(doc["statistics"]["system_count"], 7);
    assert_eq!(doc["statistics"]["system_names"][0], "motion");
    assert!(doc["population"]["molecular"]["total"].as_u64().unwrap() > 0);
    assert!(doc["failures"].as_object().unwrap().is_empty());
}

#[test]
fn run_is_deterministic_for_a_seed() {
    let args = ["run", "--ticks", "5", "--seed", "11", "--json"];
    assert_eq!(json_output(&args), json_output(&args));
}

#[test]
fn run_reads_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.json");
    fs::write(
        &path,
        r#"{ "sim": { "seed": 5, "dt": 0.5 }, "laws": { "reaction": { "mode": "apply" } } }"#,
    )
    .unwrap();

    let doc = json_output(&["run", "--ticks", "2", "--json", "--config", path.to_str().unwrap()]);
    assert_eq!(doc["seed"], 5);
    assert_eq!(doc["dt"], 0.5);
}

#[test]
fn flags_override_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.json");
    fs::write(&path, r#"{ "sim": { "seed": 5 } }"#).unwrap();

    let doc = json_output(&[
        "run",
        "--ticks",
        "1",
        "--seed",
        "9",
        "--json",
        "--config",
        path.to_str().unwrap(),
    ]);
    assert_eq!(doc["seed"], 9);
}

#[test]
fn run_fails_on_malformed_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, "{ not json").unwrap();

    eb().args(["run", "--config", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn run_fails_on_missing_config() {
    eb().args(["run", "--config", "/nonexistent/run.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read config"));
}

#[test]
fn run_rejects_non_positive_dt() {
    eb().args(["run", "--dt", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dt must be positive"));
}

// ---------------------------------------------------------------------------
// systems
// ---------------------------------------------------------------------------

#[test]
fn systems_lists_pipeline_in_order() {
    let output = eb().arg("systems").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    let order = [
        "motion",
        "thermodynamics",
        "reaction",
        "aggregation",
        "metabolism",
        "ecology",
        "evolution",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|name| stdout.find(name).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{stdout}");
    assert!(stdout.contains("7 systems"));
}

#[test]
fn systems_shows_capabilities() {
    eb().arg("systems")
        .assert()
        .success()
        .stdout(predicate::str::contains("chemistry").and(predicate::str::contains("genome")));
}
