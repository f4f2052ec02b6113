//! CLI integration tests for the simulate and completions commands

use assert_cmd::Command;
use predicates::prelude::*;

fn wisp() -> Command {
    Command::cargo_bin("wisp-rs").unwrap()
}

#[test]
fn test_simulate_prints_summary() {
    wisp()
        .args([
            "simulate",
            "--frames",
            "30",
            "--delta",
            "10",
            "--spawn-rate",
            "5",
            "--lifetime",
            "100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Simulation Summary"))
        .stdout(predicate::str::contains("Frames: 30"))
        .stdout(predicate::str::contains("Spawned: 150"))
        .stdout(predicate::str::contains("Peak active: 45"))
        .stdout(predicate::str::contains("Storage slots: 50"));
}

#[test]
fn test_simulate_sequential_mode() {
    wisp()
        .args(["simulate", "--frames", "5", "--sequential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mode: sequential"))
        .stdout(predicate::str::contains("Forked frames: 0"));
}

#[test]
fn test_simulate_reports_capacity_rejections() {
    wisp()
        .args([
            "simulate",
            "--frames",
            "4",
            "--spawn-rate",
            "20",
            "--max-particles",
            "30",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rejected spawns: 50"))
        .stdout(predicate::str::contains("Storage slots: 30"));
}

#[test]
fn test_quiet_suppresses_summary() {
    wisp()
        .args(["--quiet", "simulate", "--frames", "3"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_rejects_zero_lifetime() {
    wisp()
        .args(["simulate", "--lifetime", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--lifetime"));
}

#[test]
fn test_completions() {
    wisp()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wisp-rs"));
}
