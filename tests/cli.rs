// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 handoff contributors

use assert_cmd::Command;
use predicates::prelude::*;

fn handoff(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("handoff").unwrap();
    cmd.current_dir(dir)
        .env_remove("HANDOFF_CONFIG")
        .env("NO_COLOR", "1")
        .env("RUST_LOG", "off");
    cmd
}

fn write_ppm(dir: &std::path::Path) -> std::path::PathBuf {
    let mut bytes = b"P6\n2 2\n255\n".to_vec();
    bytes.extend_from_slice(&[255, 255, 255, 0, 0, 0, 0, 0, 0, 255, 255, 255]);
    let path = dir.join("checker.ppm");
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    handoff(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("demo"));
}

#[test]
fn test_config_prints_defaults() {
    let dir = tempfile::tempdir().unwrap();
    handoff(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_blocking_threads: 64"))
        .stdout(predicate::str::contains("thread_name: handoff-consumer"));
}

#[test]
fn test_config_reads_local_toml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("handoff.toml"),
        "[compute]\nthreads = 3\n",
    )
    .unwrap();

    handoff(dir.path())
        .args(["config", "--format", "toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded from"))
        .stdout(predicate::str::contains("threads = 3"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("handoff.yaml"), "io:\n  worker_threads: 0\n").unwrap();

    handoff(dir.path())
        .args(["demo", "--runs", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("io.worker_threads must be at least 1"));
}

#[test]
fn test_run_local_image_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_ppm(dir.path());
    let output = dir.path().join("out.pgm");

    let assert = handoff(dir.path())
        .arg("run")
        .arg(&input)
        .args(["--filter", "invert", "--format", "json", "--output"])
        .arg(&output)
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["width"], 2);
    assert_eq!(report["height"], 2);
    assert_eq!(report["channels"], "rgb");
    assert_eq!(report["filter"], "invert");

    let written = std::fs::read(&output).unwrap();
    assert_eq!(
        report["digest"],
        blake3::hash(&written).to_hex().to_string()
    );
    assert!(written.ends_with(&[0, 0, 0, 255, 255, 255, 255, 255, 255, 0, 0, 0]));
}

#[test]
fn test_run_text_preview() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_ppm(dir.path());

    handoff(dir.path())
        .arg("run")
        .arg(&input)
        .args(["--width", "2"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("@ \n"))
        .stdout(predicate::str::contains("2x2 (gray)"));
}

#[test]
fn test_run_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    handoff(dir.path())
        .args(["run", "missing.ppm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Stage 'fetch' failed"));
}

#[test]
fn test_run_rejects_non_netpbm() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    handoff(dir.path())
        .args(["run", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported image format"));
}

#[test]
fn test_demo_delivers_every_run() {
    let dir = tempfile::tempdir().unwrap();
    handoff(dir.path())
        .args(["demo", "--runs", "10", "--delay-ms", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10 completed with the expected value"));
}

#[test]
fn test_watch_requires_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    handoff(dir.path())
        .args(["watch", "missing.ppm"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Image file not found"));
}
