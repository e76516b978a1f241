// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exit-code behaviour of the `uiprobed` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn help_prints_usage() {
    Command::cargo_bin("uiprobed")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--no-startup"));
}

#[test]
fn malformed_config_exits_with_one() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "connection = \"not a table\"").unwrap();
    Command::cargo_bin("uiprobed")
        .unwrap()
        .arg("--config")
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("daemon starting failure"));
}

#[test]
fn invalid_log_level_exits_with_one() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "log_level = \"loud\"").unwrap();
    Command::cargo_bin("uiprobed")
        .unwrap()
        .arg("--config")
        .arg(file.path())
        .arg("--no-startup")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("daemon starting failure"));
}

#[test]
fn failing_startup_script_exits_with_one() {
    let scripts = tempfile::tempdir().unwrap();
    std::fs::write(scripts.path().join("00-fail.sh"), "exit 7\n").unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[startup]\nscripts_dir = \"{}\"",
        scripts.path().display()
    )
    .unwrap();
    Command::cargo_bin("uiprobed")
        .unwrap()
        .arg("--config")
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("daemon starting failure"));
}
