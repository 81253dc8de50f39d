//! Integration tests for the `modhunt` binary entry point.
//!
//! Verifies help output, usage errors, and listing a server whose archive
//! directory exists or is missing.

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn help_lists_commands() {
    let mut command = cargo_bin_cmd!("modhunt");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("modhunt"))
        .stdout(contains("restore"));
}

#[test]
fn unknown_command_exits_with_failure() {
    let mut command = cargo_bin_cmd!("modhunt");
    command.arg("bisect");
    command.assert().failure().code(1);
}

#[test]
fn list_reports_archives() {
    let root = TempDir::new().expect("create server root");
    let mods = root.path().join("mods");
    fs::create_dir(&mods).expect("create mods dir");
    fs::write(mods.join("alpha.jar"), b"").expect("write alpha.jar");
    fs::write(mods.join("beta.jar.disabled"), b"").expect("write beta.jar");

    let mut command = cargo_bin_cmd!("modhunt");
    command.arg("--server-root").arg(root.path()).arg("list");
    command
        .assert()
        .success()
        .stdout(contains("alpha.jar"))
        .stdout(contains("disabled beta.jar"));
}

#[test]
fn missing_server_root_is_reported() {
    let root = TempDir::new().expect("create scratch dir");
    let missing = root.path().join("absent");

    let mut command = cargo_bin_cmd!("modhunt");
    command.arg("--server-root").arg(&missing).arg("list");
    command
        .assert()
        .failure()
        .code(1)
        .stderr(contains("modhunt: cannot read archive directory"));
}
