use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_help_lists_operations() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("configs"))
        .stdout(predicate::str::contains("read"))
        .stdout(predicate::str::contains("write"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("reload"))
        .stdout(predicate::str::contains("restart"))
        .stdout(predicate::str::contains("logs"));
}

#[test]
fn test_logs_help_describes_lines() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.args(["logs", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--lines"))
        .stdout(predicate::str::contains("--socket"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_version_prints_semantic_version() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::is_match(r"nginx-panel \d+\.\d+\.\d+").unwrap());
}

#[test]
fn test_missing_subcommand_shows_usage() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_client_without_daemon_fails_cleanly() {
    let temp_dir = tempdir().unwrap();
    let socket = temp_dir.path().join("absent.sock");

    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.args(["status", "--socket", socket.to_str().unwrap()]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to connect"));
}
