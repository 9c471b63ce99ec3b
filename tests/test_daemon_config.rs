//! Daemon configuration tests: TOML parsing, validation bounds, CLI check

use nginx_panel::daemon::config::PanelConfiguration;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_example_configuration_parses() {
    let example = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/nginx-panel.example.toml");
    let config = PanelConfiguration::load_from_file(&example).unwrap();

    assert_eq!(config.server.command_timeout_secs, 30);
    assert_eq!(config.nginx.binary, PathBuf::from("/usr/sbin/nginx"));
    assert_eq!(config.nginx.service_name, "nginx");
    assert_eq!(config.nginx.max_backups, None);
    assert_eq!(config.nginx.enabled_dir(), Some(PathBuf::from("/etc/nginx/sites-enabled")));
}

#[test]
fn test_partial_configuration_uses_defaults() {
    let config = PanelConfiguration::from_toml(
        r#"
[nginx]
config_path = "/etc/nginx/conf.d"
max_backups = 5
"#,
    )
    .unwrap();

    assert_eq!(config.nginx.config_path, PathBuf::from("/etc/nginx/conf.d"));
    assert_eq!(config.nginx.max_backups, Some(5));
    assert_eq!(config.nginx.binary, PathBuf::from("/usr/sbin/nginx"));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.server.command_timeout_secs, 30);
}

#[test]
fn test_wrong_type_is_rejected() {
    let err = PanelConfiguration::from_toml(
        r#"
[server]
command_timeout_secs = "soon"
"#,
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse TOML"));
}

#[test]
fn test_timeout_upper_bound() {
    let err = PanelConfiguration::from_toml("[server]\ncommand_timeout_secs = 3601\n").unwrap_err();
    assert!(format!("{:#}", err).contains("Must be between 1 and 3600"));
}

#[test]
fn test_empty_service_name_is_rejected() {
    let err = PanelConfiguration::from_toml("[nginx]\nservice_name = \"  \"\n").unwrap_err();
    assert!(format!("{:#}", err).contains("service_name"));
}

#[test]
fn test_explicit_missing_file_is_error() {
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("absent.toml");

    let err = PanelConfiguration::load(Some(&missing)).unwrap_err();
    assert!(format!("{:#}", err).contains("Configuration file not found"));
}

#[test]
fn test_check_config_command_accepts_valid_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("panel.toml");
    let available = temp_dir.path().join("sites-available");
    fs::create_dir_all(&available).unwrap();

    fs::write(
        &config_path,
        format!(
            "[server]\nsocket_path = \"{}\"\n\n[nginx]\nconfig_path = \"{}\"\n",
            temp_dir.path().join("panel.sock").display(),
            available.display()
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.args(["check-config", "--config", config_path.to_str().unwrap()])
        .env_remove("NGINX_CONFIG_PATH")
        .env_remove("NGINX_PANEL_SOCKET")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("sites-enabled"));
}

#[test]
fn test_check_config_command_rejects_invalid_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[logging]\nlevel = \"chatty\"\n").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.args(["check-config", "--config", config_path.to_str().unwrap()])
        .env_remove("LOG_LEVEL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

#[test]
fn test_check_config_reports_missing_nginx_paths() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("panel.toml");
    let binary = temp_dir.path().join("no-such-nginx");
    let sites = temp_dir.path().join("no-such-sites");

    fs::write(
        &config_path,
        format!(
            "[nginx]\nbinary = \"{}\"\nconfig_path = \"{}\"\n",
            binary.display(),
            sites.display()
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("nginx-panel");
    cmd.args(["check-config", "--config", config_path.to_str().unwrap()])
        .env_remove("NGINX_CONFIG_PATH")
        .env_remove("NGINX_BINARY")
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("nginx config path does not exist"))
        .stdout(predicate::str::contains("nginx binary not found"));
}
