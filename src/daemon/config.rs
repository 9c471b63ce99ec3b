//! Configuration management for daemon mode
//!
//! Handles TOML configuration parsing, environment overrides and validation

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    APP_NAME, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_NGINX_BINARY, DEFAULT_NGINX_CONFIG_PATH,
    DEFAULT_PROCESS_NAME, DEFAULT_SERVICE_NAME, DEFAULT_SOCKET_PATH, MAX_COMMAND_TIMEOUT_SECS,
    SITES_AVAILABLE, SITES_ENABLED,
};

/// Main daemon configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfiguration {
    pub server: ServerSettings,
    pub nginx: NginxSettings,
    pub logging: LoggingSettings,
}

/// IPC server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Unix domain socket the daemon listens on
    pub socket_path: PathBuf,
    /// Timeout applied to every external command, in seconds (1-3600)
    pub command_timeout_secs: u64,
}

/// Where nginx lives and how it is supervised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NginxSettings {
    /// Path to the nginx binary
    pub binary: PathBuf,
    /// Directory holding the editable `*.conf` files
    pub config_path: PathBuf,
    /// Directory whose entries mark a config as active; derived when unset
    pub enabled_path: Option<PathBuf>,
    /// systemd unit name used for restart and log retrieval
    pub service_name: String,
    /// Process name looked up with pgrep
    pub process_name: String,
    /// Keep only this many backups per file; unset keeps all of them
    pub max_backups: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// error, warn, info, debug or trace
    pub level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

impl Default for NginxSettings {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_NGINX_BINARY),
            config_path: PathBuf::from(DEFAULT_NGINX_CONFIG_PATH),
            enabled_path: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            max_backups: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NginxSettings {
    /// Directory checked for the active flag.
    ///
    /// An explicit `enabled_path` wins; otherwise a config directory named
    /// `sites-available` maps to its sibling `sites-enabled`.
    pub fn enabled_dir(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.enabled_path {
            return Some(path.clone());
        }

        let name = self.config_path.file_name()?;
        if name == SITES_AVAILABLE {
            self.config_path.parent().map(|parent| parent.join(SITES_ENABLED))
        } else {
            None
        }
    }
}

impl PanelConfiguration {
    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration for the daemon.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise. Environment overrides
    /// are applied last.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => {
                if !path.exists() {
                    bail!("Configuration file not found: {}", path.display());
                }
                Self::load_from_file(path)?
            }
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::load_from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file location (`~/.config/nginx-panel/config.toml`)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine configuration directory")?;
        Ok(config_dir.join(APP_NAME).join("config.toml"))
    }

    /// Apply environment-style overrides through a lookup function
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("NGINX_CONFIG_PATH") {
            self.nginx.config_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("NGINX_BINARY") {
            self.nginx.binary = PathBuf::from(value);
        }
        if let Some(value) = lookup("NGINX_SERVICE_NAME") {
            self.nginx.service_name = value;
        }
        if let Some(value) = lookup("NGINX_PANEL_SOCKET") {
            self.server.socket_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("LOG_LEVEL") {
            self.logging.level = value;
        }
    }

    /// Validate configuration values.
    ///
    /// Missing nginx paths are not errors; see [`Self::path_warnings`].
    pub fn validate(&self) -> Result<()> {
        if self.server.command_timeout_secs == 0
            || self.server.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS
        {
            bail!(
                "Invalid command timeout: {}. Must be between 1 and {} seconds",
                self.server.command_timeout_secs,
                MAX_COMMAND_TIMEOUT_SECS
            );
        }

        if self.nginx.binary.as_os_str().is_empty() {
            bail!("nginx.binary must not be empty");
        }

        if self.nginx.service_name.trim().is_empty() {
            bail!("nginx.service_name must not be empty");
        }

        if self.nginx.process_name.trim().is_empty() {
            bail!("nginx.process_name must not be empty");
        }

        if log::LevelFilter::from_str(&self.logging.level).is_err() {
            bail!("Invalid log level: {}", self.logging.level);
        }

        Ok(())
    }

    /// Non-fatal problems with the nginx paths.
    ///
    /// The daemon still starts with these and reports `is_installed = false`.
    /// Callers emit them once a log backend is installed.
    pub fn path_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.nginx.config_path.exists() {
            warnings.push(format!(
                "nginx config path does not exist: {}",
                self.nginx.config_path.display()
            ));
        }

        if !self.nginx.binary.exists() {
            warnings.push(format!("nginx binary not found at: {}", self.nginx.binary.display()));
        }

        warnings
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.server.command_timeout_secs)
    }

    /// Ensure the socket directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        if let Some(parent) = self.server.socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {}", parent.display()))?;
        }
        Ok(())
    }
}
