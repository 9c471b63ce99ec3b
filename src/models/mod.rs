//! Data models module
//!
//! Defines core data structures:
//! - ConfigFile: one configuration file as seen on disk at query time
//! - ServiceStatus: observed state of the managed nginx daemon
//! - ValidationResult: outcome of `nginx -t`
//! - CommandOutput: exit code and combined output of an external command

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A configuration file found under the configured directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Base filename only
    pub name: String,
    /// Absolute path to the file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    pub modified_time: DateTime<Utc>,
    /// Whether a same-named file exists in the enabled directory
    pub is_active: bool,
}

/// Current observed state of nginx, rebuilt on every status query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub is_installed: bool,
    pub is_running: bool,
    /// Version reported by `nginx -v`, empty if unknown
    pub version: String,
    pub config_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_error: Option<String>,
    /// Part of the status shape but never populated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reload: Option<DateTime<Utc>>,
}

/// Result of running the daemon's syntax test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Captured tool output, present only when invalid
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }

    /// Diagnostic text, empty when the configuration is valid
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

/// Exit status and combined stdout/stderr of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
