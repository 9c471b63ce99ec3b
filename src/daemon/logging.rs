//! Structured logging for daemon operations
//!
//! Events are emitted through the `log` facade as a human message followed
//! by a JSON payload; `env_logger` writes them to stderr where journald
//! picks them up.

use anyhow::{anyhow, Result};
use log::{error, info, warn};
use serde_json::json;
use std::path::Path;

use crate::constants::{
    EVENT_CONFIG_WRITTEN, EVENT_DAEMON_SHUTDOWN, EVENT_DAEMON_STARTUP, EVENT_ERROR,
    EVENT_REQUEST_HANDLED,
};

/// Install `env_logger` as the `log` backend.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(level: &str) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| anyhow!("Failed to set logger: {}", e))
}

/// Daemon logger emitting structured events
#[derive(Debug, Clone)]
pub struct DaemonLogger {
    category: String,
}

/// Severity of a structured event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
}

impl LogLevel {
    /// Server-side failures are errors, rejected requests are warnings
    pub fn for_code(code: u16) -> Self {
        if code >= 500 {
            LogLevel::Error
        } else if code >= 400 {
            LogLevel::Warn
        } else {
            LogLevel::Info
        }
    }
}

impl DaemonLogger {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }

    /// Log daemon startup event
    pub fn log_startup(&self, config_path: Option<&Path>, socket_path: &Path, pid: u32) {
        let message = json!({
            "event": EVENT_DAEMON_STARTUP,
            "pid": pid,
            "config_path": config_path.map(|p| p.display().to_string()),
            "socket_path": socket_path.display().to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Daemon started", &message);
    }

    /// Log daemon shutdown event
    pub fn log_shutdown(&self, reason: &str) {
        let message = json!({
            "event": EVENT_DAEMON_SHUTDOWN,
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Daemon shutting down", &message);
    }

    /// Log one handled request with its HTTP-equivalent code
    pub fn log_request(&self, request_id: &str, route: &str, code: u16, duration_ms: u128) {
        let message = json!({
            "event": EVENT_REQUEST_HANDLED,
            "request_id": request_id,
            "route": route,
            "code": code,
            "duration_ms": duration_ms,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::for_code(code), &format!("{} -> {}", route, code), &message);
    }

    /// Log a successful config write and its backup
    pub fn log_config_written(&self, path: &Path, backup: Option<&Path>) {
        let message = json!({
            "event": EVENT_CONFIG_WRITTEN,
            "path": path.display().to_string(),
            "backup": backup.map(|p| p.display().to_string()),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(
            LogLevel::Info,
            &format!("Configuration written: {}", path.display()),
            &message,
        );
    }

    /// Log error events
    pub fn log_error(&self, error_message: &str, context: Option<&str>) {
        let message = json!({
            "event": EVENT_ERROR,
            "message": error_message,
            "context": context,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Error, error_message, &message);
    }

    fn log_structured(&self, level: LogLevel, message: &str, data: &serde_json::Value) {
        let full_message = format!("{} | {}", message, data);
        let target = self.category.as_str();

        match level {
            LogLevel::Error => error!(target: target, "{}", full_message),
            LogLevel::Warn => warn!(target: target, "{}", full_message),
            LogLevel::Info => info!(target: target, "{}", full_message),
        }
    }
}
