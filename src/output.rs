//! Output formatting module
//!
//! Handles:
//! - Human-readable rendering of daemon responses for each CLI subcommand
//! - Raw JSON passthrough for scripting (`--json`)

use anyhow::{Context, Result};
use serde_json::Value;

use crate::daemon::ipc::{IpcResponse, Operation};
use crate::models::{ConfigFile, ServiceStatus};

/// Render a response the way the user asked for it
pub fn render(operation: &Operation, response: &IpcResponse, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(response).context("Failed to encode response");
    }

    match response {
        IpcResponse::Error {
            message, details, ..
        } => Ok(format_error(message, details.as_deref())),
        IpcResponse::Success { data, message, .. } => match (operation, data) {
            (Operation::Health, Some(data)) => Ok(format_health(data)),
            (Operation::GetStatus, Some(data)) => {
                let status: ServiceStatus =
                    serde_json::from_value(data.clone()).context("Malformed status payload")?;
                Ok(format_status(&status))
            }
            (Operation::ListConfigs, Some(data)) => {
                let configs: Vec<ConfigFile> = serde_json::from_value(
                    data.get("configs").cloned().unwrap_or(Value::Array(Vec::new())),
                )
                .context("Malformed config list payload")?;
                Ok(format_config_list(&configs))
            }
            (Operation::ReadConfig { .. }, Some(data)) => Ok(text_field(data, "content")),
            (Operation::GetLogs { .. }, Some(data)) => Ok(text_field(data, "logs")),
            (Operation::ValidateConfig, Some(_)) => Ok("✅ Configuration is valid".to_string()),
            (_, _) => Ok(format!("✅ {}", message.as_deref().unwrap_or("Done"))),
        },
    }
}

/// Format a failure with the raw diagnostic indented below it
pub fn format_error(message: &str, details: Option<&str>) -> String {
    let mut out = format!("❌ {}", message);
    if let Some(details) = details.filter(|d| !d.trim().is_empty()) {
        for line in details.trim_end().lines() {
            out.push_str("\n   ");
            out.push_str(line);
        }
    }
    out
}

fn format_health(data: &Value) -> String {
    let state = text_field(data, "status");
    match data.get("nginx").and_then(|n| n.get("version")).and_then(Value::as_str) {
        Some(version) if !version.is_empty() => format!("✅ {} (nginx {})", state, version),
        _ => format!("✅ {}", state),
    }
}

pub fn format_status(status: &ServiceStatus) -> String {
    if !status.is_installed {
        return "nginx:    not installed".to_string();
    }

    let mut out = String::new();
    out.push_str("nginx:    installed\n");
    out.push_str(&format!(
        "version:  {}\n",
        if status.version.is_empty() { "unknown" } else { status.version.as_str() }
    ));
    out.push_str(&format!(
        "running:  {}\n",
        if status.is_running { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "config:   {}",
        if status.config_valid { "valid" } else { "INVALID" }
    ));
    if let Some(ref error) = status.config_error {
        for line in error.trim_end().lines() {
            out.push_str("\n   ");
            out.push_str(line);
        }
    }
    out
}

pub fn format_config_list(configs: &[ConfigFile]) -> String {
    if configs.is_empty() {
        return "No configuration files found.".to_string();
    }

    let width = configs.iter().map(|c| c.name.len()).max().unwrap_or(0).max(4);
    let mut out = format!("{:<width$}  {:>8}  {:<20}  ACTIVE", "NAME", "SIZE", "MODIFIED");
    for config in configs {
        out.push_str(&format!(
            "\n{:<width$}  {:>8}  {:<20}  {}",
            config.name,
            config.size,
            config.modified_time.format("%Y-%m-%d %H:%M:%S"),
            if config.is_active { "yes" } else { "no" },
        ));
    }
    out
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
