//! nginx lifecycle control
//!
//! Handles:
//! - Installation/running/version probing for the status view
//! - Syntax validation with `nginx -t`
//! - Validate-before-apply reload and restart
//! - Log retrieval through journald

use log::{debug, info, warn};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

use crate::constants::{DEFAULT_LOG_LINES, JOURNALCTL, PGREP, SYSTEMCTL, VERSION_TOKEN};
use crate::daemon::config::NginxSettings;
use crate::error::{PanelError, PanelResult};
use crate::models::{ServiceStatus, ValidationResult};
use crate::runner::{describe, CommandRunner};

/// Drives nginx through its binary, systemd and journald
pub struct NginxController {
    binary: PathBuf,
    service_name: String,
    process_name: String,
    runner: Arc<dyn CommandRunner>,
    /// Held for the whole validate-then-apply sequence of reload/restart
    lifecycle_lock: Mutex<()>,
}

impl NginxController {
    pub fn new(settings: &NginxSettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary: settings.binary.clone(),
            service_name: settings.service_name.clone(),
            process_name: settings.process_name.clone(),
            runner,
            lifecycle_lock: Mutex::new(()),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Build a status snapshot. Never fails: a failing probe only degrades
    /// its own field.
    pub async fn check_installation(&self) -> ServiceStatus {
        if !self.binary.exists() {
            debug!("nginx binary {} not present", self.binary.display());
            return ServiceStatus::default();
        }

        let version = self.version().await.unwrap_or_default();
        let is_running = self.is_running().await;
        let validation = self.validate_config().await;

        ServiceStatus {
            is_installed: true,
            is_running,
            version,
            config_valid: validation.valid,
            config_error: validation.message.filter(|m| !m.is_empty()),
            last_reload: None,
        }
    }

    /// Run `nginx -t`. Has no effect on the running daemon.
    pub async fn validate_config(&self) -> ValidationResult {
        match self.runner.run(&self.binary_str(), &["-t"]).await {
            Ok(output) if output.success() => ValidationResult::valid(),
            Ok(output) => ValidationResult::invalid(output.output),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }

    /// Validate, then `nginx -s reload`
    pub async fn reload(&self) -> PanelResult<()> {
        let _guard = self.lifecycle_lock.lock().await;

        self.ensure_valid().await?;
        self.run_checked(&self.binary_str(), &["-s", "reload"]).await?;

        info!("nginx reloaded");
        Ok(())
    }

    /// Validate, then stop and start the systemd unit.
    ///
    /// If stop succeeds and start fails nginx is left stopped.
    pub async fn restart(&self) -> PanelResult<()> {
        let _guard = self.lifecycle_lock.lock().await;

        self.ensure_valid().await?;
        self.run_checked(SYSTEMCTL, &["stop", self.service_name.as_str()]).await?;
        if let Err(e) = self.run_checked(SYSTEMCTL, &["start", self.service_name.as_str()]).await {
            warn!("{} was stopped but failed to start again", self.service_name);
            return Err(e);
        }

        info!("{} restarted", self.service_name);
        Ok(())
    }

    /// Most recent `lines` journal lines of the unit; non-positive means 50
    pub async fn get_logs(&self, lines: i64) -> PanelResult<String> {
        let lines = if lines <= 0 { DEFAULT_LOG_LINES } else { lines };
        let count = lines.to_string();

        self.run_checked(
            JOURNALCTL,
            &["-u", self.service_name.as_str(), "-n", count.as_str(), "--no-pager"],
        )
        .await
    }

    async fn ensure_valid(&self) -> PanelResult<()> {
        let validation = self.validate_config().await;
        if validation.valid {
            Ok(())
        } else {
            Err(PanelError::ConfigInvalid(validation.message().to_string()))
        }
    }

    /// Run a command and turn a non-zero exit into [`PanelError::Command`]
    async fn run_checked(&self, program: &str, args: &[&str]) -> PanelResult<String> {
        let output = self.runner.run(program, args).await?;
        if output.success() {
            Ok(output.output)
        } else {
            Err(PanelError::Command {
                command: describe(program, args),
                output: output.output,
            })
        }
    }

    async fn version(&self) -> Option<String> {
        match self.runner.run(&self.binary_str(), &["-v"]).await {
            Ok(output) if output.success() => Some(parse_version(&output.output)),
            Ok(output) => {
                debug!("nginx -v exited with {:?}", output.exit_code);
                None
            }
            Err(e) => {
                debug!("nginx -v failed: {}", e);
                None
            }
        }
    }

    /// Lookup errors count as not running
    async fn is_running(&self) -> bool {
        match self.runner.run(PGREP, &[self.process_name.as_str()]).await {
            Ok(output) => output.success(),
            Err(e) => {
                debug!("pgrep failed: {}", e);
                false
            }
        }
    }

    fn binary_str(&self) -> String {
        self.binary.to_string_lossy().into_owned()
    }
}

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| {
        Regex::new(&format!(r"{}(\S+)", regex::escape(VERSION_TOKEN)))
            .expect("static version pattern")
    })
}

/// Extract the version from `nginx -v` output.
///
/// `nginx version: nginx/1.24.0 (Ubuntu)` yields `1.24.0`; output without
/// the product token is returned trimmed.
pub fn parse_version(output: &str) -> String {
    match version_regex().captures(output).and_then(|caps| caps.get(1)) {
        Some(version) => version.as_str().to_string(),
        None => output.trim().to_string(),
    }
}
