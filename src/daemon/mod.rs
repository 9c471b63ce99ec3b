//! Daemon module for serving the panel over a local socket
//!
//! This module provides functionality to run nginx-panel as a daemon:
//! - Configuration management (TOML file plus environment overrides)
//! - Inter-process communication with CLI clients
//! - Structured logging of requests and lifecycle events

pub mod config;
pub mod ipc;
pub mod logging;

use anyhow::{Context, Result};
use log::warn;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};

use crate::constants::DAEMON_CATEGORY;
use crate::daemon::config::PanelConfiguration;
use crate::daemon::ipc::IpcServer;
use crate::daemon::logging::{init_logging, DaemonLogger};
use crate::lifecycle::NginxController;
use crate::runner::{CommandRunner, SystemRunner};
use crate::store::ConfigStore;

/// Shared, immutable daemon state handed to every connection
pub struct PanelState {
    pub store: Arc<ConfigStore>,
    pub controller: Arc<NginxController>,
    pub logger: DaemonLogger,
}

impl PanelState {
    /// Build state from configuration using the real command runner
    pub fn new(config: &PanelConfiguration) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(config.command_timeout()));
        Self::with_runner(config, runner)
    }

    /// Build state with an explicit command runner
    pub fn with_runner(config: &PanelConfiguration, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            store: Arc::new(ConfigStore::new(&config.nginx)),
            controller: Arc::new(NginxController::new(&config.nginx, runner)),
            logger: DaemonLogger::new(DAEMON_CATEGORY),
        }
    }
}

/// Run the daemon in the foreground until SIGINT/SIGTERM
pub async fn run_daemon(config_path: Option<PathBuf>) -> Result<()> {
    let config = PanelConfiguration::load(config_path.as_deref())?;
    init_logging(&config.logging.level)?;
    for warning in config.path_warnings() {
        warn!("{}", warning);
    }

    config
        .ensure_directories()
        .context("Failed to create required directories")?;

    let state = Arc::new(PanelState::new(&config));

    let mut server = IpcServer::new(config.server.socket_path.clone());
    server.bind()?;

    state.logger.log_startup(
        config_path.as_deref(),
        server.socket_path(),
        std::process::id(),
    );

    let result = tokio::select! {
        reason = shutdown_signal() => {
            state.logger.log_shutdown(reason);
            Ok(())
        }
        served = server.serve(state.clone()) => {
            state.logger.log_shutdown("IPC server ended");
            served
        }
    };

    server.stop()?;
    result
}

/// Resolve when the process is asked to stop, naming the signal
async fn shutdown_signal() -> &'static str {
    let mut term = match unix_signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(_) => {
            let _ = signal::ctrl_c().await;
            return "Received SIGINT";
        }
    };

    tokio::select! {
        _ = signal::ctrl_c() => "Received SIGINT",
        _ = term.recv() => "Received SIGTERM",
    }
}

/// Check that a configuration file loads and validates
pub fn check_configuration(config_path: Option<&Path>) -> Result<PanelConfiguration> {
    PanelConfiguration::load(config_path)
        .with_context(|| match config_path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load default configuration".to_string(),
        })
}
