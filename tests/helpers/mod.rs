#![allow(dead_code)]

use async_trait::async_trait;
use nginx_panel::daemon::config::{NginxSettings, PanelConfiguration};
use nginx_panel::models::CommandOutput;
use nginx_panel::runner::{describe, CommandRunner};
use nginx_panel::{PanelError, PanelResult};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Command runner that records every invocation and replays scripted results.
///
/// Commands without a scripted result exit 0 with empty output.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, CommandOutput>>,
    unavailable: Mutex<HashSet<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of an exact command line
    pub fn respond(&self, command_line: &str, exit_code: i32, output: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command_line.to_string(), CommandOutput::new(exit_code, output));
        self
    }

    /// Make an exact command line fail to spawn
    pub fn unavailable(&self, command_line: &str) -> &Self {
        self.unavailable.lock().unwrap().insert(command_line.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> PanelResult<CommandOutput> {
        let command_line = describe(program, args);
        self.calls.lock().unwrap().push(command_line.clone());

        if self.unavailable.lock().unwrap().contains(&command_line) {
            return Err(PanelError::Command {
                command: command_line,
                output: "failed to spawn: No such file or directory (os error 2)".to_string(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&command_line)
            .cloned()
            .unwrap_or_else(|| CommandOutput::new(0, "")))
    }
}

/// Temporary nginx layout: `sites-available`, `sites-enabled` and a fake binary
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    /// Layout with a (non-executable) file standing in for the nginx binary
    pub fn new() -> Self {
        let env = Self::without_binary();
        fs::write(env.binary(), "#!/bin/sh\n").unwrap();
        env
    }

    /// Layout where the nginx binary does not exist
    pub fn without_binary() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp_dir.path().join("sites-available")).unwrap();
        fs::create_dir_all(temp_dir.path().join("sites-enabled")).unwrap();
        fs::create_dir_all(temp_dir.path().join("sbin")).unwrap();
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn available(&self) -> PathBuf {
        self.path().join("sites-available")
    }

    pub fn enabled(&self) -> PathBuf {
        self.path().join("sites-enabled")
    }

    pub fn binary(&self) -> PathBuf {
        self.path().join("sbin").join("nginx")
    }

    pub fn socket(&self) -> PathBuf {
        self.path().join("run").join("panel.sock")
    }

    /// `<binary> <args>` as recorded by [`FakeRunner`]
    pub fn nginx_cmd(&self, args: &str) -> String {
        format!("{} {}", self.binary().display(), args)
    }

    pub fn write_config(&self, name: &str, content: &str) -> PathBuf {
        let path = self.available().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn enable(&self, name: &str) {
        fs::write(self.enabled().join(name), "").unwrap();
    }

    pub fn settings(&self) -> NginxSettings {
        NginxSettings {
            binary: self.binary(),
            config_path: self.available(),
            ..NginxSettings::default()
        }
    }

    pub fn configuration(&self) -> PanelConfiguration {
        let mut config = PanelConfiguration::default();
        config.nginx = self.settings();
        config.server.socket_path = self.socket();
        config
    }

    /// Every backup file written next to `name`
    pub fn backups_of(&self, name: &str) -> Vec<PathBuf> {
        let prefix = format!("{}.backup.", name);
        let mut backups: Vec<PathBuf> = fs::read_dir(self.available())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .map(|e| e.path())
            .collect();
        backups.sort();
        backups
    }
}
