//! External command execution
//!
//! The lifecycle controller never spawns processes directly; it goes through
//! a [`CommandRunner`] so tests can substitute a recording fake while keeping
//! the exit-code/output contract.

use async_trait::async_trait;
use log::debug;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{PanelError, PanelResult};
use crate::models::CommandOutput;

/// Capability to run an external program and capture its combined output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// A non-zero exit is not an error at this level; it is reported through
    /// [`CommandOutput::exit_code`]. Errors mean the program could not be run
    /// at all or did not finish in time.
    async fn run(&self, program: &str, args: &[&str]) -> PanelResult<CommandOutput>;
}

/// Runs commands as real child processes, bounded by a timeout
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Render a command line for logs and error messages
pub fn describe(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> PanelResult<CommandOutput> {
        let command_line = describe(program, args);
        debug!("Running {}", command_line);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PanelError::Command {
                command: command_line.clone(),
                output: format!("failed to spawn: {}", e),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(PanelError::Command {
                    command: command_line,
                    output: format!("failed to collect output: {}", e),
                })
            }
            Err(_) => {
                return Err(PanelError::Command {
                    command: command_line,
                    output: format!("timed out after {}s", self.timeout.as_secs_f64()),
                })
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!("{} exited with {:?}", command_line, output.status.code());

        Ok(CommandOutput {
            exit_code: output.status.code(),
            output: combined,
        })
    }
}
