#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::io::Read;
use std::process::ExitCode;

use nginx_panel::cli::{self, ClientAction, CliCommand};
use nginx_panel::daemon::{self, ipc::Operation};
use nginx_panel::{client, output};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    match cli::parse_args()? {
        CliCommand::Serve { config } => {
            daemon::run_daemon(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::CheckConfig { config } => {
            let loaded = daemon::check_configuration(config.as_deref())?;
            println!("✅ Configuration is valid");
            println!("  Socket: {}", loaded.server.socket_path.display());
            println!("  nginx binary: {}", loaded.nginx.binary.display());
            println!("  Config directory: {}", loaded.nginx.config_path.display());
            match loaded.nginx.enabled_dir() {
                Some(dir) => println!("  Enabled directory: {}", dir.display()),
                None => println!("  Enabled directory: (none, all configs reported inactive)"),
            }
            for warning in loaded.path_warnings() {
                println!("⚠️  {}", warning);
            }
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Client { socket, json, action } => {
            let operation = match action {
                ClientAction::Send(operation) => operation,
                ClientAction::Write { filename, source } => Operation::WriteConfig {
                    filename,
                    content: read_content(source.as_deref())?,
                },
            };

            let response = client::send_request(&socket, operation.clone()).await?;
            let rendered = output::render(&operation, &response, json)?;

            if response.is_success() {
                println!("{}", rendered);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}", rendered);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

/// New file content from a path, or stdin when none is given
fn read_content(source: Option<&std::path::Path>) -> Result<String> {
    match source {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read content from stdin")?;
            Ok(content)
        }
    }
}
