//! CLI argument parsing module
//!
//! Handles command-line interface using clap, including:
//! - `serve` to run the daemon and `check-config` to validate its configuration
//! - One client subcommand per panel operation
//! - Socket selection and raw JSON output

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use anyhow::{Result, anyhow};

use crate::constants::DEFAULT_SOCKET_PATH;
use crate::daemon::ipc::Operation;

/// What the binary was asked to do
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Run the daemon in the foreground
    Serve { config: Option<PathBuf> },
    /// Load and validate the daemon configuration, then exit
    CheckConfig { config: Option<PathBuf> },
    /// Talk to a running daemon
    Client {
        socket: PathBuf,
        json: bool,
        action: ClientAction,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    Send(Operation),
    /// Content comes from `source`, or stdin when unset
    Write {
        filename: String,
        source: Option<PathBuf>,
    },
}

fn version_string() -> &'static str {
    concat!(env!("NGINX_PANEL_VERSION"), " (", env!("GIT_HASH"), ")")
}

fn client_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("socket")
            .short('s')
            .long("socket")
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("Daemon socket path [env: NGINX_PANEL_SOCKET]")
    )
    .arg(
        Arg::new("json")
            .short('j')
            .long("json")
            .help("Print the raw JSON response")
            .action(ArgAction::SetTrue)
    )
}

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Path to the TOML configuration file")
}

/// Build the clap command tree
pub fn build_cli() -> Command {
    Command::new("nginx-panel")
        .version(version_string())
        .about("Administer a local nginx: edit configs, validate, reload, restart, read logs")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("serve")
                .about("Run the panel daemon in the foreground")
                .arg(config_arg())
        )
        .subcommand(
            Command::new("check-config")
                .about("Validate the daemon configuration file and exit")
                .arg(config_arg())
        )
        .subcommand(client_args(Command::new("health").about("Check that nginx is installed (exit 1 when not)")))
        .subcommand(client_args(Command::new("status").about("Show nginx installation and runtime status")))
        .subcommand(client_args(Command::new("configs").about("List configuration files")))
        .subcommand(client_args(
            Command::new("read")
                .about("Print a configuration file")
                .arg(Arg::new("filename").value_name("FILE").required(true).help("Bare configuration filename"))
        ))
        .subcommand(client_args(
            Command::new("write")
                .about("Replace a configuration file, backing up the previous content")
                .arg(Arg::new("filename").value_name("FILE").required(true).help("Bare configuration filename"))
                .arg(
                    Arg::new("from")
                        .short('f')
                        .long("from")
                        .value_name("PATH")
                        .value_parser(value_parser!(PathBuf))
                        .help("Read new content from PATH instead of stdin")
                )
        ))
        .subcommand(client_args(Command::new("validate").about("Run nginx -t")))
        .subcommand(client_args(Command::new("reload").about("Validate, then reload nginx")))
        .subcommand(client_args(Command::new("restart").about("Validate, then restart the nginx service")))
        .subcommand(client_args(
            Command::new("logs")
                .about("Show recent nginx journal lines")
                .arg(
                    Arg::new("lines")
                        .short('n')
                        .long("lines")
                        .value_name("N")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64))
                        .help("Number of lines (default 50)")
                )
        ))
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliCommand> {
    parse_from(std::env::args_os())
}

/// Parse an explicit argument list (first item is the binary name)
pub fn parse_from<I, T>(args: I) -> Result<CliCommand>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    // Prints help/version or the usage error and exits, like clap always does
    let matches = build_cli().get_matches_from(args);
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<CliCommand> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("A subcommand is required"))?;

    let config = || sub.get_one::<PathBuf>("config").cloned();

    let action = match name {
        "serve" => return Ok(CliCommand::Serve { config: config() }),
        "check-config" => return Ok(CliCommand::CheckConfig { config: config() }),
        "health" => ClientAction::Send(Operation::Health),
        "status" => ClientAction::Send(Operation::GetStatus),
        "configs" => ClientAction::Send(Operation::ListConfigs),
        "read" => ClientAction::Send(Operation::ReadConfig {
            filename: required(sub, "filename")?,
        }),
        "write" => ClientAction::Write {
            filename: required(sub, "filename")?,
            source: sub.get_one::<PathBuf>("from").cloned(),
        },
        "validate" => ClientAction::Send(Operation::ValidateConfig),
        "reload" => ClientAction::Send(Operation::Reload),
        "restart" => ClientAction::Send(Operation::Restart),
        "logs" => ClientAction::Send(Operation::GetLogs {
            lines: sub.get_one::<i64>("lines").copied(),
        }),
        other => return Err(anyhow!("Unknown subcommand: {}", other)),
    };

    Ok(CliCommand::Client {
        socket: resolve_socket(sub.get_one::<PathBuf>("socket").cloned()),
        json: sub.get_flag("json"),
        action,
    })
}

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow!("Missing required argument: {}", name))
}

/// `--socket`, then `NGINX_PANEL_SOCKET`, then the built-in default
fn resolve_socket(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| {
            std::env::var_os("NGINX_PANEL_SOCKET")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
}
