//! Global constants for nginx-panel
//!
//! Centralized location for application-wide constants

/// Application identifier used in log targets and default paths
pub const APP_NAME: &str = "nginx-panel";

/// Default daemon category for structured logging
pub const DAEMON_CATEGORY: &str = "daemon";

/// Default location of the IPC socket
pub const DEFAULT_SOCKET_PATH: &str = "/run/nginx-panel/panel.sock";

/// Default nginx binary location
pub const DEFAULT_NGINX_BINARY: &str = "/usr/sbin/nginx";

/// Default directory holding nginx site configurations
pub const DEFAULT_NGINX_CONFIG_PATH: &str = "/etc/nginx/sites-available";

/// Default systemd unit name for nginx
pub const DEFAULT_SERVICE_NAME: &str = "nginx";

/// Default process name searched for with pgrep
pub const DEFAULT_PROCESS_NAME: &str = "nginx";

/// Default timeout applied to every external command, in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Upper bound accepted for the command timeout, in seconds
pub const MAX_COMMAND_TIMEOUT_SECS: u64 = 3600;

/// Number of log lines returned when the caller asks for none
pub const DEFAULT_LOG_LINES: i64 = 50;

/// Extension (compared case-insensitively) of listed configuration files
pub const CONFIG_EXTENSION: &str = ".conf";

/// Infix placed between a file path and its backup timestamp
pub const BACKUP_INFIX: &str = ".backup.";

/// chrono format of the backup timestamp (second granularity)
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Directory name convention for available sites
pub const SITES_AVAILABLE: &str = "sites-available";

/// Directory name convention for enabled sites
pub const SITES_ENABLED: &str = "sites-enabled";

/// Product token preceding the version in `nginx -v` output
pub const VERSION_TOKEN: &str = "nginx/";

/// Service manager binary
pub const SYSTEMCTL: &str = "systemctl";

/// Log aggregation binary
pub const JOURNALCTL: &str = "journalctl";

/// Process lookup binary
pub const PGREP: &str = "pgrep";

/// Event names emitted by the daemon logger
pub const EVENT_DAEMON_STARTUP: &str = "daemon_startup";
pub const EVENT_DAEMON_SHUTDOWN: &str = "daemon_shutdown";
pub const EVENT_REQUEST_HANDLED: &str = "request_handled";
pub const EVENT_CONFIG_WRITTEN: &str = "config_written";
pub const EVENT_ERROR: &str = "error";
