//! nginx-panel - local administration of a system-installed nginx
//!
//! This library exposes the configuration store, the lifecycle controller
//! and the daemon/IPC layer that serves them to the CLI.

pub mod cli;
pub mod client;
pub mod constants;
pub mod daemon;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod output;
pub mod runner;
pub mod store;

pub use error::{PanelError, PanelResult};
pub use lifecycle::NginxController;
pub use runner::{CommandRunner, SystemRunner};
pub use store::ConfigStore;
