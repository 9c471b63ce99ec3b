//! Error kinds surfaced by the config store and lifecycle controller

use thiserror::Error;

/// Errors returned by a single panel operation.
///
/// Every variant carries the underlying diagnostic text verbatim so the
/// operator sees raw tool output instead of a generic message.
#[derive(Error, Debug)]
pub enum PanelError {
    /// Malformed filename, e.g. a path traversal attempt
    #[error("invalid filename: {0}")]
    InvalidInput(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Pre-flight `nginx -t` failed
    #[error("config validation failed: {0}")]
    ConfigInvalid(String),

    /// External process exited non-zero, could not be spawned, or timed out
    #[error("{command} failed: {output}")]
    Command { command: String, output: String },
}

impl PanelError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PanelError::Io {
            context: context.into(),
            source,
        }
    }

    /// HTTP-equivalent status code for the request layer
    pub fn status_code(&self) -> u16 {
        match self {
            PanelError::InvalidInput(_) => 400,
            PanelError::NotFound(_) => 404,
            PanelError::Io { .. } | PanelError::ConfigInvalid(_) | PanelError::Command { .. } => 500,
        }
    }
}

pub type PanelResult<T> = std::result::Result<T, PanelError>;
