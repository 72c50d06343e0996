//! Error types for container runtime access

use thiserror::Error;

/// Result type alias for container runtime operations
pub type Result<T> = std::result::Result<T, DockerError>;

/// Container runtime errors
#[derive(Debug, Error)]
pub enum DockerError {
    /// The runtime binary is not on PATH
    #[error("'{0}' not found on PATH")]
    NotInstalled(String),

    /// A runtime command exited unsuccessfully
    #[error("{command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Runtime output could not be parsed
    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    /// No container with this id
    #[error("No such container: {0}")]
    NotFound(String),

    /// IO error while talking to the runtime
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DockerError {
    pub(crate) fn parse(what: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            what: what.into(),
            message: err.to_string(),
        }
    }
}
