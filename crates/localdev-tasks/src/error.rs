//! Error types for command execution and health checks

use thiserror::Error;

use localdev_docker::DockerError;

/// Errors that stop the whole run
#[derive(Debug, Error)]
pub enum ExecError {
    /// The command string could not be tokenized (unbalanced quotes)
    #[error("Cannot parse command '{command}': unbalanced quote or trailing escape")]
    Parse { command: String },

    /// The command resolved to nothing
    #[error("Command for project '{project}' is empty")]
    EmptyCommand { project: String },

    /// The process could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process failed
    #[error("Failed waiting for '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while checking container health
#[derive(Debug, Error)]
pub enum HealthError {
    /// The runtime could not tell whether the container has a health check
    #[error("Cannot inspect container {container}: {source}")]
    Inspect {
        container: String,
        #[source]
        source: DockerError,
    },
}
