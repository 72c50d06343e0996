//! Error types for localdev

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the localdev core error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for localdev core operations
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Project selection and dependency resolution errors
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse a configuration or project file
    #[error("Failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// The same project key is defined twice
    #[error("Project '{key}' is defined more than once (second definition in {source_name})")]
    DuplicateProject { key: String, source_name: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while choosing which projects to act on
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The selection matched nothing
    #[error("no projects based on parameters")]
    Empty,

    /// A project key or name was not found in the registry
    #[error("Unknown project: {0}")]
    UnknownProject(String),

    /// A project lists a dependency that is not in the registry
    #[error("Project '{project}' depends on unknown project '{dependency}'")]
    UnknownDependency { project: String, dependency: String },

    /// A dependency kind string could not be parsed
    #[error("Unknown dependency kind '{0}' (expected one of: build, compile, run, both)")]
    UnknownKind(String),
}

impl Error {
    /// Whether this error comes from configuration rather than user input
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_))
    }
}
