//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::project::{CommandTemplate, Project};
use crate::version::Version;

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_workspace(config)?;
    validate_display(config)?;
    validate_health(config)?;
    validate_scheduler(config)?;
    validate_doctor(config)?;
    for (key, project) in &config.projects {
        validate_project(key, project)?;
    }
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_workspace(config: &Config) -> Result<()> {
    if config.workspace_root.trim().is_empty() {
        return Err(invalid("workspace_root", "workspace root cannot be empty").into());
    }
    Ok(())
}

fn validate_display(config: &Config) -> Result<()> {
    if config.display.lines == 0 {
        return Err(invalid("display.lines", "must be at least 1").into());
    }
    if config.display.width == Some(0) {
        return Err(invalid("display.width", "must be greater than 0").into());
    }
    Ok(())
}

fn validate_health(config: &Config) -> Result<()> {
    if config.health.timeout_secs == 0 {
        return Err(invalid("health.timeout_secs", "must be greater than 0").into());
    }
    if config.health.poll_interval_ms == 0 {
        return Err(invalid("health.poll_interval_ms", "must be greater than 0").into());
    }
    if config.health.log_interval_ms == 0 {
        return Err(invalid("health.log_interval_ms", "must be greater than 0").into());
    }
    Ok(())
}

fn validate_scheduler(config: &Config) -> Result<()> {
    if config.scheduler.fuse == 0 {
        return Err(invalid("scheduler.fuse", "must be greater than 0").into());
    }
    Ok(())
}

fn validate_doctor(config: &Config) -> Result<()> {
    if Version::parse(&config.doctor.min_docker_version).is_none() {
        return Err(invalid(
            "doctor.min_docker_version",
            format!("'{}' is not a version", config.doctor.min_docker_version),
        )
        .into());
    }
    if config.doctor.env.keys().any(|k| k.trim().is_empty()) {
        return Err(invalid("doctor.env", "variable name cannot be empty").into());
    }
    Ok(())
}

/// Validate a single project record
pub fn validate_project(key: &str, project: &Project) -> Result<()> {
    if key.trim().is_empty() {
        return Err(invalid("projects", "project key cannot be empty").into());
    }
    validate_commands(key, "build_cmd", &project.build_cmd)?;
    validate_commands(key, "run_cmd", &project.run_cmd)?;
    Ok(())
}

fn validate_commands(key: &str, field: &str, commands: &[CommandTemplate]) -> Result<()> {
    for (i, cmd) in commands.iter().enumerate() {
        if cmd.command.trim().is_empty() {
            return Err(invalid(
                format!("projects.{}.{}[{}].command", key, field, i),
                "command cannot be empty",
            )
            .into());
        }
    }
    Ok(())
}
