//! CLI commands

mod build;
mod config;
mod dep;
mod doctor;
mod project;
mod run;
mod start;

pub use build::BuildCommand;
pub use config::ConfigCommand;
pub use dep::{DepCommand, RunMode};
pub use doctor::DoctorCommand;
pub use project::ProjectCommand;
pub use start::StartCommand;

use clap::Args;
use thiserror::Error;

use localdev_core::{Selection, SelectionError, Workspace};

use crate::cli::Cli;

/// Flags choosing which projects a command acts on
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// All projects
    #[arg(short, long)]
    pub all: bool,

    /// Projects in a group
    #[arg(short, long)]
    pub group: Option<String>,

    /// A single project, by key or name
    #[arg(short, long)]
    pub project: Option<String>,
}

impl SelectionArgs {
    /// Resolve the flags, in priority order all > group > project
    pub fn selection(&self) -> Result<Selection, SelectionError> {
        Selection::from_flags(self.all, self.group.as_deref(), self.project.as_deref())
            .ok_or(SelectionError::Empty)
    }
}

/// The run was interrupted with Ctrl-C
#[derive(Debug, Error)]
#[error("interrupted")]
pub struct Interrupted;

/// Some commands exited non-zero or some projects could not be scheduled
#[derive(Debug, Error)]
#[error("{failed} command(s) failed, {skipped} project(s) skipped")]
pub struct RunFailed {
    pub failed: usize,
    pub skipped: usize,
}

/// Load configuration and projects from `--config` or by discovery
fn load_workspace(cli: &Cli) -> anyhow::Result<Workspace> {
    let cwd = std::env::current_dir()?;
    let workspace = Workspace::load(&cwd, cli.config.as_deref())?;
    tracing::debug!(
        config = ?workspace.config_path,
        projects = workspace.registry.len(),
        "workspace loaded"
    );
    Ok(workspace)
}
