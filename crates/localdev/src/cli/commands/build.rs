//! Build command

use clap::Args;
use tracing::info;

use localdev_tasks::Phase;

use super::run::PhaseRun;
use super::{load_workspace, SelectionArgs};
use crate::cli::{output, Cli};

/// Run build commands in compile dependency order
#[derive(Debug, Args)]
pub struct BuildCommand {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Only build the selected projects, in key order
    #[arg(long)]
    pub ignore_deps: bool,
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing build command");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = load_workspace(cli)?;

        if cli.is_text() {
            output::title("Build");
        }

        PhaseRun {
            phase: Phase::Build,
            selection: &self.selection,
            ignore_deps: self.ignore_deps,
            health: None,
        }
        .execute(cli, &workspace)
        .await
    }
}
