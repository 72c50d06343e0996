//! Start command

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tracing::info;

use localdev_core::Workspace;
use localdev_docker::{DockerCli, DockerError};
use localdev_tasks::{HealthMonitor, HealthSettings, Phase};

use super::run::PhaseRun;
use super::{load_workspace, SelectionArgs};
use crate::cli::{output, Cli};

/// Run start commands in run dependency order, then wait for containers to become healthy
#[derive(Debug, Args)]
pub struct StartCommand {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Only start the selected projects, in key order
    #[arg(long)]
    pub ignore_deps: bool,

    /// Do not wait for containers to become healthy
    #[arg(long)]
    pub no_health: bool,

    /// Health wait timeout in seconds, overriding the configuration
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl StartCommand {
    /// Execute the start command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing start command");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = load_workspace(cli)?;

        if cli.is_text() {
            output::title("Start");
        }

        PhaseRun {
            phase: Phase::Start,
            selection: &self.selection,
            ignore_deps: self.ignore_deps,
            health: self.health_monitor(cli, &workspace)?,
        }
        .execute(cli, &workspace)
        .await
    }

    /// Health monitor backed by the local docker binary, if health checks are wanted
    fn health_monitor(
        &self,
        cli: &Cli,
        workspace: &Workspace,
    ) -> anyhow::Result<Option<HealthMonitor>> {
        if self.no_health {
            return Ok(None);
        }

        let docker = match DockerCli::new() {
            Ok(docker) => docker,
            Err(e @ DockerError::NotInstalled(_)) => {
                if cli.is_text() {
                    output::warning(&format!("{}, skipping health checks", e));
                }
                tracing::warn!(error = %e, "health checks disabled");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Some(HealthMonitor::new(
            Arc::new(docker),
            self.health_settings(workspace),
        )))
    }

    fn health_settings(&self, workspace: &Workspace) -> HealthSettings {
        let mut settings = HealthSettings::from(&workspace.config.health);
        if let Some(secs) = self.timeout {
            settings.timeout = Duration::from_secs(secs);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localdev_core::{Config, ProjectRegistry};

    fn workspace() -> Workspace {
        Workspace {
            config: Config::default(),
            config_path: None,
            registry: ProjectRegistry::new(),
        }
    }

    fn command(timeout: Option<u64>) -> StartCommand {
        StartCommand {
            selection: SelectionArgs::default(),
            ignore_deps: false,
            no_health: false,
            timeout,
        }
    }

    #[test]
    fn test_timeout_flag_overrides_config() {
        let settings = command(Some(5)).health_settings(&workspace());
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.poll_interval, Duration::from_millis(1000));
    }

    #[test]
    fn test_config_timeout_by_default() {
        let settings = command(None).health_settings(&workspace());
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }
}
