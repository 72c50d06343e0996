//! Project details command

use clap::{Args, Subcommand};
use tracing::info;

use super::{load_workspace, SelectionArgs};
use crate::cli::{output, Cli, OutputFormat};

/// Project and group details
#[derive(Debug, Args)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub action: ProjectAction,
}

/// Project subcommands
#[derive(Debug, Subcommand)]
pub enum ProjectAction {
    /// Display project details
    Details(SelectionArgs),
}

impl ProjectCommand {
    /// Execute the project command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing project command");
        let ProjectAction::Details(selection) = &self.action;

        let workspace = load_workspace(cli)?;
        let keys = workspace.registry.select(&selection.selection()?)?;
        let root = workspace.workspace_root();
        let projects = keys.iter().filter_map(|key| workspace.registry.get(key));

        match cli.format {
            OutputFormat::Json => {
                let value: Vec<serde_json::Value> = projects
                    .map(|p| {
                        serde_json::json!({
                            "key": p.key,
                            "project": p,
                            "project_root": p.root_path(&root),
                            "build_commands": p.build_commands(&root),
                            "run_commands": p.run_commands(&root),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                output::title("Project Details");
                for project in projects {
                    output::section(project.display_name());
                    println!("{}", project.details(&root));
                }
            }
        }

        Ok(())
    }
}
