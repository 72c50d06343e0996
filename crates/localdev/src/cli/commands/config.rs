//! Config command

use std::path::Path;

use clap::Args;
use console::style;
use tracing::info;

use localdev_core::config::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML};

use super::load_workspace;
use crate::cli::{output, Cli, OutputFormat};

/// Show the resolved configuration, or write a starter file
#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Write a starter localdev.toml into the working directory
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,
}

impl ConfigCommand {
    /// Execute the config command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing config command");
        if self.init {
            let cwd = std::env::current_dir()?;
            let path = write_template(&cwd, self.force)?;
            if !cli.quiet {
                output::success(&format!("Created {}", path.display()));
            }
            return Ok(());
        }

        let workspace = load_workspace(cli)?;
        let config = &workspace.config;

        match cli.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "config_path": workspace.config_path.as_ref().map(|p| p.display().to_string()),
                    "workspace_root": workspace.workspace_root(),
                    "projects": workspace.registry.iter().map(|(k, _)| k).collect::<Vec<_>>(),
                    "config": config,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                output::title("Config");
                match &workspace.config_path {
                    Some(path) => println!(
                        "{}",
                        output::key_value(
                            "Config file",
                            &output::path_style().apply_to(path.display()).to_string()
                        )
                    ),
                    None => println!(
                        "{}",
                        output::key_value(
                            "Config file",
                            &format!("{} (using defaults)", style("not found").yellow())
                        )
                    ),
                }
                println!(
                    "{}",
                    output::key_value("Workspace root", &workspace.workspace_root())
                );
                println!(
                    "{}",
                    output::key_value("Projects", &workspace.registry.len().to_string())
                );
                println!(
                    "{}",
                    output::key_value(
                        "Window",
                        &format!("{} lines, margin {}", config.display.lines, config.display.margin)
                    )
                );
                println!(
                    "{}",
                    output::key_value(
                        "Health",
                        &format!(
                            "timeout {}s, poll every {}ms",
                            config.health.timeout_secs, config.health.poll_interval_ms
                        )
                    )
                );

                if !workspace.registry.is_empty() {
                    println!();
                    output::section("Projects");
                    for (key, project) in workspace.registry.iter() {
                        let groups = if project.groups.is_empty() {
                            String::new()
                        } else {
                            format!(" [{}]", project.groups.join(", "))
                        };
                        println!(
                            "  {}{}",
                            output::project_style().apply_to(key),
                            style(groups).dim()
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

/// Write the starter configuration into `dir`
fn write_template(dir: &Path, force: bool) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join(DEFAULT_CONFIG_TOML);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(path)
}
