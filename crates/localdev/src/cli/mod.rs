//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{
    BuildCommand, ConfigCommand, DepCommand, DoctorCommand, ProjectCommand, StartCommand,
};

/// localdev - build and run interdependent local projects in dependency order
#[derive(Debug, Parser)]
#[command(name = "localdev")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file, instead of searching from the working directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

impl Cli {
    /// Whether human readable progress should be printed
    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text && !self.quiet
    }
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run build commands in compile dependency order
    Build(BuildCommand),

    /// Run start commands in run dependency order and wait for containers
    Start(StartCommand),

    /// Project dependency tools
    Dep(DepCommand),

    /// Project and group details
    Project(ProjectCommand),

    /// Show or initialise the configuration
    Config(ConfigCommand),

    /// Check environment variables and the Docker installation
    Doctor(DoctorCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Build(ref cmd) => cmd.execute(&self),
            Commands::Start(ref cmd) => cmd.execute(&self),
            Commands::Dep(ref cmd) => cmd.execute(&self),
            Commands::Project(ref cmd) => cmd.execute(&self),
            Commands::Config(ref cmd) => cmd.execute(&self),
            Commands::Doctor(ref cmd) => cmd.execute(&self),
        }
    }
}
