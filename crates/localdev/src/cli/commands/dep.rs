//! Dependency display commands

use std::collections::BTreeSet;

use clap::{Args, Subcommand};
use tracing::info;

use localdev_core::{DependencyGraph, DependencyKind, ExecutionPlan, Scheduler, Workspace};

use super::{load_workspace, SelectionArgs};
use crate::cli::{output, Cli, OutputFormat};

/// Project dependency tools
#[derive(Debug, Args)]
pub struct DepCommand {
    #[command(subcommand)]
    pub action: DepAction,
}

/// What to display
#[derive(Debug, Subcommand)]
pub enum DepAction {
    /// Display the dependency graph
    Graph(DepArgs),
    /// Display the execution order
    Order(DepArgs),
    /// Display the dependency graph and the execution order
    Explain(DepArgs),
}

/// Arguments shared by the dependency subcommands
#[derive(Debug, Args)]
pub struct DepArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Which dependencies to follow
    #[arg(short = 'r', long, default_value = "build")]
    pub run_mode: RunMode,
}

/// Dependency relation selected on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    /// Compile dependencies
    #[default]
    Build,
    /// Runtime dependencies
    Run,
}

impl From<RunMode> for DependencyKind {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Build => DependencyKind::Compile,
            RunMode::Run => DependencyKind::Run,
        }
    }
}

impl DepCommand {
    /// Arguments of whichever subcommand was given
    pub fn args(&self) -> &DepArgs {
        match &self.action {
            DepAction::Graph(args) | DepAction::Order(args) | DepAction::Explain(args) => args,
        }
    }

    /// Execute the dep command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing dep command");
        let workspace = load_workspace(cli)?;
        let args = self.args();
        let (show_graph, show_order) = match self.action {
            DepAction::Graph(_) => (true, false),
            DepAction::Order(_) => (false, true),
            DepAction::Explain(_) => (true, true),
        };

        let report = DepReport::compute(&workspace, args)?;

        match cli.format {
            OutputFormat::Json => {
                let mut value = serde_json::json!({
                    "kind": report.kind,
                    "projects": report.subset,
                });
                if show_graph {
                    value["graph"] = serde_json::to_value(report.graph.forward())?;
                }
                if show_order {
                    value["order"] = serde_json::to_value(&report.plan.order)?;
                    value["unresolved"] = serde_json::to_value(&report.plan.unresolved)?;
                }
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                output::title("Dependencies");
                if show_graph {
                    output::section(if show_order { "Graph" } else { "Dependency Graph" });
                    print!("{}", report.render_graph());
                }
                if show_order {
                    if show_graph {
                        println!();
                    }
                    output::section("Execution Order");
                    for line in report.order_lines() {
                        println!("{}", line);
                    }
                    if !report.plan.is_complete() {
                        println!();
                        let unresolved: Vec<&str> =
                            report.plan.unresolved.iter().map(String::as_str).collect();
                        output::warning(&format!(
                            "Unable to resolve dependencies for: {}",
                            unresolved.join(", ")
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Graph and order for a selection plus its dependencies
struct DepReport {
    kind: DependencyKind,
    subset: BTreeSet<String>,
    graph: DependencyGraph,
    plan: ExecutionPlan,
}

impl DepReport {
    fn compute(workspace: &Workspace, args: &DepArgs) -> anyhow::Result<Self> {
        let kind = DependencyKind::from(args.run_mode);
        let selection = args.selection.selection()?;
        let subset = workspace.registry.select_with_dependencies(&selection, kind)?;
        let graph = DependencyGraph::build(&workspace.registry, &subset, kind)?;
        let plan = Scheduler::new()
            .with_fuse(workspace.config.scheduler.fuse)
            .schedule(&workspace.registry, &subset, kind)?;
        Ok(Self {
            kind,
            subset,
            graph,
            plan,
        })
    }

    /// A lone project is printed by key only
    fn single(&self) -> Option<&str> {
        match self.subset.len() {
            1 => self.subset.iter().next().map(String::as_str),
            _ => None,
        }
    }

    fn render_graph(&self) -> String {
        match self.single() {
            Some(key) => format!("{}\n", key),
            None => self.graph.render_tree(),
        }
    }

    fn order_lines(&self) -> Vec<&str> {
        match self.single() {
            Some(key) => vec![key],
            None => self.plan.order.iter().map(String::as_str).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localdev_core::{Config, Project, ProjectRegistry};

    fn workspace() -> Workspace {
        let registry = ProjectRegistry::new()
            .with(Project::new("db", "db").with_group("infra"))
            .with(Project::new("api", "api").with_run_dep("db").with_compile_dep("proto"))
            .with(Project::new("proto", "proto"))
            .with(Project::new("a", "a").with_run_dep("b"))
            .with(Project::new("b", "b").with_run_dep("a"));
        Workspace {
            config: Config::default(),
            config_path: None,
            registry,
        }
    }

    fn args(project: &str, run_mode: RunMode) -> DepArgs {
        DepArgs {
            selection: SelectionArgs {
                project: Some(project.to_string()),
                ..Default::default()
            },
            run_mode,
        }
    }

    #[test]
    fn test_build_mode_follows_compile_edges() {
        let report = DepReport::compute(&workspace(), &args("api", RunMode::Build)).unwrap();
        assert_eq!(report.kind, DependencyKind::Compile);
        assert_eq!(report.order_lines(), ["proto", "api"]);
        assert!(report.render_graph().starts_with("proto\n└─ api\n"));
    }

    #[test]
    fn test_run_mode_follows_run_edges() {
        let report = DepReport::compute(&workspace(), &args("api", RunMode::Run)).unwrap();
        assert_eq!(report.order_lines(), ["db", "api"]);
    }

    #[test]
    fn test_single_project_prints_key_only() {
        let report = DepReport::compute(&workspace(), &args("db", RunMode::Run)).unwrap();
        assert_eq!(report.render_graph(), "db\n");
        assert_eq!(report.order_lines(), ["db"]);
    }

    #[test]
    fn test_cycle_is_unresolved() {
        let report = DepReport::compute(&workspace(), &args("a", RunMode::Run)).unwrap();
        assert!(report.order_lines().is_empty());
        assert_eq!(report.plan.unresolved.len(), 2);
    }

    #[test]
    fn test_unknown_project_is_error() {
        assert!(DepReport::compute(&workspace(), &args("ghost", RunMode::Run)).is_err());
    }
}
