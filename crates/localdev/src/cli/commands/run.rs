//! Shared driver for `build` and `start`

use std::sync::Arc;

use console::style;

use localdev_core::{ExecutionPlan, Workspace};
use localdev_tasks::{
    plan_run, CancelSignal, Executor, HealthMonitor, HealthOutcome, Phase, ReporterSet, RunEvent,
    RunReporter, RunSummary, Runner, WindowConfig, WindowFactory,
};

use super::{Interrupted, RunFailed, SelectionArgs};
use crate::cli::{output, Cli, OutputFormat};

/// Options shared by the commands that execute projects
pub(super) struct PhaseRun<'a> {
    pub phase: Phase,
    pub selection: &'a SelectionArgs,
    pub ignore_deps: bool,
    pub health: Option<HealthMonitor>,
}

impl PhaseRun<'_> {
    /// Plan, run and report one phase
    pub async fn execute(self, cli: &Cli, workspace: &Workspace) -> anyhow::Result<()> {
        let selection = self.selection.selection()?;
        let plan = plan_run(
            &workspace.registry,
            &selection,
            self.phase.kind(),
            self.ignore_deps,
            workspace.config.scheduler.fuse,
        )?;

        if cli.is_text() {
            print_plan(self.phase, &plan);
        }

        let mut window_config = WindowConfig::from(&workspace.config.display);
        if !cli.is_text() {
            window_config = window_config.with_headless();
        }
        let windows = WindowFactory::stdout(window_config);
        let executor = Executor::new(windows.clone());

        let mut reporters = ReporterSet::new();
        if cli.is_text() {
            reporters.register(Arc::new(ConsoleReporter::new(cli.verbose)));
        }

        let mut runner = Runner::new(executor, Arc::new(reporters), workspace.workspace_root());
        if let Some(monitor) = self.health {
            runner = runner.with_health(monitor);
        }

        let mut cancel = if self.phase == Phase::Start {
            CancelSignal::stdin()
        } else {
            CancelSignal::never()
        };

        let finished = tokio::select! {
            result = runner.run(&workspace.registry, &plan, self.phase, &mut cancel) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        let summary = match finished {
            Some(result) => result?,
            None => {
                // The abandoned run left its window to the consumer task
                windows.wait_closed().await;
                tracing::warn!(phase = %self.phase, "interrupted");
                return Err(Interrupted.into());
            }
        };

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        finish(summary)
    }
}

fn print_plan(phase: Phase, plan: &ExecutionPlan) {
    output::info(&format!(
        "{} {} project{}: {}",
        phase,
        plan.order.len(),
        if plan.order.len() == 1 { "" } else { "s" },
        plan.order.join(", ")
    ));
    if !plan.is_complete() {
        let unresolved: Vec<&str> = plan.unresolved.iter().map(String::as_str).collect();
        output::warning(&format!(
            "Unable to resolve dependencies for: {}",
            unresolved.join(", ")
        ));
    }
    println!();
}

fn finish(summary: RunSummary) -> anyhow::Result<()> {
    if summary.is_success() {
        return Ok(());
    }
    Err(RunFailed {
        failed: summary.failed(),
        skipped: summary.skipped.len(),
    }
    .into())
}

/// Prints run progress as sections and status lines
struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl RunReporter for ConsoleReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { .. } | RunEvent::ProjectFinished { .. } => {}
            RunEvent::ProjectSkipped { project, reason } => {
                output::warning(&format!("{} skipped: {}", project, reason));
            }
            RunEvent::ProjectStarted {
                project,
                index,
                total,
            } => {
                println!();
                output::section(&format!("{} ({}/{})", project, index + 1, total));
            }
            RunEvent::CommandStarted { command, .. } => {
                if self.verbose {
                    println!("  {} {}", style("▸").dim(), style(command).dim());
                }
            }
            RunEvent::CommandSucceeded {
                command, duration, ..
            } => {
                println!(
                    "  {} {} {}",
                    style("✓").green(),
                    command,
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            RunEvent::CommandFailed {
                command,
                code,
                duration,
                ..
            } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                println!(
                    "  {} {} {} {}",
                    style("✗").red().bold(),
                    command,
                    style(format!("(exit {})", code)).red(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            RunEvent::NoContainer { project, reason } => {
                println!(
                    "  {} {}: {}, not waiting for health",
                    style("!").yellow().bold(),
                    project,
                    reason
                );
            }
            RunEvent::HealthWaiting { .. } => {}
            RunEvent::HealthResolved {
                container,
                outcome,
                elapsed,
                ..
            } => {
                let mark = match outcome {
                    HealthOutcome::Healthy => style("✓").green(),
                    HealthOutcome::NoHealthCheck => style("→").blue(),
                    HealthOutcome::TimedOut | HealthOutcome::Cancelled => {
                        style("!").yellow().bold()
                    }
                };
                println!(
                    "  {} container {} {} {}",
                    mark,
                    container,
                    outcome,
                    style(format!("{:.1}s", elapsed.as_secs_f64())).dim()
                );
            }
            RunEvent::HealthFailed { project, error } => {
                println!(
                    "  {} {}: health check failed: {}",
                    style("✗").red(),
                    project,
                    error
                );
            }
            RunEvent::RunCompleted {
                total,
                succeeded,
                failed,
                skipped,
                duration,
            } => {
                println!();
                let line = format!(
                    "{}/{} commands succeeded in {:.1}s",
                    succeeded,
                    total,
                    duration.as_secs_f64()
                );
                if *failed == 0 && *skipped == 0 {
                    output::success(&line);
                } else {
                    output::error(&format!(
                        "{}, {} failed, {} project{} skipped",
                        line,
                        failed,
                        skipped,
                        if *skipped == 1 { "" } else { "s" }
                    ));
                }
            }
        }
    }
}
