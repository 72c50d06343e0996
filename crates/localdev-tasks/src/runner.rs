//! Runs the commands of scheduled projects in order

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use localdev_core::{
    DependencyKind, ExecutionPlan, Project, ProjectRegistry, ResolvedCommand, Scheduler, Selection,
};

use crate::container::{find_project_container, ContainerLookup};
use crate::error::ExecError;
use crate::executor::{CommandOutcome, CommandResult, Executor};
use crate::health::{HealthMonitor, HealthOutcome};
use crate::input::CancelSignal;
use crate::reporter::{RunEvent, RunReporter};

/// Which command list a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Build commands, ordered by compile dependencies
    Build,
    /// Run commands, ordered by run dependencies, followed by health checks
    Start,
}

impl Phase {
    /// Dependency kind that orders this phase
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::Build => DependencyKind::Compile,
            Self::Start => DependencyKind::Run,
        }
    }

    /// Resolved commands of `project` for this phase
    pub fn commands(&self, project: &Project, workspace_root: &str) -> Vec<ResolvedCommand> {
        match self {
            Self::Build => project.build_commands(workspace_root),
            Self::Start => project.run_commands(workspace_root),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Start => write!(f, "start"),
        }
    }
}

/// Compute the execution plan for a selection
///
/// With `ignore_deps` only the selected projects run, in key order. Otherwise the
/// selection is extended with its transitive dependencies of `kind` and scheduled.
pub fn plan_run(
    registry: &ProjectRegistry,
    selection: &Selection,
    kind: DependencyKind,
    ignore_deps: bool,
    fuse: usize,
) -> localdev_core::Result<ExecutionPlan> {
    if ignore_deps {
        let selected = registry.select(selection)?;
        let order: Vec<String> = selected.into_iter().collect();
        debug!(count = order.len(), "ignoring dependencies");
        return Ok(ExecutionPlan {
            waves: vec![order.clone()],
            order,
            unresolved: BTreeSet::new(),
        });
    }

    let subset = registry.select_with_dependencies(selection, kind)?;
    Scheduler::new()
        .with_fuse(fuse)
        .schedule(registry, &subset, kind)
}

/// Health outcome for one project
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecord {
    /// Project key
    pub project: String,
    /// Container id
    pub container: String,
    /// How the wait ended
    pub outcome: HealthOutcome,
}

/// Everything that happened during a run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Phase that ran
    pub phase: Phase,
    /// Projects processed, in order
    pub order: Vec<String>,
    /// Projects left out because their dependencies could not be scheduled
    pub skipped: Vec<String>,
    /// Per command outcomes
    pub commands: Vec<CommandResult>,
    /// Per project health outcomes
    pub health: Vec<HealthRecord>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl RunSummary {
    fn new(phase: Phase, plan: &ExecutionPlan) -> Self {
        Self {
            phase,
            order: plan.order.clone(),
            skipped: plan.unresolved.iter().cloned().collect(),
            commands: Vec::new(),
            health: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Number of commands that exited 0
    pub fn succeeded(&self) -> usize {
        self.commands.iter().filter(|c| c.outcome.is_success()).count()
    }

    /// Number of commands that exited non-zero
    pub fn failed(&self) -> usize {
        self.commands.len() - self.succeeded()
    }

    /// Whether every command succeeded and nothing was skipped
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped.is_empty()
    }
}

/// Drives a run: commands per project, then an optional health wait
pub struct Runner {
    executor: Executor,
    health: Option<HealthMonitor>,
    reporter: Arc<dyn RunReporter>,
    workspace_root: String,
}

impl Runner {
    /// Create a runner without health checks
    pub fn new(
        executor: Executor,
        reporter: Arc<dyn RunReporter>,
        workspace_root: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            health: None,
            reporter,
            workspace_root: workspace_root.into(),
        }
    }

    /// Wait for project containers after `Start` commands
    pub fn with_health(mut self, monitor: HealthMonitor) -> Self {
        self.health = Some(monitor);
        self
    }

    /// Execute `plan`
    ///
    /// Non-zero exits and health problems are recorded and the run continues;
    /// a command that cannot be parsed or spawned stops the run.
    #[instrument(skip_all, fields(phase = %phase, projects = plan.order.len()))]
    pub async fn run(
        &self,
        registry: &ProjectRegistry,
        plan: &ExecutionPlan,
        phase: Phase,
        cancel: &mut CancelSignal,
    ) -> Result<RunSummary, ExecError> {
        let start = Instant::now();
        let mut summary = RunSummary::new(phase, plan);

        self.reporter.report(&RunEvent::RunStarted {
            phase,
            projects: plan.order.clone(),
            unresolved: summary.skipped.clone(),
        });
        for key in &summary.skipped {
            self.reporter.report(&RunEvent::ProjectSkipped {
                project: key.clone(),
                reason: "dependencies could not be resolved".to_string(),
            });
        }

        let total = plan.order.len();
        for (index, key) in plan.order.iter().enumerate() {
            let Some(project) = registry.get(key) else {
                warn!(project = %key, "scheduled project missing from registry");
                continue;
            };
            let project_start = Instant::now();

            self.reporter.report(&RunEvent::ProjectStarted {
                project: key.clone(),
                index,
                total,
            });

            for command in phase.commands(project, &self.workspace_root) {
                let result = self.run_command(key, &command).await?;
                summary.commands.push(result);
            }

            if phase == Phase::Start {
                if let Some(monitor) = &self.health {
                    if let Some(record) = self.check_health(monitor, project, cancel).await {
                        summary.health.push(record);
                    }
                }
            }

            self.reporter.report(&RunEvent::ProjectFinished {
                project: key.clone(),
                duration: project_start.elapsed(),
            });
        }

        let duration = start.elapsed();
        summary.duration_ms = duration.as_millis() as u64;

        self.reporter.report(&RunEvent::RunCompleted {
            total: summary.commands.len(),
            succeeded: summary.succeeded(),
            failed: summary.failed(),
            skipped: summary.skipped.len(),
            duration,
        });
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "run finished"
        );
        Ok(summary)
    }

    async fn run_command(
        &self,
        project: &str,
        command: &ResolvedCommand,
    ) -> Result<CommandResult, ExecError> {
        let display = command.to_string();
        self.reporter.report(&RunEvent::CommandStarted {
            project: project.to_string(),
            command: display.clone(),
        });

        let start = Instant::now();
        let outcome = self.executor.run(project, command).await?;
        let duration = start.elapsed();

        let event = match outcome {
            CommandOutcome::Success => RunEvent::CommandSucceeded {
                project: project.to_string(),
                command: display.clone(),
                duration,
            },
            CommandOutcome::Failed { code } => RunEvent::CommandFailed {
                project: project.to_string(),
                command: display.clone(),
                code,
                duration,
            },
        };
        self.reporter.report(&event);

        Ok(CommandResult {
            project: project.to_string(),
            command: display,
            outcome,
            duration,
        })
    }

    async fn check_health(
        &self,
        monitor: &HealthMonitor,
        project: &Project,
        cancel: &mut CancelSignal,
    ) -> Option<HealthRecord> {
        let key = project.key.clone();

        let container = match find_project_container(monitor.runtime().as_ref(), project).await {
            Ok(ContainerLookup::Found(container)) => container,
            Ok(ContainerLookup::Missing) => {
                self.reporter.report(&RunEvent::NoContainer {
                    project: key,
                    reason: "no running container found".to_string(),
                });
                return None;
            }
            Ok(ContainerLookup::Ambiguous(ids)) => {
                self.reporter.report(&RunEvent::NoContainer {
                    project: key,
                    reason: format!("{} running containers match ({})", ids.len(), ids.join(", ")),
                });
                return None;
            }
            Err(e) => {
                self.reporter.report(&RunEvent::HealthFailed {
                    project: key,
                    error: e.to_string(),
                });
                return None;
            }
        };

        let stale = cancel.drain();
        if stale > 0 {
            debug!(stale, "discarded stale cancel requests");
        }

        self.reporter.report(&RunEvent::HealthWaiting {
            project: key.clone(),
            container: container.short_id().to_string(),
        });

        let window = self.executor.windows().open(format!(
            "Waiting for {} to become healthy (press Enter to stop waiting)",
            project.display_name()
        ));
        let sender = window.sender();
        let result = monitor.wait(&container.id, Some(&sender), cancel).await;
        drop(sender);
        window.close().await;

        match result {
            Ok(report) => {
                self.reporter.report(&RunEvent::HealthResolved {
                    project: key.clone(),
                    container: container.short_id().to_string(),
                    outcome: report.outcome,
                    elapsed: report.elapsed,
                });
                Some(HealthRecord {
                    project: key,
                    container: container.id,
                    outcome: report.outcome,
                })
            }
            Err(e) => {
                self.reporter.report(&RunEvent::HealthFailed {
                    project: key,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::health::HealthSettings;
    use crate::reporter::CollectingReporter;
    use crate::window::{SharedBuffer, WindowConfig, WindowFactory};
    use localdev_docker::{Container, HealthState, MockRuntime};

    fn executor() -> Executor {
        let config = WindowConfig::default()
            .with_lines(3)
            .with_width(60)
            .with_settle(Duration::ZERO);
        Executor::new(WindowFactory::new(config, SharedBuffer::new().factory()))
    }

    fn runner() -> (Arc<CollectingReporter>, Runner) {
        let reporter = Arc::new(CollectingReporter::default());
        (reporter.clone(), Runner::new(executor(), reporter, "/work"))
    }

    fn registry() -> ProjectRegistry {
        ProjectRegistry::new()
            .with(Project::new("db", "db").with_run_cmd("true", ""))
            .with(
                Project::new("api", "api")
                    .with_run_dep("db")
                    .with_run_cmd("sh -c 'exit 4'", "")
                    .with_run_cmd("echo #NAME# #WORKSPACE_ROOT#", ""),
            )
            .with(Project::new("web", "web").with_run_dep("api").with_run_cmd("true", ""))
            .with(Project::new("x", "x").with_run_dep("y"))
            .with(Project::new("y", "y").with_run_dep("x"))
    }

    fn command_events(events: &[RunEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::CommandStarted { project, command } => {
                    Some(format!("{}: {}", project, command))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_plan_with_dependencies() {
        let plan = plan_run(
            &registry(),
            &Selection::Project("web".into()),
            DependencyKind::Run,
            false,
            200,
        )
        .unwrap();
        assert_eq!(plan.order, ["db", "api", "web"]);
    }

    #[test]
    fn test_plan_ignoring_dependencies() {
        let plan = plan_run(&registry(), &Selection::All, DependencyKind::Run, true, 200).unwrap();
        assert_eq!(plan.order, ["api", "db", "web", "x", "y"]);
        assert!(plan.unresolved.is_empty());
    }

    #[test]
    fn test_plan_reports_cycles() {
        let plan = plan_run(&registry(), &Selection::All, DependencyKind::Run, false, 200).unwrap();
        assert_eq!(plan.order, ["db", "api", "web"]);
        assert_eq!(plan.unresolved.len(), 2);
    }

    #[tokio::test]
    async fn test_run_continues_after_failure() {
        let reg = registry();
        let plan = plan_run(&reg, &Selection::All, DependencyKind::Run, false, 200).unwrap();
        let (reporter, runner) = runner();

        let summary = runner
            .run(&reg, &plan, Phase::Start, &mut CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(summary.commands.len(), 4);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped, ["x", "y"]);
        assert!(!summary.is_success());

        let events = reporter.events();
        assert_eq!(
            command_events(&events),
            [
                "db: true",
                "api: sh -c 'exit 4'",
                "api: echo api /work",
                "web: true",
            ]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            RunEvent::CommandFailed { code: Some(4), .. }
        )));
        assert!(matches!(events.last(), Some(RunEvent::RunCompleted { failed: 1, skipped: 2, .. })));
    }

    #[tokio::test]
    async fn test_spawn_failure_stops_run() {
        let reg = ProjectRegistry::new()
            .with(Project::new("a", "a").with_build_cmd("no-such-binary-for-localdev", ""))
            .with(Project::new("b", "b").with_build_cmd("true", ""));
        let plan = plan_run(&reg, &Selection::All, DependencyKind::Compile, false, 200).unwrap();
        let (reporter, runner) = runner();

        let err = runner
            .run(&reg, &plan, Phase::Build, &mut CancelSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
        assert_eq!(command_events(&reporter.events()), ["a: no-such-binary-for-localdev"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_waits_for_health() {
        let reg = ProjectRegistry::new()
            .with(Project::new("api", "api"))
            .with(Project::new("db", "db"));
        let runtime = Arc::new(
            MockRuntime::new()
                .with_container(Container::new("c-api", "stack_api_1"))
                .with_health("c-api", [HealthState::Starting, HealthState::Healthy]),
        );
        let monitor = HealthMonitor::new(runtime, HealthSettings::default());
        let (reporter, runner) = runner();
        let runner = runner.with_health(monitor);

        let plan = plan_run(&reg, &Selection::All, DependencyKind::Run, false, 200).unwrap();
        let summary = runner
            .run(&reg, &plan, Phase::Start, &mut CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(summary.health.len(), 1);
        assert_eq!(summary.health[0].project, "api");
        assert_eq!(summary.health[0].outcome, HealthOutcome::Healthy);

        let events = reporter.events();
        assert!(events.iter().any(|e| matches!(
            e,
            RunEvent::NoContainer { project, .. } if project == "db"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_cancel_is_drained() {
        let reg = ProjectRegistry::new().with(Project::new("api", "api"));
        let runtime = Arc::new(
            MockRuntime::new()
                .with_container(Container::new("c-api", "stack_api_1"))
                .with_health("c-api", [HealthState::Starting, HealthState::Starting, HealthState::Healthy]),
        );
        let (reporter, runner) = runner();
        let runner = runner.with_health(HealthMonitor::new(runtime, HealthSettings::default()));

        let (tx, mut cancel) = CancelSignal::channel();
        tx.send(()).unwrap();

        let plan = plan_run(&reg, &Selection::All, DependencyKind::Run, false, 200).unwrap();
        let summary = runner.run(&reg, &plan, Phase::Start, &mut cancel).await.unwrap();
        assert_eq!(summary.health[0].outcome, HealthOutcome::Healthy);
        assert!(reporter
            .events()
            .iter()
            .any(|e| matches!(e, RunEvent::HealthResolved { outcome: HealthOutcome::Healthy, .. })));
    }

    #[test]
    fn test_phase_kinds() {
        assert_eq!(Phase::Build.kind(), DependencyKind::Compile);
        assert_eq!(Phase::Start.kind(), DependencyKind::Run);
        assert_eq!(Phase::Build.to_string(), "build");
    }
}
