//! Run progress reporting

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::health::HealthOutcome;
use crate::runner::Phase;

/// Events emitted while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// The run is about to start
    RunStarted {
        phase: Phase,
        projects: Vec<String>,
        unresolved: Vec<String>,
    },
    /// A project could not be scheduled and will not run
    ProjectSkipped { project: String, reason: String },
    /// Work on a project begins
    ProjectStarted {
        project: String,
        index: usize,
        total: usize,
    },
    /// A command is about to be spawned
    CommandStarted { project: String, command: String },
    /// A command exited with status 0
    CommandSucceeded {
        project: String,
        command: String,
        duration: Duration,
    },
    /// A command exited unsuccessfully
    CommandFailed {
        project: String,
        command: String,
        code: Option<i32>,
        duration: Duration,
    },
    /// No single running container was found for the project
    NoContainer { project: String, reason: String },
    /// Waiting for a container to become healthy
    HealthWaiting { project: String, container: String },
    /// A health wait ended
    HealthResolved {
        project: String,
        container: String,
        outcome: HealthOutcome,
        elapsed: Duration,
    },
    /// A health wait could not be performed
    HealthFailed { project: String, error: String },
    /// Work on a project is done
    ProjectFinished { project: String, duration: Duration },
    /// All projects processed
    RunCompleted {
        total: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        duration: Duration,
    },
}

/// Trait for reporting run progress
pub trait RunReporter: Send + Sync {
    /// Handle a run event
    fn report(&self, event: &RunEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl RunReporter for TracingReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted {
                phase,
                projects,
                unresolved,
            } => {
                tracing::info!(%phase, count = projects.len(), unresolved = unresolved.len(), "run started");
            }
            RunEvent::ProjectSkipped { project, reason } => {
                tracing::warn!(project = %project, reason = %reason, "project skipped");
            }
            RunEvent::ProjectStarted {
                project,
                index,
                total,
            } => {
                tracing::info!(project = %project, "project {}/{}", index + 1, total);
            }
            RunEvent::CommandStarted { project, command } => {
                tracing::info!(project = %project, command = %command, "command started");
            }
            RunEvent::CommandSucceeded {
                project,
                command,
                duration,
            } => {
                tracing::info!(project = %project, command = %command, "completed in {:.1}s", duration.as_secs_f64());
            }
            RunEvent::CommandFailed {
                project,
                command,
                code,
                duration,
            } => {
                tracing::error!(project = %project, command = %command, ?code, "failed after {:.1}s", duration.as_secs_f64());
            }
            RunEvent::NoContainer { project, reason } => {
                tracing::info!(project = %project, reason = %reason, "no health check");
            }
            RunEvent::HealthWaiting { project, container } => {
                tracing::info!(project = %project, container = %container, "waiting for container health");
            }
            RunEvent::HealthResolved {
                project,
                outcome,
                elapsed,
                ..
            } => {
                tracing::info!(project = %project, %outcome, "health resolved after {:.1}s", elapsed.as_secs_f64());
            }
            RunEvent::HealthFailed { project, error } => {
                tracing::warn!(project = %project, error = %error, "health check failed");
            }
            RunEvent::ProjectFinished { project, duration } => {
                tracing::debug!(project = %project, "project finished in {:.1}s", duration.as_secs_f64());
            }
            RunEvent::RunCompleted {
                total,
                succeeded,
                failed,
                skipped,
                duration,
            } => {
                tracing::info!(
                    "Run complete: {}/{} commands succeeded, {} failed, {} projects skipped ({:.1}s)",
                    succeeded,
                    total,
                    failed,
                    skipped,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<RunEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RunReporter for CollectingReporter {
    fn report(&self, event: &RunEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Fan-out to several reporters
#[derive(Clone, Default)]
pub struct ReporterSet {
    reporters: Vec<Arc<dyn RunReporter>>,
}

impl ReporterSet {
    /// A set with only the tracing reporter
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    /// A set with no reporters
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a reporter
    pub fn register(&mut self, reporter: Arc<dyn RunReporter>) {
        self.reporters.push(reporter);
    }

    /// Builder-style `register`
    pub fn with(mut self, reporter: Arc<dyn RunReporter>) -> Self {
        self.register(reporter);
        self
    }

    /// Number of registered reporters
    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    /// Whether no reporter is registered
    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl RunReporter for ReporterSet {
    fn report(&self, event: &RunEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> RunEvent {
        RunEvent::CommandStarted {
            project: "api".to_string(),
            command: "make build".to_string(),
        }
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();
        reporter.report(&started());
        reporter.report(&RunEvent::CommandFailed {
            project: "api".to_string(),
            command: "make build".to_string(),
            code: Some(2),
            duration: Duration::from_secs(1),
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], started());
    }

    #[test]
    fn test_tracing_reporter() {
        // Just verify it doesn't panic
        TracingReporter.report(&started());
        TracingReporter.report(&RunEvent::RunCompleted {
            total: 1,
            succeeded: 1,
            failed: 0,
            skipped: 0,
            duration: Duration::from_millis(10),
        });
    }

    #[test]
    fn test_reporter_set_broadcasts() {
        let first = Arc::new(CollectingReporter::default());
        let second = Arc::new(CollectingReporter::default());
        let set = ReporterSet::empty().with(first.clone()).with(second.clone());
        assert_eq!(set.len(), 2);

        set.report(&started());
        assert_eq!(first.events().len(), 1);
        assert_eq!(second.events().len(), 1);
    }

    #[test]
    fn test_default_set_has_tracing() {
        assert_eq!(ReporterSet::new().len(), 1);
        assert!(ReporterSet::empty().is_empty());
    }
}
