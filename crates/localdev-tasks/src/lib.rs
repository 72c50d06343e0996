//! localdev tasks - command execution and live output
//!
//! This crate runs the commands of scheduled projects one at a time, streams
//! their output into a bounded terminal window, and waits for project
//! containers to report healthy with timeout and user cancellation.

pub mod command;
pub mod container;
pub mod error;
pub mod executor;
pub mod health;
pub mod input;
pub mod reporter;
pub mod runner;
pub mod window;

pub use command::CommandLine;
pub use container::{find_project_container, ContainerLookup};
pub use error::{ExecError, HealthError};
pub use executor::{CommandOutcome, CommandResult, Executor};
pub use health::{HealthMonitor, HealthOutcome, HealthReport, HealthSettings};
pub use input::CancelSignal;
pub use reporter::{CollectingReporter, ReporterSet, RunEvent, RunReporter, TracingReporter};
pub use runner::{plan_run, HealthRecord, Phase, RunSummary, Runner};
pub use window::{
    DisplayWindow, OutputWindow, SharedBuffer, WindowConfig, WindowFactory, WindowHandle,
    WindowReport,
};
