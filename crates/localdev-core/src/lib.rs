//! localdev core - project model and dependency scheduling
//!
//! This crate provides the project records, the registry and selection rules,
//! the dependency graph builder, the topological scheduler, version comparison and the
//! configuration system used by the `localdev` tool.

pub mod config;
pub mod error;
pub mod graph;
pub mod project;
pub mod registry;
pub mod scheduler;
pub mod version;

pub use config::{Config, Workspace};
pub use error::{ConfigError, Error, Result, SelectionError};
pub use graph::DependencyGraph;
pub use project::{CommandTemplate, DependencyKind, DependsOn, Project, ResolvedCommand};
pub use registry::{ProjectRegistry, Selection};
pub use scheduler::{ExecutionPlan, Scheduler, DEFAULT_FUSE};
pub use version::Version;
