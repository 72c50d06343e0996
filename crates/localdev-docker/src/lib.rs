//! localdev docker - container runtime access
//!
//! Exposes the small, read-only slice of a container runtime that health checks
//! need: listing running containers, inspecting health state and reading the
//! health probe log. [`DockerCli`] talks to a local Docker engine through the
//! `docker` binary; [`MockRuntime`] is a scripted in-memory runtime.

pub mod cli;
pub mod error;
pub mod mock;
pub mod runtime;
pub mod types;

pub use cli::DockerCli;
pub use error::{DockerError, Result};
pub use mock::MockRuntime;
pub use runtime::ContainerRuntime;
pub use types::{Container, HealthLogEntry, HealthState};
