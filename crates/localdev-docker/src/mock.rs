//! In-memory container runtime for tests and dry runs

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{DockerError, Result};
use crate::runtime::ContainerRuntime;
use crate::types::{Container, HealthLogEntry, HealthState};

#[derive(Debug, Default)]
struct MockHealth {
    has_check: bool,
    /// Remaining scripted states; the last one repeats
    states: VecDeque<HealthState>,
    log: Vec<HealthLogEntry>,
}

/// Scripted container runtime
///
/// Each call to `health_state` consumes the next scripted state; once only one is
/// left it is returned forever.
#[derive(Debug, Default)]
pub struct MockRuntime {
    containers: Vec<Container>,
    server_version: Option<String>,
    health: Mutex<HashMap<String, MockHealth>>,
    probes: AtomicUsize,
}

impl MockRuntime {
    /// Create an empty runtime
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a running container without a health check
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    /// Report this server version; without one the server looks unreachable
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = Some(version.into());
        self
    }

    /// Script the health states a container reports, in order
    pub fn with_health(self, id: &str, states: impl IntoIterator<Item = HealthState>) -> Self {
        if let Ok(mut health) = self.health.lock() {
            let entry = health.entry(id.to_string()).or_default();
            entry.has_check = true;
            entry.states = states.into_iter().collect();
        }
        self
    }

    /// Append a health log entry
    pub fn push_log(&self, id: &str, entry: HealthLogEntry) {
        if let Ok(mut health) = self.health.lock() {
            health.entry(id.to_string()).or_default().log.push(entry);
        }
    }

    /// Number of `health_state` calls so far
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn with_entry<T>(&self, id: &str, f: impl FnOnce(&mut MockHealth) -> T) -> Result<T> {
        let mut health = self
            .health
            .lock()
            .map_err(|_| DockerError::NotFound(id.to_string()))?;
        match health.get_mut(id) {
            Some(entry) => Ok(f(entry)),
            None if self.containers.iter().any(|c| c.id == id) => Ok(f(&mut MockHealth::default())),
            None => Err(DockerError::NotFound(id.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    async fn server_version(&self) -> Result<String> {
        self.server_version
            .clone()
            .ok_or_else(|| DockerError::CommandFailed {
                command: "docker version".to_string(),
                reason: "server not reachable".to_string(),
            })
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        Ok(self.containers.clone())
    }

    async fn has_health_check(&self, id: &str) -> Result<bool> {
        self.with_entry(id, |h| h.has_check)
    }

    async fn health_state(&self, id: &str) -> Result<HealthState> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.with_entry(id, |h| {
            if h.states.len() > 1 {
                h.states.pop_front().unwrap_or(HealthState::Starting)
            } else {
                h.states.front().copied().unwrap_or(HealthState::Starting)
            }
        })
    }

    async fn health_log(&self, id: &str) -> Result<Vec<HealthLogEntry>> {
        self.with_entry(id, |h| h.log.clone())
    }
}
