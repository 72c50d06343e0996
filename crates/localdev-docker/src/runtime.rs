//! Container runtime trait

use crate::error::Result;
use crate::types::{Container, HealthLogEntry, HealthState};

/// Read-only view of a container runtime used for health checks
///
/// Implementations must be cheap to call repeatedly; the health monitor polls
/// `health_state` and `health_log` on an interval.
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime name for logs
    fn name(&self) -> &str;

    /// Version reported by the runtime's server, for example `24.0.7`
    async fn server_version(&self) -> Result<String>;

    /// List running containers
    async fn list_containers(&self) -> Result<Vec<Container>>;

    /// Whether the container declares a health check
    async fn has_health_check(&self, id: &str) -> Result<bool>;

    /// Current health state
    async fn health_state(&self, id: &str) -> Result<HealthState>;

    /// Whether the container currently reports healthy
    async fn is_healthy(&self, id: &str) -> Result<bool> {
        Ok(self.health_state(id).await? == HealthState::Healthy)
    }

    /// Health probe results retained by the runtime, oldest first
    async fn health_log(&self, id: &str) -> Result<Vec<HealthLogEntry>>;
}
