//! Container runtime backed by the `docker` CLI

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{DockerError, Result};
use crate::runtime::ContainerRuntime;
use crate::types::{Container, HealthLogEntry, HealthState, InspectHealth, InspectOutput};

/// Docker runtime that shells out to the `docker` binary
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Path to the docker binary
    docker_path: PathBuf,
}

impl DockerCli {
    /// Locate `docker` on PATH
    pub fn new() -> Result<Self> {
        let docker_path =
            which::which("docker").map_err(|_| DockerError::NotInstalled("docker".to_string()))?;
        debug!(path = %docker_path.display(), "found docker binary");
        Ok(Self { docker_path })
    }

    /// Use a specific docker binary
    pub fn with_path(docker_path: impl Into<PathBuf>) -> Self {
        Self {
            docker_path: docker_path.into(),
        }
    }

    /// Run a docker command and return its stdout
    async fn run_docker(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "running docker");

        let output = Command::new(&self.docker_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            if stderr.contains("No such object") || stderr.contains("No such container") {
                return Err(DockerError::NotFound(args.last().unwrap_or(&"").to_string()));
            }
            return Err(DockerError::CommandFailed {
                command: format!("docker {}", args.first().unwrap_or(&"")),
                reason: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        Ok(stdout)
    }

    async fn inspect_health(&self, id: &str) -> Result<Option<InspectHealth>> {
        let raw = self.run_docker(&["inspect", "--type", "container", id]).await?;
        let mut parsed: Vec<InspectOutput> =
            serde_json::from_str(&raw).map_err(|e| DockerError::parse("docker inspect", e))?;

        match parsed.pop() {
            Some(inspect) => {
                debug!(id = %inspect.id, has_health = inspect.state.health.is_some(), "inspected container");
                Ok(inspect.state.health)
            }
            None => Err(DockerError::NotFound(id.to_string())),
        }
    }

    /// Parse `docker ps --format '{{json .}}'` output, one object per line
    pub fn parse_ps(output: &str) -> Result<Vec<Container>> {
        output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).map_err(|e| DockerError::parse("docker ps", e)))
            .collect()
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        "docker"
    }

    #[instrument(skip(self))]
    async fn server_version(&self) -> Result<String> {
        let raw = self
            .run_docker(&["version", "--format", "{{.Server.Version}}"])
            .await?;
        let version = raw.trim();
        if version.is_empty() {
            return Err(DockerError::parse("docker version", "empty server version"));
        }
        Ok(version.to_string())
    }

    #[instrument(skip(self))]
    async fn list_containers(&self) -> Result<Vec<Container>> {
        let raw = self
            .run_docker(&["ps", "--no-trunc", "--format", "{{json .}}"])
            .await?;
        let containers = Self::parse_ps(&raw)?;
        debug!(count = containers.len(), "listed containers");
        Ok(containers)
    }

    async fn has_health_check(&self, id: &str) -> Result<bool> {
        Ok(self.inspect_health(id).await?.is_some())
    }

    async fn health_state(&self, id: &str) -> Result<HealthState> {
        self.inspect_health(id)
            .await?
            .map(|h| h.status)
            .ok_or_else(|| DockerError::CommandFailed {
                command: "docker inspect".to_string(),
                reason: format!("container {} has no health check", id),
            })
    }

    async fn health_log(&self, id: &str) -> Result<Vec<HealthLogEntry>> {
        Ok(self
            .inspect_health(id)
            .await?
            .and_then(|h| h.log)
            .unwrap_or_default())
    }
}
