//! Container and health types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A running container as reported by `docker ps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Container id
    #[serde(rename = "ID")]
    pub id: String,
    /// Container names (without a leading slash on the CLI, with one on the API)
    #[serde(rename = "Names", deserialize_with = "comma_list")]
    pub names: Vec<String>,
    /// Image reference
    #[serde(rename = "Image", default)]
    pub image: String,
    /// Lifecycle state, e.g. `running`
    #[serde(rename = "State", default)]
    pub state: String,
    /// Human readable status, e.g. `Up 3 minutes (healthy)`
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl Container {
    /// Create a container with a single name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            names: vec![name.into()],
            image: String::new(),
            state: "running".to_string(),
            status: String::new(),
        }
    }

    /// Short form of the id
    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }
}

fn comma_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Health status of a container that declares a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Still inside the start period or no probe has passed yet
    Starting,
    /// Last probe passed
    Healthy,
    /// Probes are failing
    Unhealthy,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        };
        write!(f, "{}", s)
    }
}

/// One health probe result from the container's health log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthLogEntry {
    /// When the probe started; unique per entry
    pub start: DateTime<Utc>,
    /// When the probe finished
    pub end: DateTime<Utc>,
    /// Probe exit code
    pub exit_code: i64,
    /// Captured probe output
    #[serde(default)]
    pub output: String,
}

/// Subset of `docker inspect` output
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectOutput {
    pub id: String,
    #[serde(default)]
    pub state: InspectState,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectState {
    #[serde(default)]
    pub health: Option<InspectHealth>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InspectHealth {
    pub status: HealthState,
    #[serde(default)]
    pub log: Option<Vec<HealthLogEntry>>,
}
