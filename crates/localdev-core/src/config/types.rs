//! Configuration types

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::project::Project;
use crate::scheduler::DEFAULT_FUSE;

use super::defaults::*;

/// Main configuration for localdev
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding every project checkout (`#WORKSPACE_ROOT#`)
    pub workspace_root: String,

    /// Directory of `*.project.{json,toml,yaml}` files, relative to the config file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_dir: Option<PathBuf>,

    /// Inline project definitions keyed by project key
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, Project>,

    /// Output window configuration
    pub display: DisplayConfig,

    /// Container health wait configuration
    pub health: HealthConfig,

    /// Scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Environment checks run by `localdev doctor`
    pub doctor: DoctorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            projects_dir: None,
            projects: BTreeMap::new(),
            display: DisplayConfig::default(),
            health: HealthConfig::default(),
            scheduler: SchedulerConfig::default(),
            doctor: DoctorConfig::default(),
        }
    }
}

impl Config {
    /// Workspace root with a leading `~` expanded to the home directory
    pub fn workspace_root(&self) -> String {
        expand_home(&self.workspace_root)
    }
}

/// Expand a leading `~` or `~/` using the current user's home directory
pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => format!("{}{}", home.display(), rest),
        None => path.to_string(),
    }
}

/// Output window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Number of visible output lines
    pub lines: usize,

    /// Columns left free at the right edge
    pub margin: usize,

    /// Spaces per tab
    pub tab_width: usize,

    /// Pause after erasing the window, in milliseconds
    pub settle_ms: u64,

    /// Fixed terminal width; detected from the terminal when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            lines: DEFAULT_DISPLAY_LINES,
            margin: DEFAULT_DISPLAY_MARGIN,
            tab_width: DEFAULT_TAB_WIDTH,
            settle_ms: DEFAULT_SETTLE_MS,
            width: None,
        }
    }
}

impl DisplayConfig {
    /// Settle pause as a duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Container health wait configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Give up waiting after this many seconds
    pub timeout_secs: u64,

    /// Interval between health probes
    pub poll_interval_ms: u64,

    /// Interval between health log refreshes
    pub log_interval_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_HEALTH_POLL_MS,
            log_interval_ms: DEFAULT_HEALTH_LOG_MS,
        }
    }
}

impl HealthConfig {
    /// Timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Log refresh interval as a duration
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of scheduling passes
    pub fuse: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { fuse: DEFAULT_FUSE }
    }
}

/// Environment checks run by `localdev doctor`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DoctorConfig {
    /// Oldest acceptable Docker server version
    pub min_docker_version: String,

    /// Required environment variables mapped to their expected value;
    /// an empty value only requires the variable to be set
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            min_docker_version: DEFAULT_MIN_DOCKER_VERSION.to_string(),
            env: BTreeMap::new(),
        }
    }
}
