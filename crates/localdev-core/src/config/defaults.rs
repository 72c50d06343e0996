//! Default configuration values

use std::path::PathBuf;

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "localdev.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "localdev.yaml";

/// Directory under the home directory holding global config and logs
pub const HOME_DIR_NAME: &str = ".localdev";

/// Suffixes recognised for project definition files
pub const PROJECT_FILE_SUFFIXES: [&str; 4] = [
    ".project.json",
    ".project.toml",
    ".project.yaml",
    ".project.yml",
];

/// Default number of lines in the output window
pub const DEFAULT_DISPLAY_LINES: usize = 6;

/// Default number of columns kept free at the right edge of the window
pub const DEFAULT_DISPLAY_MARGIN: usize = 10;

/// Default tab expansion width
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Default pause after tearing down a window, in milliseconds
pub const DEFAULT_SETTLE_MS: u64 = 100;

/// Default health wait timeout, in seconds
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 30;

/// Default health poll interval, in milliseconds
pub const DEFAULT_HEALTH_POLL_MS: u64 = 1000;

/// Default health log refresh interval, in milliseconds
pub const DEFAULT_HEALTH_LOG_MS: u64 = 250;

/// Oldest Docker server version `localdev doctor` accepts
pub const DEFAULT_MIN_DOCKER_VERSION: &str = "18.09.0";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".localdev.toml",
        ".localdev.yaml",
    ]
}

/// `~/.localdev`, if a home directory is known
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(HOME_DIR_NAME))
}

/// Global fallback config at `~/.localdev/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    home_dir().map(|d| d.join("config.toml"))
}

/// Default workspace root used when the config does not name one
pub fn default_workspace_root() -> String {
    "~/src".to_string()
}

/// Configuration template written for new workspaces
pub const DEFAULT_CONFIG_TEMPLATE: &str = r##"# localdev configuration

workspace_root = "~/src"
# projects_dir = "projects"

[display]
lines = 6
margin = 10

[health]
timeout_secs = 30
poll_interval_ms = 1000

[scheduler]
fuse = 200

[doctor]
min_docker_version = "18.09.0"

# Variables `localdev doctor` expects; an empty value only requires it to be set
# [doctor.env]
# APP_ENV = "local"
# DOCKER_HOST = ""

# [projects.api]
# repo = "api"
# name = "api"
# groups = ["backend"]
# build_cmd = [{ command = "make build", path = "#PROJECT_ROOT#" }]
# run_cmd = [{ command = "docker compose -p #NAME# up -d", path = "#PROJECT_ROOT#" }]
# depends_on = { compile = [], run = ["db"] }
"##;
