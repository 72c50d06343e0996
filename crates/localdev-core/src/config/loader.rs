//! Configuration loading

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};
use crate::project::Project;
use crate::registry::ProjectRegistry;

use super::defaults::{config_file_names, global_config_path, PROJECT_FILE_SUFFIXES};
use super::types::Config;
use super::validation::{validate_config, validate_project};

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = Format::of(path);
    info!(path = %path.display(), ?format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = match format {
        Format::Toml => toml::from_str(&content).map_err(ConfigError::TomlError)?,
        Format::Json => serde_json::from_str(&content).map_err(ConfigError::JsonError)?,
        Format::Yaml => serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?,
    };

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find a configuration file in a directory or its parents
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.is_file() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Find a configuration file, falling back to `~/.localdev/config.toml`
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    find_config(start_dir).or_else(|| {
        global_config_path().filter(|p| {
            let exists = p.is_file();
            if exists {
                info!(path = %p.display(), "using global config file");
            }
            exists
        })
    })
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path =
        discover_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults when no file exists
///
/// A file that exists but fails to load is still an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match discover_config(dir) {
        Some(path) => Ok((load_config(&path)?, Some(path))),
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

/// Whether a file name looks like a project definition file
pub fn is_project_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| PROJECT_FILE_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Load a project definition file (map of project key to project record)
pub fn load_project_file(path: &Path) -> Result<BTreeMap<String, Project>> {
    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
    let parse_error = |message: String| ConfigError::ParseError {
        path: path.to_path_buf(),
        message,
    };

    let projects: BTreeMap<String, Project> = match Format::of(path) {
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        Format::Yaml => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
    };

    debug!(path = %path.display(), count = projects.len(), "project file loaded");
    Ok(projects)
}

/// Load every project file in a directory, in file name order
pub fn load_projects_dir(dir: &Path) -> Result<Vec<(PathBuf, BTreeMap<String, Project>)>> {
    if !dir.is_dir() {
        return Err(ConfigError::NotFound(dir.to_path_buf()).into());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(ConfigError::Io)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_project_file(p))
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|path| load_project_file(&path).map(|projects| (path, projects)))
        .collect()
}

/// Build the project registry from inline projects and the projects directory
///
/// `projects_dir` is resolved relative to the config file's directory.
pub fn build_registry(config: &Config, config_path: Option<&Path>) -> Result<ProjectRegistry> {
    let mut registry = ProjectRegistry::new();

    for (key, project) in &config.projects {
        registry.insert(key.clone(), project.clone());
    }

    if let Some(projects_dir) = &config.projects_dir {
        let dir = match config_path.and_then(Path::parent) {
            Some(base) if projects_dir.is_relative() => base.join(projects_dir),
            _ => projects_dir.clone(),
        };

        for (path, projects) in load_projects_dir(&dir)? {
            for (key, project) in projects {
                validate_project(&key, &project)?;
                if registry.contains(&key) {
                    return Err(ConfigError::DuplicateProject {
                        key,
                        source_name: path.display().to_string(),
                    }
                    .into());
                }
                registry.insert(key, project);
            }
        }
    }

    info!(projects = registry.len(), "project registry built");
    Ok(registry)
}

/// A loaded configuration together with its project registry
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Parsed configuration
    pub config: Config,
    /// File the configuration came from, if any
    pub config_path: Option<PathBuf>,
    /// Projects known to this workspace
    pub registry: ProjectRegistry,
}

impl Workspace {
    /// Load the workspace from an explicit config file, or by discovery from `dir`
    pub fn load(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        let (config, config_path) = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()).into());
                }
                (load_config(path)?, Some(path.to_path_buf()))
            }
            None => load_config_or_default(dir)?,
        };

        let registry = build_registry(&config, config_path.as_deref())?;
        Ok(Self {
            config,
            config_path,
            registry,
        })
    }

    /// Workspace root with `~` expanded
    pub fn workspace_root(&self) -> String {
        self.config.workspace_root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECT_JSON: &str = r##"{
        "api": {
            "repo": "api",
            "name": "api",
            "groups": ["backend"],
            "run_cmd": [{"command": "docker compose -p #NAME# up -d", "path": "#PROJECT_ROOT#"}],
            "depends_on": {"run": ["db"]}
        },
        "db": {
            "repo": "db",
            "name": "db",
            "groups": ["backend"]
        }
    }"##;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("localdev.toml");
        std::fs::write(&config_path, "workspace_root = \"/src\"\n").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("localdev.toml");
        std::fs::write(&toml_path, "workspace_root = \"/src\"\n").unwrap();
        std::fs::write(temp.path().join("localdev.yaml"), "workspace_root: /src\n").unwrap();

        assert_eq!(find_config(temp.path()).unwrap(), toml_path);
    }

    #[test]
    fn test_find_config_walks_parents() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(".localdev.yaml");
        std::fs::write(&config_path, "workspace_root: /src\n").unwrap();
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config(&nested).unwrap(), config_path);
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("localdev.yaml");
        std::fs::write(
            &config_path,
            "workspace_root: /work\nhealth:\n  timeout_secs: 5\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.workspace_root, "/work");
        assert_eq!(config.health.timeout_secs, 5);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("localdev.toml");
        std::fs::write(&config_path, "[scheduler]\nfuse = 0\n").unwrap();

        let err = load_config(&config_path).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_workspace_with_projects_dir() {
        let temp = TempDir::new().unwrap();
        let projects = temp.path().join("projects");
        std::fs::create_dir_all(&projects).unwrap();
        std::fs::write(projects.join("backend.project.json"), PROJECT_JSON).unwrap();
        std::fs::write(projects.join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            projects.join("web.project.yaml"),
            "web:\n  repo: web\n  name: web\n  depends_on:\n    run: [api]\n",
        )
        .unwrap();
        std::fs::write(
            temp.path().join("localdev.toml"),
            "workspace_root = \"/work\"\nprojects_dir = \"projects\"\n\n[projects.tools]\nname = \"tools\"\n",
        )
        .unwrap();

        let ws = Workspace::load(temp.path(), None).unwrap();
        assert_eq!(ws.registry.len(), 4);
        assert_eq!(ws.workspace_root(), "/work");

        let api = ws.registry.get("api").unwrap();
        assert_eq!(api.key, "api");
        assert_eq!(api.depends_on.run, vec!["db"]);
        assert_eq!(ws.registry.get("tools").unwrap().key, "tools");
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let temp = TempDir::new().unwrap();
        let projects = temp.path().join("projects");
        std::fs::create_dir_all(&projects).unwrap();
        std::fs::write(projects.join("a.project.json"), PROJECT_JSON).unwrap();
        std::fs::write(projects.join("b.project.toml"), "[db]\nname = \"db\"\n").unwrap();
        let config_path = temp.path().join("localdev.toml");
        std::fs::write(&config_path, "projects_dir = \"projects\"\n").unwrap();

        let err = Workspace::load(temp.path(), Some(&config_path)).unwrap_err();
        assert!(err.to_string().contains("'db'"));
    }

    #[test]
    fn test_malformed_project_file_names_path() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("bad.project.json");
        std::fs::write(&file, "{ not json").unwrap();

        let err = load_project_file(&file).unwrap_err();
        assert!(err.to_string().contains("bad.project.json"));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(Workspace::load(temp.path(), Some(&missing)).is_err());
    }
}
