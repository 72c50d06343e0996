//! Project records and command templates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

/// Placeholder replaced with the project's name
pub const PLACEHOLDER_NAME: &str = "#NAME#";
/// Placeholder replaced with `<workspace_root>/<repo>`
pub const PLACEHOLDER_PROJECT_ROOT: &str = "#PROJECT_ROOT#";
/// Placeholder replaced with the repository identifier
pub const PLACEHOLDER_REPO: &str = "#REPO#";
/// Placeholder replaced with the workspace root
pub const PLACEHOLDER_WORKSPACE_ROOT: &str = "#WORKSPACE_ROOT#";

/// Which dependency relation to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Build-time dependencies
    Compile,
    /// Runtime dependencies
    Run,
    /// Union of compile and run dependencies
    Both,
}

impl DependencyKind {
    /// Returns the string representation of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Run => "run",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compile" | "build" => Ok(Self::Compile),
            "run" => Ok(Self::Run),
            "both" | "all" => Ok(Self::Both),
            _ => Err(SelectionError::UnknownKind(s.to_string())),
        }
    }
}

/// Dependency lists keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependsOn {
    /// Projects that must be built first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compile: Vec<String>,
    /// Projects that must be running first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run: Vec<String>,
}

/// A command string plus the directory it runs in, both possibly containing placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplate {
    /// Command line, e.g. `make build NAME=#NAME#`
    pub command: String,
    /// Working directory, e.g. `#PROJECT_ROOT#`
    pub path: String,
}

impl CommandTemplate {
    /// Create a new command template
    pub fn new(command: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            path: path.into(),
        }
    }
}

/// A command template with every placeholder substituted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    /// Resolved command line
    pub command: String,
    /// Resolved working directory (empty means the current directory)
    pub dir: String,
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.command)
        } else {
            write!(f, "cd {} && {}", self.dir, self.command)
        }
    }
}

/// A project record as read from the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Registry key, filled in by the registry from the map key
    #[serde(skip)]
    pub key: String,
    /// Repository identifier (directory name under the workspace root)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo: String,
    /// Human readable system name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Group memberships
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Default branch
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_version: String,
    /// Build command templates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub build_cmd: Vec<CommandTemplate>,
    /// Run command templates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run_cmd: Vec<CommandTemplate>,
    /// Dependency lists
    pub depends_on: DependsOn,
}

impl Project {
    /// Create a new project with a key and name
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the repository identifier
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = repo.into();
        self
    }

    /// Add a group membership
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Add a compile-time dependency
    pub fn with_compile_dep(mut self, key: impl Into<String>) -> Self {
        self.depends_on.compile.push(key.into());
        self
    }

    /// Add a runtime dependency
    pub fn with_run_dep(mut self, key: impl Into<String>) -> Self {
        self.depends_on.run.push(key.into());
        self
    }

    /// Add a build command
    pub fn with_build_cmd(mut self, command: impl Into<String>, path: impl Into<String>) -> Self {
        self.build_cmd.push(CommandTemplate::new(command, path));
        self
    }

    /// Add a run command
    pub fn with_run_cmd(mut self, command: impl Into<String>, path: impl Into<String>) -> Self {
        self.run_cmd.push(CommandTemplate::new(command, path));
        self
    }

    /// Repository name, falling back to the project name
    pub fn repo_name(&self) -> &str {
        if self.repo.is_empty() {
            &self.name
        } else {
            &self.repo
        }
    }

    /// Display name, falling back to the registry key
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.key
        } else {
            &self.name
        }
    }

    /// Root directory of the project's checkout
    pub fn root_path(&self, workspace_root: &str) -> String {
        format!("{}/{}", workspace_root.trim_end_matches('/'), self.repo_name())
    }

    /// Direct dependencies for the given kind
    ///
    /// `Both` yields run dependencies followed by compile dependencies, without duplicates.
    pub fn dependencies(&self, kind: DependencyKind) -> Vec<&str> {
        match kind {
            DependencyKind::Compile => self.depends_on.compile.iter().map(String::as_str).collect(),
            DependencyKind::Run => self.depends_on.run.iter().map(String::as_str).collect(),
            DependencyKind::Both => {
                let mut deps: Vec<&str> = Vec::new();
                for dep in self.depends_on.run.iter().chain(&self.depends_on.compile) {
                    if !deps.contains(&dep.as_str()) {
                        deps.push(dep);
                    }
                }
                deps
            }
        }
    }

    /// Whether the project belongs to a group
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    fn replacements(&self, workspace_root: &str) -> [(&'static str, String); 4] {
        [
            (PLACEHOLDER_NAME, self.name.clone()),
            (PLACEHOLDER_PROJECT_ROOT, self.root_path(workspace_root)),
            (PLACEHOLDER_REPO, self.repo.clone()),
            (PLACEHOLDER_WORKSPACE_ROOT, workspace_root.to_string()),
        ]
    }

    /// Substitute every placeholder in `input`
    pub fn substitute(&self, input: &str, workspace_root: &str) -> String {
        let mut out = input.to_string();
        for (token, value) in self.replacements(workspace_root) {
            out = out.replace(token, &value);
        }
        out
    }

    /// Resolve a command template against this project
    pub fn resolve(&self, template: &CommandTemplate, workspace_root: &str) -> ResolvedCommand {
        ResolvedCommand {
            command: self.substitute(&template.command, workspace_root),
            dir: self.substitute(&template.path, workspace_root),
        }
    }

    /// Resolve all build commands
    pub fn build_commands(&self, workspace_root: &str) -> Vec<ResolvedCommand> {
        self.build_cmd
            .iter()
            .map(|t| self.resolve(t, workspace_root))
            .collect()
    }

    /// Resolve all run commands
    pub fn run_commands(&self, workspace_root: &str) -> Vec<ResolvedCommand> {
        self.run_cmd
            .iter()
            .map(|t| self.resolve(t, workspace_root))
            .collect()
    }

    /// Render an aligned, human readable summary of the project
    pub fn details(&self, workspace_root: &str) -> String {
        let mut rows: Vec<(&str, String)> = Vec::new();

        if !self.name.is_empty() {
            rows.push(("System name", self.name.clone()));
        }
        if !self.default_version.is_empty() {
            rows.push(("Default branch", self.default_version.clone()));
        }
        if !self.repo.is_empty() {
            rows.push(("Repo", self.repo.clone()));
        }
        push_list(&mut rows, "Groups", self.groups.iter().cloned());
        push_list(&mut rows, "Build Dependencies", self.depends_on.compile.iter().cloned());
        push_list(&mut rows, "Run Dependencies", self.depends_on.run.iter().cloned());
        push_list(
            &mut rows,
            "Build Commands",
            self.build_commands(workspace_root).iter().map(ToString::to_string),
        );
        push_list(
            &mut rows,
            "Run Commands",
            self.run_commands(workspace_root).iter().map(ToString::to_string),
        );

        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 3;
        let mut out = String::new();
        for (label, value) in rows {
            out.push_str(&format!("{:<width$}{}\n", label, value, width = width));
        }
        out
    }
}

/// Push a labelled list, printing the label only on the first row
fn push_list<'a>(rows: &mut Vec<(&'a str, String)>, label: &'a str, values: impl Iterator<Item = String>) {
    for (i, value) in values.enumerate() {
        rows.push((if i == 0 { label } else { "" }, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> Project {
        Project::new("api", "api-server")
            .with_repo("backend")
            .with_group("core")
            .with_compile_dep("lib")
            .with_run_dep("db")
            .with_run_dep("lib")
            .with_build_cmd("make build NAME=#NAME#", "#PROJECT_ROOT#")
            .with_run_cmd("docker compose -p #REPO# up -d", "#WORKSPACE_ROOT#/#REPO#/deploy")
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("build".parse::<DependencyKind>().unwrap(), DependencyKind::Compile);
        assert_eq!("compile".parse::<DependencyKind>().unwrap(), DependencyKind::Compile);
        assert_eq!("RUN".parse::<DependencyKind>().unwrap(), DependencyKind::Run);
        assert_eq!("both".parse::<DependencyKind>().unwrap(), DependencyKind::Both);
        assert!("deploy".parse::<DependencyKind>().is_err());
    }

    #[test]
    fn test_dependencies_by_kind() {
        let p = api();
        assert_eq!(p.dependencies(DependencyKind::Compile), vec!["lib"]);
        assert_eq!(p.dependencies(DependencyKind::Run), vec!["db", "lib"]);
        assert_eq!(p.dependencies(DependencyKind::Both), vec!["db", "lib"]);
    }

    #[test]
    fn test_resolve_placeholders() {
        let p = api();
        let cmds = p.build_commands("/home/dev/src");
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].command, "make build NAME=api-server");
        assert_eq!(cmds[0].dir, "/home/dev/src/backend");

        let run = p.run_commands("/home/dev/src/");
        assert_eq!(run[0].command, "docker compose -p backend up -d");
        assert_eq!(run[0].dir, "/home/dev/src//backend/deploy");
    }

    #[test]
    fn test_placeholders_are_case_sensitive() {
        let p = api();
        assert_eq!(p.substitute("#name# #NAME#", "/w"), "#name# api-server");
    }

    #[test]
    fn test_repo_name_fallback() {
        let p = Project::new("web", "frontend");
        assert_eq!(p.repo_name(), "frontend");
        assert_eq!(p.with_repo("web-repo").repo_name(), "web-repo");
    }

    #[test]
    fn test_details_alignment() {
        let details = api().details("/src");
        assert!(details.contains("System name"));
        assert!(details.contains("Run Dependencies"));
        assert!(details.contains("cd /src/backend && make build NAME=api-server"));

        // Every value starts in the same column
        let column = "Build Dependencies".len() + 3;
        for line in details.lines() {
            assert!(line.len() > column);
            assert_ne!(line.as_bytes()[column], b' ');
        }
    }

    #[test]
    fn test_deserialize_original_shape() {
        let json = r##"{
            "repo": "backend",
            "name": "api",
            "groups": ["core"],
            "build_cmd": [{"command": "make", "path": "#PROJECT_ROOT#"}],
            "depends_on": {"run": ["db"]}
        }"##;
        let p: Project = serde_json::from_str(json).unwrap();
        assert_eq!(p.name, "api");
        assert_eq!(p.depends_on.run, vec!["db"]);
        assert!(p.depends_on.compile.is_empty());
        assert_eq!(p.build_cmd[0].path, "#PROJECT_ROOT#");
    }
}
