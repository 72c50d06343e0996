//! Project registry and selection

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{Result, SelectionError};
use crate::graph::DependencyGraph;
use crate::project::{DependencyKind, Project};

/// How the user picked the projects to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every registered project
    All,
    /// Projects that are members of a group
    Group(String),
    /// A single project, by key or by name
    Project(String),
}

impl Selection {
    /// Build a selection from the common CLI flags, in priority order all > group > project
    pub fn from_flags(all: bool, group: Option<&str>, project: Option<&str>) -> Option<Self> {
        if all {
            Some(Self::All)
        } else if let Some(group) = group.filter(|g| !g.is_empty()) {
            Some(Self::Group(group.to_string()))
        } else {
            project
                .filter(|p| !p.is_empty())
                .map(|p| Self::Project(p.to_string()))
        }
    }
}

/// Read-only map of project key to project record
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, Project>,
}

impl ProjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a project under `key`, returning the previous record if any
    pub fn insert(&mut self, key: impl Into<String>, mut project: Project) -> Option<Project> {
        let key = key.into();
        project.key = key.clone();
        self.projects.insert(key, project)
    }

    /// Builder-style insert keyed by the project's own key
    pub fn with(mut self, project: Project) -> Self {
        let key = project.key.clone();
        self.insert(key, project);
        self
    }

    /// Look up a project by key
    pub fn get(&self, key: &str) -> Option<&Project> {
        self.projects.get(key)
    }

    /// Whether a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.projects.contains_key(key)
    }

    /// Number of registered projects
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Iterate over projects in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Project)> {
        self.projects.iter()
    }

    /// Find a project by its `name` field
    pub fn by_name(&self, name: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.name == name)
    }

    /// Keys of all projects in a group
    pub fn by_group(&self, group: &str) -> BTreeSet<String> {
        self.projects
            .iter()
            .filter(|(_, p)| p.in_group(group))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Resolve a selection to a non-empty set of project keys
    pub fn select(&self, selection: &Selection) -> Result<BTreeSet<String>> {
        let keys: BTreeSet<String> = match selection {
            Selection::All => self.projects.keys().cloned().collect(),
            Selection::Group(group) => self.by_group(group),
            Selection::Project(wanted) => {
                if self.contains(wanted) {
                    BTreeSet::from([wanted.clone()])
                } else if let Some(project) = self.by_name(wanted) {
                    BTreeSet::from([project.key.clone()])
                } else {
                    return Err(SelectionError::UnknownProject(wanted.clone()).into());
                }
            }
        };

        if keys.is_empty() {
            return Err(SelectionError::Empty.into());
        }
        debug!(?selection, count = keys.len(), "selection resolved");
        Ok(keys)
    }

    /// Resolve a selection and add every transitive dependency of `kind`
    pub fn select_with_dependencies(
        &self,
        selection: &Selection,
        kind: DependencyKind,
    ) -> Result<BTreeSet<String>> {
        let selected = self.select(selection)?;
        let graph = DependencyGraph::build(self, &selected, kind)?;
        Ok(graph.projects().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProjectRegistry {
        ProjectRegistry::new()
            .with(Project::new("db", "postgres").with_group("infra"))
            .with(Project::new("cache", "redis").with_group("infra"))
            .with(Project::new("api", "api-server").with_group("apps").with_run_dep("db"))
            .with(
                Project::new("web", "frontend")
                    .with_group("apps")
                    .with_run_dep("api")
                    .with_compile_dep("ui-kit"),
            )
            .with(Project::new("ui-kit", "ui-kit"))
    }

    #[test]
    fn test_select_all() {
        let keys = registry().select(&Selection::All).unwrap();
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_select_group() {
        let keys = registry().select(&Selection::Group("infra".into())).unwrap();
        assert_eq!(keys, BTreeSet::from(["cache".to_string(), "db".to_string()]));
    }

    #[test]
    fn test_select_by_key_or_name() {
        let reg = registry();
        let by_key = reg.select(&Selection::Project("api".into())).unwrap();
        let by_name = reg.select(&Selection::Project("api-server".into())).unwrap();
        assert_eq!(by_key, by_name);
    }

    #[test]
    fn test_empty_selection_is_error() {
        let err = registry()
            .select(&Selection::Group("nobody".into()))
            .unwrap_err();
        assert!(err.to_string().contains("no projects"));
    }

    #[test]
    fn test_unknown_project_is_error() {
        assert!(registry().select(&Selection::Project("ghost".into())).is_err());
    }

    #[test]
    fn test_select_with_run_dependencies() {
        let keys = registry()
            .select_with_dependencies(&Selection::Project("web".into()), DependencyKind::Run)
            .unwrap();
        assert_eq!(
            keys,
            BTreeSet::from(["api".to_string(), "db".to_string(), "web".to_string()])
        );
    }

    #[test]
    fn test_select_with_compile_dependencies() {
        let keys = registry()
            .select_with_dependencies(&Selection::Project("web".into()), DependencyKind::Compile)
            .unwrap();
        assert_eq!(keys, BTreeSet::from(["ui-kit".to_string(), "web".to_string()]));
    }

    #[test]
    fn test_from_flags_priority() {
        assert_eq!(Selection::from_flags(true, Some("g"), Some("p")), Some(Selection::All));
        assert_eq!(
            Selection::from_flags(false, Some("g"), Some("p")),
            Some(Selection::Group("g".into()))
        );
        assert_eq!(
            Selection::from_flags(false, Some(""), Some("p")),
            Some(Selection::Project("p".into()))
        );
        assert_eq!(Selection::from_flags(false, None, None), None);
    }
}
