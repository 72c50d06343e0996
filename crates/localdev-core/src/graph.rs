//! Dependency graph between registered projects

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{Result, SelectionError};
use crate::project::DependencyKind;
use crate::registry::ProjectRegistry;

/// Forward and reverse dependency edges for one dependency kind
///
/// Built fresh for every invocation. The key set is the closure of the requested
/// subset under "depends on", so every project reachable from the subset appears
/// in both maps.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    /// Which relation the edges follow
    kind: DependencyKind,
    /// Project key -> direct dependencies
    forward: BTreeMap<String, Vec<String>>,
    /// Project key -> projects that directly depend on it
    reverse: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph for `subset`, expanding it until no new project keys are discovered
    #[instrument(skip_all, fields(subset = subset.len(), kind = %kind))]
    pub fn build(
        registry: &ProjectRegistry,
        subset: &BTreeSet<String>,
        kind: DependencyKind,
    ) -> Result<Self> {
        let mut forward: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut reverse: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let mut seen: BTreeSet<String> = subset.clone();
        let mut frontier: VecDeque<String> = subset.iter().cloned().collect();
        let mut passes = 0usize;

        while !frontier.is_empty() {
            passes += 1;
            let mut discovered: VecDeque<String> = VecDeque::new();

            while let Some(key) = frontier.pop_front() {
                let project = registry
                    .get(&key)
                    .ok_or_else(|| SelectionError::UnknownProject(key.clone()))?;

                reverse.entry(key.clone()).or_default();

                let deps: Vec<String> = project
                    .dependencies(kind)
                    .into_iter()
                    .map(str::to_string)
                    .collect();

                for dep in &deps {
                    if !registry.contains(dep) {
                        return Err(SelectionError::UnknownDependency {
                            project: key.clone(),
                            dependency: dep.clone(),
                        }
                        .into());
                    }

                    let dependents = reverse.entry(dep.clone()).or_default();
                    if !dependents.contains(&key) {
                        dependents.push(key.clone());
                    }

                    if seen.insert(dep.clone()) {
                        discovered.push_back(dep.clone());
                    }
                }

                forward.insert(key, deps);
            }

            frontier = discovered;
        }

        for dependents in reverse.values_mut() {
            dependents.sort();
        }

        debug!(projects = forward.len(), passes, "dependency graph built");

        Ok(Self {
            kind,
            forward,
            reverse,
        })
    }

    /// The dependency kind the edges follow
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// All project keys in the graph, in key order
    pub fn projects(&self) -> impl Iterator<Item = &String> {
        self.forward.keys()
    }

    /// Number of projects in the graph
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Whether a project is part of the graph
    pub fn contains(&self, key: &str) -> bool {
        self.forward.contains_key(key)
    }

    /// Forward edges
    pub fn forward(&self) -> &BTreeMap<String, Vec<String>> {
        &self.forward
    }

    /// Reverse edges
    pub fn reverse(&self) -> &BTreeMap<String, Vec<String>> {
        &self.reverse
    }

    /// Direct dependencies of a project
    pub fn dependencies(&self, key: &str) -> &[String] {
        self.forward.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Projects that directly depend on `key`
    pub fn dependents(&self, key: &str) -> &[String] {
        self.reverse.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Projects without dependencies of this kind
    pub fn roots(&self) -> Vec<&str> {
        self.forward
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Render one ASCII tree per root, each listing what depends on it
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for root in self.roots() {
            out.push_str(root);
            out.push('\n');

            let mut path = vec![root];
            let children = self.dependents(root);
            for (i, child) in children.iter().enumerate() {
                self.render_node(child, "", i == children.len() - 1, &mut path, &mut out);
            }
            out.push('\n');
        }
        out
    }

    fn render_node<'a>(
        &'a self,
        key: &'a str,
        prefix: &str,
        is_last: bool,
        path: &mut Vec<&'a str>,
        out: &mut String,
    ) {
        let connector = if is_last { "└─ " } else { "├─ " };

        if path.contains(&key) {
            out.push_str(&format!("{}{}{} (cycle)\n", prefix, connector, key));
            return;
        }
        out.push_str(&format!("{}{}{}\n", prefix, connector, key));

        let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
        path.push(key);
        let children = self.dependents(key);
        for (i, child) in children.iter().enumerate() {
            self.render_node(child, &child_prefix, i == children.len() - 1, path, out);
        }
        path.pop();
    }
}
