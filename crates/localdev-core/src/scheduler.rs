//! Topological scheduling of projects

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{Result, SelectionError};
use crate::project::DependencyKind;
use crate::registry::ProjectRegistry;

/// Default bound on scheduling passes
pub const DEFAULT_FUSE: usize = 200;

/// Order in which projects should be processed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// Projects in execution order (dependencies first)
    pub order: Vec<String>,
    /// Projects grouped by the pass that scheduled them
    pub waves: Vec<Vec<String>>,
    /// Projects that could not be scheduled (cycles, or depending on a cycle)
    pub unresolved: BTreeSet<String>,
}

impl ExecutionPlan {
    /// Whether every requested project was scheduled
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Index of a project in the order
    pub fn position(&self, key: &str) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }
}

/// Pass-based topological scheduler
///
/// Each pass schedules every remaining project whose dependencies are already in the
/// order, in ascending key order. Dependencies outside the subset count as satisfied.
/// Scheduling stops when a pass makes no progress or the fuse runs out; whatever is
/// left is reported as unresolved instead of failing the run.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    fuse: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self { fuse: DEFAULT_FUSE }
    }
}

impl Scheduler {
    /// Create a scheduler with the default fuse
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of passes
    pub fn with_fuse(mut self, fuse: usize) -> Self {
        self.fuse = fuse.max(1);
        self
    }

    /// Maximum number of passes
    pub fn fuse(&self) -> usize {
        self.fuse
    }

    /// Compute the execution order for `subset`
    #[instrument(skip_all, fields(subset = subset.len(), kind = %kind, fuse = self.fuse))]
    pub fn schedule(
        &self,
        registry: &ProjectRegistry,
        subset: &BTreeSet<String>,
        kind: DependencyKind,
    ) -> Result<ExecutionPlan> {
        let mut remaining: Vec<(&str, Vec<&str>)> = Vec::with_capacity(subset.len());
        for key in subset {
            let project = registry
                .get(key)
                .ok_or_else(|| SelectionError::UnknownProject(key.clone()))?;
            let deps = project
                .dependencies(kind)
                .into_iter()
                .filter(|dep| subset.contains(*dep))
                .collect();
            remaining.push((key.as_str(), deps));
        }

        let mut plan = ExecutionPlan::default();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut passes = 0usize;

        while !remaining.is_empty() && passes < self.fuse {
            passes += 1;

            let (ready, blocked): (Vec<_>, Vec<_>) = remaining
                .into_iter()
                .partition(|(_, deps)| deps.iter().all(|dep| placed.contains(dep)));
            remaining = blocked;

            if ready.is_empty() {
                warn!(passes, left = remaining.len(), "no schedulable project left, giving up");
                break;
            }

            let wave: Vec<String> = ready.iter().map(|(key, _)| key.to_string()).collect();
            for (key, _) in ready {
                placed.insert(key);
            }
            plan.order.extend(wave.iter().cloned());
            plan.waves.push(wave);
        }

        plan.unresolved = remaining.iter().map(|(key, _)| key.to_string()).collect();

        info!(
            scheduled = plan.order.len(),
            unresolved = plan.unresolved.len(),
            passes,
            "execution order computed"
        );
        Ok(plan)
    }
}
