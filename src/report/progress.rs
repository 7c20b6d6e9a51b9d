//! Per-collection progress: how many children of each project are done.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Progress {
    total: usize,
    done: usize,
}

/// Shared between workers; every method takes `&self`.
#[derive(Debug, Default)]
pub struct ProjectProgressTracker {
    projects: Mutex<HashMap<String, Progress>>,
}

impl ProjectProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `project` with `total` children. Only the first call counts.
    pub fn register(&self, project: &str, total: usize) -> bool {
        let mut projects = self.projects.lock().unwrap_or_else(PoisonError::into_inner);
        if projects.contains_key(project) {
            return false;
        }
        projects.insert(project.to_string(), Progress { total, done: 0 });
        info!(project, total, "project detected");
        true
    }

    /// Counts one finished child of `project`, capped at its total.
    ///
    /// Returns `(done, total)` for registered projects.
    pub fn mark_done(&self, project: &str) -> Option<(usize, usize)> {
        let mut projects = self.projects.lock().unwrap_or_else(PoisonError::into_inner);
        let progress = projects.get_mut(project)?;
        progress.done = (progress.done + 1).min(progress.total);
        info!(project, done = progress.done, total = progress.total, "project progress");
        Some((progress.done, progress.total))
    }

    /// `(done, total)` for `project`, if registered.
    #[must_use]
    pub fn status(&self, project: &str) -> Option<(usize, usize)> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project)
            .map(|p| (p.done, p.total))
    }
}
