//! State kept by the orchestrator between runs

use super::task::TaskKey;
use std::collections::BTreeSet;

/// Compilations whose next run must not reuse incremental compiler state.
///
/// Keyed per task: a unit and its derived stylesheet compilations have
/// separate incremental state. Reset at the start of every non-make run; a
/// task leaves the set when it compiles successfully.
#[derive(Debug, Clone, Default)]
pub struct BuildStateCache {
    dirty: BTreeSet<TaskKey>,
}

impl BuildStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, key: TaskKey) {
        let _ = self.dirty.insert(key);
    }

    pub fn is_dirty(&self, key: &TaskKey) -> bool {
        self.dirty.contains(key)
    }

    pub fn clear(&mut self, key: &TaskKey) {
        let _ = self.dirty.remove(key);
    }

    pub fn reset(&mut self) {
        self.dirty.clear();
    }

    pub fn dirty_tasks(&self) -> impl Iterator<Item = &TaskKey> {
        self.dirty.iter()
    }
}
