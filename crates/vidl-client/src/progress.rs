//! Latest progress sample per task.
//!
//! The map sits behind an `Arc` and is copied on write: a snapshot taken by
//! a reader never changes, and an update for one task never touches the
//! entry of another.

use std::collections::HashMap;
use std::sync::Arc;
use vidl_core::{ProgressSample, TaskId};

pub type ProgressSnapshot = Arc<HashMap<TaskId, ProgressSample>>;

#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    entries: ProgressSnapshot,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins. Returns the sample that was replaced.
    ///
    /// Only the registry calls this, after checking the task is live.
    pub(crate) fn update(&mut self, sample: ProgressSample) -> Option<ProgressSample> {
        Arc::make_mut(&mut self.entries).insert(sample.task_id.clone(), sample)
    }

    /// Only the registry calls this, as part of removing the task.
    pub(crate) fn delete(&mut self, task_id: &TaskId) -> Option<ProgressSample> {
        if !self.entries.contains_key(task_id) {
            return None;
        }
        Arc::make_mut(&mut self.entries).remove(task_id)
    }

    pub(crate) fn clear(&mut self) {
        self.entries = ProgressSnapshot::default();
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&ProgressSample> {
        self.entries.get(task_id)
    }

    pub fn percent(&self, task_id: &TaskId) -> Option<f64> {
        self.get(task_id).map(|sample| sample.percent)
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.entries.contains_key(task_id)
    }

    /// Read-only view that is unaffected by later updates.
    pub fn snapshot(&self) -> ProgressSnapshot {
        Arc::clone(&self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
