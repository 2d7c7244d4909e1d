//! Task list and status transitions.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use vidl_core::{is_transition_allowed, DownloadRequest, ProgressSample, Task, TaskId, TaskStatus};

use crate::progress::ProgressTracker;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("task already exists: {task_id}")]
    DuplicateTask { task_id: TaskId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub task_id: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub at: DateTime<Utc>,
}

/// What `transition` did. Only `Applied` changed anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied(StateTransition),
    /// Already in the requested status.
    Unchanged { status: TaskStatus },
    /// The task is terminal; the request was swallowed.
    Absorbed { status: TaskStatus },
    /// Not an edge of the status machine.
    Rejected { from: TaskStatus, to: TaskStatus },
    UnknownTask,
}

impl TransitionOutcome {
    pub fn applied(&self) -> Option<&StateTransition> {
        match self {
            TransitionOutcome::Applied(transition) => Some(transition),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressOutcome {
    Applied,
    Absorbed { status: TaskStatus },
    UnknownTask,
}

/// Owner of the task list and, through it, of the progress map. Readers get
/// `Arc` snapshots; every mutation goes through `&mut self`.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Arc<Vec<Task>>,
    progress: ProgressTracker,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `Pending` task under a fresh id.
    pub fn create_task(&mut self, request: &DownloadRequest, at: DateTime<Utc>) -> Task {
        let mut id = TaskId::generate();
        while self.contains(&id) {
            id = TaskId::generate();
        }
        self.push(Task::new(id, request, at))
    }

    /// Create a `Pending` task under an id generated before the engine call.
    pub fn insert_task(
        &mut self,
        id: TaskId,
        request: &DownloadRequest,
        at: DateTime<Utc>,
    ) -> Result<Task, RegistryError> {
        if self.contains(&id) {
            return Err(RegistryError::DuplicateTask { task_id: id });
        }
        Ok(self.push(Task::new(id, request, at)))
    }

    fn push(&mut self, task: Task) -> Task {
        Arc::make_mut(&mut self.tasks).push(task.clone());
        tracing::debug!(task_id = %task.id, url = %task.url, "task created");
        task
    }

    /// Move a task to `to`. Unknown ids, terminal tasks and non-edges are
    /// no-ops; none of them is an error.
    pub fn transition(
        &mut self,
        task_id: &TaskId,
        to: TaskStatus,
        at: DateTime<Utc>,
    ) -> TransitionOutcome {
        let Some(index) = self.position(task_id) else {
            tracing::debug!(task_id = %task_id, to = %to, "transition for unknown task ignored");
            return TransitionOutcome::UnknownTask;
        };

        let from = self.tasks[index].status;
        if from.is_terminal() {
            tracing::debug!(task_id = %task_id, status = %from, to = %to, "terminal task absorbed transition");
            return TransitionOutcome::Absorbed { status: from };
        }
        if from == to {
            return TransitionOutcome::Unchanged { status: from };
        }
        if !is_transition_allowed(from, to) {
            tracing::warn!(task_id = %task_id, from = %from, to = %to, "invalid task status transition ignored");
            return TransitionOutcome::Rejected { from, to };
        }

        Arc::make_mut(&mut self.tasks)[index].status = to;
        tracing::info!(task_id = %task_id, from = %from, to = %to, "task status changed");
        TransitionOutcome::Applied(StateTransition {
            task_id: task_id.clone(),
            from,
            to,
            at,
        })
    }

    /// Store a progress sample for a live, non-terminal task.
    pub fn apply_progress(&mut self, sample: ProgressSample) -> ProgressOutcome {
        match self.status(&sample.task_id) {
            None => ProgressOutcome::UnknownTask,
            Some(status) if status.is_terminal() => ProgressOutcome::Absorbed { status },
            Some(_) => {
                self.progress.update(sample);
                ProgressOutcome::Applied
            }
        }
    }

    /// Delete the task and its progress entry together.
    pub fn remove(&mut self, task_id: &TaskId) -> Option<Task> {
        let index = self.position(task_id)?;
        let task = Arc::make_mut(&mut self.tasks).remove(index);
        self.progress.delete(task_id);
        tracing::debug!(task_id = %task_id, "task removed");
        Some(task)
    }

    /// Remove every task and progress entry. Returns how many tasks went.
    pub fn clear(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks = Arc::default();
        self.progress.clear();
        removed
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == task_id)
    }

    pub fn status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        self.get(task_id).map(|task| task.status)
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.position(task_id).is_some()
    }

    /// Tasks in submission order, as an immutable snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.tasks)
    }

    /// Pending and downloading tasks, in submission order.
    pub fn active(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.status.is_active())
            .cloned()
            .collect()
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, task_id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == task_id)
    }
}
