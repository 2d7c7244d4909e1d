use vidl_core::{TaskId, ValidationError};
use vidl_engine::{DesktopError, EngineError, HistoryError};

use crate::registry::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Desktop(#[from] DesktopError),
    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: TaskId },
    #[error("task already exists: {task_id}")]
    DuplicateTask { task_id: TaskId },
}

impl From<RegistryError> for ClientError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateTask { task_id } => ClientError::DuplicateTask { task_id },
        }
    }
}

impl ClientError {
    /// Text rendered next to the control that triggered the failure.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(err) => err.user_message(),
            ClientError::Engine(err) => err.user_message(),
            ClientError::History(err) => err.to_string(),
            ClientError::Desktop(err) => err.to_string(),
            ClientError::TaskNotFound { .. } => "This download no longer exists".to_string(),
            ClientError::DuplicateTask { .. } => {
                "A download with this id is already running".to_string()
            }
        }
    }
}

/// Recording a completed download failed. The task stays `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not record history for {task_id}: {message}")]
pub struct HistoryWarning {
    pub task_id: TaskId,
    pub message: String,
}
