//! Request/response collaborators the client depends on.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use vidl_core::{HistoryItem, SubmitCommand, TaskId, VideoInfo};

use crate::error::{DesktopError, EngineError, HistoryError};

/// Commands the retrieval engine answers. Push events travel separately
/// through an [`EventHub`](crate::hub::EventHub).
#[async_trait]
pub trait Engine: Send + Sync {
    async fn probe_video(&self, url: &str) -> Result<VideoInfo, EngineError>;

    /// Start a download. The engine echoes `command.task_id` and tags every
    /// push event for it with that id.
    async fn submit_download(&self, command: &SubmitCommand) -> Result<TaskId, EngineError>;

    async fn cancel_download(&self, task_id: &TaskId) -> Result<(), EngineError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn add_history(&self, item: &HistoryItem) -> Result<(), HistoryError>;
    async fn get_history(&self) -> Result<Vec<HistoryItem>, HistoryError>;
    async fn clear_history(&self) -> Result<(), HistoryError>;
}

/// Native dialogs and file launching.
#[async_trait]
pub trait Desktop: Send + Sync {
    /// `Ok(None)` when the user dismissed the picker.
    async fn select_folder(&self) -> Result<Option<PathBuf>, DesktopError>;
    async fn open_file(&self, path: &Path) -> Result<(), DesktopError>;
}
