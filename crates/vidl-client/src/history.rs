//! Hand-off of completed downloads to the history collaborator.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use vidl_core::{CompletePayload, HistoryId, HistoryItem, Task};
use vidl_engine::{HistoryError, HistoryStore};

use crate::error::HistoryWarning;

/// Assemble the record for a task that just completed.
pub fn build_history_item(
    task: &Task,
    payload: &CompletePayload,
    downloaded_at: DateTime<Utc>,
) -> HistoryItem {
    HistoryItem {
        id: HistoryId::generate(),
        title: task.title.clone(),
        url: task.url.clone(),
        resolution: task.format_id.clone(),
        file_path: payload.file_path.clone(),
        file_size: payload.file_size,
        downloaded_at,
        file_exists: true,
    }
}

#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
}

impl std::fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRecorder").finish_non_exhaustive()
    }
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Persist one completed task. A failure comes back as a warning and is
    /// not retried.
    pub async fn record(
        &self,
        task: &Task,
        payload: &CompletePayload,
        downloaded_at: DateTime<Utc>,
    ) -> Result<HistoryItem, HistoryWarning> {
        let item = build_history_item(task, payload, downloaded_at);
        match self.store.add_history(&item).await {
            Ok(()) => {
                tracing::info!(task_id = %task.id, history_id = %item.id, "download recorded in history");
                Ok(item)
            }
            Err(err) => {
                tracing::warn!(task_id = %task.id, error = %err, "failed to record download history");
                Err(HistoryWarning {
                    task_id: task.id.clone(),
                    message: err.to_string(),
                })
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        self.store.get_history().await
    }

    pub async fn clear(&self) -> Result<(), HistoryError> {
        self.store.clear_history().await?;
        tracing::info!("download history cleared");
        Ok(())
    }
}
