use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use vidl_core::{HistoryItem, ProgressSample, TaskId, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientEventKind {
    TaskCreated {
        task_id: TaskId,
    },
    StatusChanged {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    ProgressApplied {
        sample: ProgressSample,
    },
    TaskRemoved {
        task_id: TaskId,
    },
    HistoryRecorded {
        task_id: TaskId,
        item: HistoryItem,
    },
    HistoryWarning {
        task_id: TaskId,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    pub at: DateTime<Utc>,
    pub kind: ClientEventKind,
}

pub fn client_event_name(kind: &ClientEventKind) -> &'static str {
    match kind {
        ClientEventKind::TaskCreated { .. } => "task_created",
        ClientEventKind::StatusChanged { .. } => "status_changed",
        ClientEventKind::ProgressApplied { .. } => "progress_applied",
        ClientEventKind::TaskRemoved { .. } => "task_removed",
        ClientEventKind::HistoryRecorded { .. } => "history_recorded",
        ClientEventKind::HistoryWarning { .. } => "history_warning",
    }
}

/// Fan-out of client state changes to UI consumers. Publishing never
/// blocks and succeeds with no subscribers.
#[derive(Debug, Clone)]
pub struct EventFeed {
    events_tx: broadcast::Sender<ClientEvent>,
}

impl Default for EventFeed {
    fn default() -> Self {
        let (events_tx, _) = broadcast::channel(1024);
        Self { events_tx }
    }
}

impl EventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events_tx.receiver_count()
    }

    pub(crate) fn emit(&self, kind: ClientEventKind) {
        tracing::trace!(event = client_event_name(&kind), "client event");
        let _ = self.events_tx.send(ClientEvent {
            at: Utc::now(),
            kind,
        });
    }
}
