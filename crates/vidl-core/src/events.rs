//! Engine push events.
//!
//! The engine emits untyped JSON payloads on three channels that are not
//! scoped per task. Payloads are decoded into [`EngineEvent`] at the
//! boundary; nothing past this module sees raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::state::TaskStatus;
use crate::types::{ProgressSample, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushChannel {
    Progress,
    Complete,
    Error,
}

impl PushChannel {
    pub const ALL: [PushChannel; 3] = [
        PushChannel::Progress,
        PushChannel::Complete,
        PushChannel::Error,
    ];

    /// Wire name the engine emits on.
    pub fn event_name(self) -> &'static str {
        match self {
            PushChannel::Progress => "download-progress",
            PushChannel::Complete => "download-complete",
            PushChannel::Error => "download-error",
        }
    }
}

impl std::fmt::Display for PushChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub task_id: TaskId,
    pub file_path: PathBuf,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub task_id: TaskId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    Progress(ProgressSample),
    Complete(CompletePayload),
    Error(ErrorPayload),
}

impl EngineEvent {
    pub fn task_id(&self) -> &TaskId {
        match self {
            EngineEvent::Progress(sample) => &sample.task_id,
            EngineEvent::Complete(payload) => &payload.task_id,
            EngineEvent::Error(payload) => &payload.task_id,
        }
    }

    pub fn channel(&self) -> PushChannel {
        match self {
            EngineEvent::Progress(_) => PushChannel::Progress,
            EngineEvent::Complete(_) => PushChannel::Complete,
            EngineEvent::Error(_) => PushChannel::Error,
        }
    }

    /// Status a task ends in when this event is applied, `None` for progress.
    pub fn terminal_status(&self) -> Option<TaskStatus> {
        match self {
            EngineEvent::Progress(_) => None,
            EngineEvent::Complete(_) => Some(TaskStatus::Completed),
            EngineEvent::Error(_) => Some(TaskStatus::Failed),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("malformed {channel} payload: {source}")]
    Malformed {
        channel: PushChannel,
        #[source]
        source: serde_json::Error,
    },
    #[error("{channel} payload has an empty task id")]
    EmptyTaskId { channel: PushChannel },
    #[error("progress payload for {task_id} has a non-finite percent")]
    NonFinitePercent { task_id: TaskId },
}

/// Decode and validate a raw payload received on `channel`.
///
/// Progress percentages are clamped into `[0, 100]`.
pub fn decode_push(channel: PushChannel, payload: Value) -> Result<EngineEvent, EventDecodeError> {
    let malformed = |source| EventDecodeError::Malformed { channel, source };
    let event = match channel {
        PushChannel::Progress => {
            let mut sample: ProgressSample = serde_json::from_value(payload).map_err(malformed)?;
            if !sample.percent.is_finite() {
                return Err(EventDecodeError::NonFinitePercent {
                    task_id: sample.task_id,
                });
            }
            sample.percent = sample.percent.clamp(0.0, 100.0);
            EngineEvent::Progress(sample)
        }
        PushChannel::Complete => {
            EngineEvent::Complete(serde_json::from_value(payload).map_err(malformed)?)
        }
        PushChannel::Error => EngineEvent::Error(serde_json::from_value(payload).map_err(malformed)?),
    };

    if event.task_id().0.trim().is_empty() {
        return Err(EventDecodeError::EmptyTaskId { channel });
    }
    Ok(event)
}
