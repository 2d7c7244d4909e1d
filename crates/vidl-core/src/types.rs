//! Core types shared by the engine boundary and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::state::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh process-unique id, generated before the engine is asked to
    /// start the download so push events can be correlated.
    pub fn generate() -> Self {
        Self(format!("task-{}", Uuid::new_v4()))
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(pub String);

impl HistoryId {
    pub fn generate() -> Self {
        Self(format!("history-{}", Uuid::new_v4()))
    }
}

impl std::fmt::Display for HistoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One downloadable rendition reported by a probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    pub format_id: String,
    /// `"WxH"`, e.g. `"1920x1080"`
    pub resolution: String,
    pub ext: String,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub fps: Option<f64>,
    pub vcodec: String,
    pub acodec: String,
}

/// Probe result for one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    /// Seconds
    pub duration: f64,
    pub thumbnail: String,
    pub uploader: String,
    pub formats: Vec<Format>,
}

/// What the user asked to download. Validated before any engine call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
    pub format_id: String,
    pub save_path: PathBuf,
}

/// Engine-facing form of a submission: the request plus the client's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCommand {
    pub task_id: TaskId,
    pub url: String,
    pub format_id: String,
    pub save_path: PathBuf,
}

impl SubmitCommand {
    pub fn new(task_id: TaskId, request: &DownloadRequest) -> Self {
        Self {
            task_id,
            url: request.url.trim().to_string(),
            format_id: request.format_id.clone(),
            save_path: request.save_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub url: String,
    pub title: String,
    pub format_id: String,
    pub save_path: PathBuf,
    pub status: TaskStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, request: &DownloadRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            url: request.url.trim().to_string(),
            title: request.title.clone(),
            format_id: request.format_id.clone(),
            save_path: request.save_path.clone(),
            status: TaskStatus::Pending,
            created_at,
        }
    }
}

/// Latest download metrics for one task. The display strings are passed
/// through from the engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSample {
    pub task_id: TaskId,
    /// 0.0 - 100.0
    pub percent: f64,
    #[serde(default)]
    pub speed: String,
    #[serde(default)]
    pub downloaded: String,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub eta: String,
}

impl ProgressSample {
    pub fn new(task_id: TaskId, percent: f64) -> Self {
        Self {
            task_id,
            percent,
            speed: String::new(),
            downloaded: String::new(),
            total: String::new(),
            eta: String::new(),
        }
    }
}

/// Finalized record handed to the history collaborator on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: HistoryId,
    pub title: String,
    pub url: String,
    /// The format id that was downloaded
    pub resolution: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub downloaded_at: DateTime<Utc>,
    pub file_exists: bool,
}
