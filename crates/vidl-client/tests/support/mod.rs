#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use vidl_client::DownloadClient;
use vidl_core::{ClientConfig, DownloadRequest, Format, HistoryItem, SubmitCommand, TaskId, VideoInfo};
use vidl_engine::{
    Desktop, DesktopError, Engine, EngineCommand, EngineError, EventHub, HistoryError,
    HistoryStore,
};

#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<EngineCommand>>,
    pub submitted: Mutex<Vec<SubmitCommand>>,
    pub cancelled: Mutex<Vec<TaskId>>,
    pub reject_submit: Mutex<Option<String>>,
    pub reject_cancel: Mutex<Option<String>>,
    pub probe_failures: AtomicU32,
    pub formats: Vec<Format>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<EngineCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<SubmitCommand> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn probe_video(&self, url: &str) -> Result<VideoInfo, EngineError> {
        self.calls.lock().unwrap().push(EngineCommand::Probe);
        let remaining = self.probe_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.probe_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::rejected(
                EngineCommand::Probe,
                "ERROR: Unable to download webpage: timed out",
            ));
        }
        Ok(VideoInfo {
            id: "dQw4w9WgXcQ".to_string(),
            title: format!("video at {url}"),
            duration: 212.0,
            thumbnail: "https://example.com/thumb.jpg".to_string(),
            uploader: "uploader".to_string(),
            formats: self.formats.clone(),
        })
    }

    async fn submit_download(&self, command: &SubmitCommand) -> Result<TaskId, EngineError> {
        self.calls.lock().unwrap().push(EngineCommand::Submit);
        if let Some(message) = self.reject_submit.lock().unwrap().clone() {
            return Err(EngineError::rejected(EngineCommand::Submit, message));
        }
        self.submitted.lock().unwrap().push(command.clone());
        Ok(command.task_id.clone())
    }

    async fn cancel_download(&self, task_id: &TaskId) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(EngineCommand::Cancel);
        if let Some(message) = self.reject_cancel.lock().unwrap().clone() {
            return Err(EngineError::rejected(EngineCommand::Cancel, message));
        }
        self.cancelled.lock().unwrap().push(task_id.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeHistory {
    pub items: Mutex<Vec<HistoryItem>>,
    pub fail: AtomicBool,
}

impl FakeHistory {
    pub fn items(&self) -> Vec<HistoryItem> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for FakeHistory {
    async fn add_history(&self, item: &HistoryItem) -> Result<(), HistoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(HistoryError::Storage {
                message: "disk full".to_string(),
            });
        }
        self.items.lock().unwrap().push(item.clone());
        Ok(())
    }

    async fn get_history(&self) -> Result<Vec<HistoryItem>, HistoryError> {
        Ok(self.items())
    }

    async fn clear_history(&self) -> Result<(), HistoryError> {
        self.items.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDesktop {
    pub folder: Option<PathBuf>,
    pub opened: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Desktop for FakeDesktop {
    async fn select_folder(&self) -> Result<Option<PathBuf>, DesktopError> {
        Ok(self.folder.clone())
    }

    async fn open_file(&self, path: &Path) -> Result<(), DesktopError> {
        if !path.is_absolute() {
            return Err(DesktopError::Open {
                path: path.display().to_string(),
                message: "relative path".to_string(),
            });
        }
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub history: Arc<FakeHistory>,
    pub hub: EventHub,
    pub client: DownloadClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_engine(FakeEngine::default())
    }

    pub fn with_engine(engine: FakeEngine) -> Self {
        let engine = Arc::new(engine);
        let history = Arc::new(FakeHistory::default());
        let hub = EventHub::new();
        let mut client = DownloadClient::new(engine.clone(), history.clone(), ClientConfig::default());
        client.attach(&hub);
        Self {
            engine,
            history,
            hub,
            client,
        }
    }
}

pub fn request() -> DownloadRequest {
    DownloadRequest {
        url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        title: "Never Gonna Give You Up".to_string(),
        format_id: "137".to_string(),
        save_path: PathBuf::from("/home/me/Videos"),
    }
}

pub fn format(id: &str, resolution: &str) -> Format {
    Format {
        format_id: id.to_string(),
        resolution: resolution.to_string(),
        ext: "mp4".to_string(),
        filesize: Some(10 * 1024 * 1024),
        fps: Some(30.0),
        vcodec: "avc1.640028".to_string(),
        acodec: "none".to_string(),
    }
}
