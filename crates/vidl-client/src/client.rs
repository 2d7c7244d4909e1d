//! The download client: one owner for the registry, the coalescer and the
//! bridge, driven by a single task.
//!
//! Commands (`submit`, `cancel`, `remove`) and event processing all take
//! `&mut self`, so client state has exactly one writer. Push events queue
//! in the hub subscriptions until [`DownloadClient::process_next`] or
//! [`DownloadClient::drain_ready`] routes them.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use vidl_core::{
    validate_request, validate_url, ClientConfig, DownloadRequest, EngineEvent, HistoryItem,
    ProgressSample, SubmitCommand, Task, TaskId, TaskStatus, Validate, ValidationLevel, VideoInfo,
};
use vidl_engine::{with_retry, Desktop, DesktopError, Engine, EventHub, HistoryStore, RetryPolicy};

use crate::bridge::{self, EventBridge, RouteOutcome};
use crate::coalescer::UpdateCoalescer;
use crate::error::{ClientError, HistoryWarning};
use crate::feed::{ClientEvent, ClientEventKind, EventFeed};
use crate::history::HistoryRecorder;
use crate::progress::ProgressSnapshot;
use crate::registry::{ProgressOutcome, StateTransition, TaskRegistry};
use crate::resolution::{sorted_options, FormatChoice, FormatOption};

/// Probe result prepared for the download form.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedVideo {
    pub info: VideoInfo,
    pub options: Vec<FormatOption>,
    pub choice: FormatChoice,
}

/// What one call to [`DownloadClient::process_next`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// Coalescer deadlines fired; these samples reached the tracker.
    Flushed(Vec<ProgressSample>),
    Routed {
        event: EngineEvent,
        outcome: RouteOutcome,
        /// Set when the event completed a task.
        history: Option<Result<HistoryItem, HistoryWarning>>,
    },
}

enum Wake {
    Deadline,
    Event(Option<EngineEvent>),
}

pub struct DownloadClient {
    engine: Arc<dyn Engine>,
    history: HistoryRecorder,
    desktop: Option<Arc<dyn Desktop>>,
    config: ClientConfig,
    retry: RetryPolicy,
    registry: TaskRegistry,
    coalescer: UpdateCoalescer,
    bridge: Option<EventBridge>,
    feed: EventFeed,
}

impl std::fmt::Debug for DownloadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadClient")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("coalescer", &self.coalescer)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl DownloadClient {
    pub fn new(
        engine: Arc<dyn Engine>,
        history: Arc<dyn HistoryStore>,
        config: ClientConfig,
    ) -> Self {
        for issue in config.validate() {
            match issue.level {
                ValidationLevel::Error => {
                    tracing::error!(code = issue.code, "{}", issue.message)
                }
                ValidationLevel::Warning => {
                    tracing::warn!(code = issue.code, "{}", issue.message)
                }
            }
        }

        Self {
            engine,
            history: HistoryRecorder::new(history),
            desktop: None,
            retry: RetryPolicy::from(&config.retry),
            coalescer: UpdateCoalescer::new(config.progress.quantum()),
            config,
            registry: TaskRegistry::new(),
            bridge: None,
            feed: EventFeed::new(),
        }
    }

    pub fn with_desktop(mut self, desktop: Arc<dyn Desktop>) -> Self {
        self.desktop = Some(desktop);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Subscribe to the engine's push channels. Any previous subscription
    /// set is released first.
    pub fn attach(&mut self, hub: &EventHub) {
        self.detach();
        self.bridge = Some(EventBridge::attach(hub));
    }

    /// Release the push subscriptions and flush every pending sample.
    pub fn detach(&mut self) -> Vec<ProgressSample> {
        let Some(mut bridge) = self.bridge.take() else {
            return Vec::new();
        };
        bridge.detach();
        let pending = self.coalescer.drain();
        self.apply_samples(pending)
    }

    pub fn is_attached(&self) -> bool {
        self.bridge.as_ref().is_some_and(EventBridge::is_attached)
    }

    /// Validate the URL, ask the engine for metadata and pre-select a
    /// default format.
    pub async fn probe(&self, url: &str) -> Result<ProbedVideo, ClientError> {
        validate_url(url)?;
        let info = self.engine.probe_video(url.trim()).await?;
        Ok(self.prepare_probe(info))
    }

    /// [`DownloadClient::probe`] wrapped in the configured retry policy.
    pub async fn probe_with_retry(&self, url: &str) -> Result<ProbedVideo, ClientError> {
        validate_url(url)?;
        let url = url.trim();
        let info = with_retry(&self.retry, || self.engine.probe_video(url)).await?;
        Ok(self.prepare_probe(info))
    }

    fn prepare_probe(&self, info: VideoInfo) -> ProbedVideo {
        let mut choice = FormatChoice::new();
        choice.offer(&info.formats, self.config.downloads.preferred_height);
        tracing::debug!(
            video_id = %info.id,
            formats = info.formats.len(),
            selected = choice.selected().unwrap_or("none"),
            "video probed"
        );
        ProbedVideo {
            options: sorted_options(&info.formats),
            choice,
            info,
        }
    }

    /// Start a download. The task id is generated here, before the engine
    /// is called; the task is only created once the engine accepts.
    pub async fn submit(&mut self, request: &DownloadRequest) -> Result<Task, ClientError> {
        validate_request(request)?;

        let mut task_id = TaskId::generate();
        while self.registry.contains(&task_id) {
            task_id = TaskId::generate();
        }
        let command = SubmitCommand::new(task_id.clone(), request);
        let accepted = self.engine.submit_download(&command).await?;
        if accepted != task_id {
            tracing::warn!(
                task_id = %task_id,
                engine_task_id = %accepted,
                "engine answered with a different task id; keeping the client id"
            );
        }

        let task = self.registry.insert_task(task_id, request, Utc::now())?;
        tracing::info!(task_id = %task.id, url = %task.url, format_id = %task.format_id, "download submitted");
        self.feed.emit(ClientEventKind::TaskCreated {
            task_id: task.id.clone(),
        });
        Ok(task)
    }

    /// Ask the engine to stop a download. The task becomes `Cancelled` only
    /// after the engine accepts. Finished tasks are left alone and their
    /// current status is returned.
    pub async fn cancel(&mut self, task_id: &TaskId) -> Result<TaskStatus, ClientError> {
        let Some(status) = self.registry.status(task_id) else {
            return Err(ClientError::TaskNotFound {
                task_id: task_id.clone(),
            });
        };
        if status.is_terminal() {
            return Ok(status);
        }

        self.engine.cancel_download(task_id).await?;

        self.flush_task(task_id);
        let outcome = self
            .registry
            .transition(task_id, TaskStatus::Cancelled, Utc::now());
        if let Some(transition) = outcome.applied() {
            self.emit_transition(transition);
        }
        tracing::info!(task_id = %task_id, "download cancelled");
        self.registry
            .status(task_id)
            .ok_or_else(|| ClientError::TaskNotFound {
                task_id: task_id.clone(),
            })
    }

    /// Delete a task and its progress entry. Pending progress is flushed
    /// first. The engine is not contacted.
    pub fn remove(&mut self, task_id: &TaskId) -> Result<Task, ClientError> {
        self.flush_task(task_id);
        let task = self
            .registry
            .remove(task_id)
            .ok_or_else(|| ClientError::TaskNotFound {
                task_id: task_id.clone(),
            })?;
        self.feed.emit(ClientEventKind::TaskRemoved {
            task_id: task.id.clone(),
        });
        Ok(task)
    }

    /// Remove every task. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        self.coalescer.drain();
        let removed: Vec<TaskId> = self.registry.snapshot().iter().map(|t| t.id.clone()).collect();
        self.registry.clear();
        for task_id in removed.iter().cloned() {
            self.feed.emit(ClientEventKind::TaskRemoved { task_id });
        }
        removed.len()
    }

    /// Wait for the next coalescer deadline or push event and apply it.
    /// Returns `None` when there is nothing left to wait for: no bridge is
    /// attached (or its channels closed) and no sample is pending.
    pub async fn process_next(&mut self) -> Option<Processed> {
        loop {
            let deadline = self.coalescer.next_deadline();
            let wake = match self.bridge.as_mut() {
                Some(bridge) => tokio::select! {
                    biased;
                    _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Wake::Deadline,
                    event = bridge.next_event() => Wake::Event(event),
                },
                None => {
                    time::sleep_until(deadline?).await;
                    Wake::Deadline
                }
            };

            match wake {
                Wake::Deadline => return Some(Processed::Flushed(self.flush_due(Instant::now()))),
                Wake::Event(Some(event)) => return Some(self.apply_event(event).await),
                Wake::Event(None) => {
                    tracing::debug!("push channels closed");
                    self.bridge = None;
                }
            }
        }
    }

    /// Apply everything that is ready now without waiting.
    pub async fn drain_ready(&mut self) -> Vec<Processed> {
        let mut processed = Vec::new();
        loop {
            let flushed = self.flush_due(Instant::now());
            if !flushed.is_empty() {
                processed.push(Processed::Flushed(flushed));
            }
            let Some(event) = self.bridge.as_mut().and_then(EventBridge::try_next_event) else {
                break;
            };
            processed.push(self.apply_event(event).await);
        }
        processed
    }

    async fn apply_event(&mut self, event: EngineEvent) -> Processed {
        let outcome = bridge::route(
            &event,
            &mut self.registry,
            &mut self.coalescer,
            Instant::now(),
            Utc::now(),
        );

        let mut history = None;
        match &outcome {
            RouteOutcome::Coalesced {
                started: Some(transition),
                ..
            } => self.emit_transition(transition),
            RouteOutcome::Finished {
                flushed,
                transitions,
            } => {
                if let Some(sample) = flushed {
                    self.feed.emit(ClientEventKind::ProgressApplied {
                        sample: sample.clone(),
                    });
                }
                for transition in transitions {
                    self.emit_transition(transition);
                }
                let completed = transitions
                    .iter()
                    .any(|transition| transition.to == TaskStatus::Completed);
                if let (EngineEvent::Complete(payload), true) = (&event, completed) {
                    if let Some(task) = self.registry.get(&payload.task_id).cloned() {
                        let result = self.history.record(&task, payload, Utc::now()).await;
                        self.emit_history(&task.id, &result);
                        history = Some(result);
                    }
                }
            }
            _ => {}
        }

        Processed::Routed {
            event,
            outcome,
            history,
        }
    }

    fn flush_due(&mut self, now: Instant) -> Vec<ProgressSample> {
        let due = self.coalescer.take_due(now);
        self.apply_samples(due)
    }

    fn flush_task(&mut self, task_id: &TaskId) {
        if let Some(sample) = bridge::flush(&mut self.registry, &mut self.coalescer, task_id) {
            self.feed.emit(ClientEventKind::ProgressApplied { sample });
        }
    }

    fn apply_samples(&mut self, samples: Vec<ProgressSample>) -> Vec<ProgressSample> {
        let mut applied = Vec::with_capacity(samples.len());
        for sample in samples {
            if self.registry.apply_progress(sample.clone()) == ProgressOutcome::Applied {
                self.feed.emit(ClientEventKind::ProgressApplied {
                    sample: sample.clone(),
                });
                applied.push(sample);
            }
        }
        applied
    }

    fn emit_transition(&self, transition: &StateTransition) {
        self.feed.emit(ClientEventKind::StatusChanged {
            task_id: transition.task_id.clone(),
            from: transition.from,
            to: transition.to,
        });
    }

    fn emit_history(&self, task_id: &TaskId, result: &Result<HistoryItem, HistoryWarning>) {
        let kind = match result {
            Ok(item) => ClientEventKind::HistoryRecorded {
                task_id: task_id.clone(),
                item: item.clone(),
            },
            Err(warning) => ClientEventKind::HistoryWarning {
                task_id: task_id.clone(),
                message: warning.message.clone(),
            },
        };
        self.feed.emit(kind);
    }

    pub fn tasks(&self) -> Arc<Vec<Task>> {
        self.registry.snapshot()
    }

    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        self.registry.get(task_id).cloned()
    }

    pub fn active_tasks(&self) -> Vec<Task> {
        self.registry.active()
    }

    /// Last applied sample. Samples still held by the coalescer are not
    /// visible here.
    pub fn progress(&self, task_id: &TaskId) -> Option<ProgressSample> {
        self.registry.progress().get(task_id).cloned()
    }

    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        self.registry.progress().snapshot()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Samples received but not yet written to the tracker.
    pub fn coalescer(&self) -> &UpdateCoalescer {
        &self.coalescer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.feed.subscribe()
    }

    pub async fn list_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        Ok(self.history.list().await?)
    }

    pub async fn clear_history(&self) -> Result<(), ClientError> {
        Ok(self.history.clear().await?)
    }

    /// Configured default destination, if any.
    pub fn default_save_path(&self) -> Option<PathBuf> {
        self.config.downloads.save_path.clone()
    }

    /// Open the folder picker. `Ok(None)` when the user dismissed it.
    pub async fn browse_save_path(&self) -> Result<Option<PathBuf>, ClientError> {
        let desktop = self.desktop()?;
        Ok(desktop.select_folder().await?)
    }

    pub async fn open_download(&self, item: &HistoryItem) -> Result<(), ClientError> {
        let desktop = self.desktop()?;
        Ok(desktop.open_file(&item.file_path).await?)
    }

    fn desktop(&self) -> Result<&Arc<dyn Desktop>, ClientError> {
        self.desktop
            .as_ref()
            .ok_or(ClientError::Desktop(DesktopError::Unavailable))
    }
}
