//! Engine push channels to registry/coalescer routing.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;
use vidl_core::{decode_push, EngineEvent, ProgressSample, PushChannel, TaskId, TaskStatus};
use vidl_engine::{EventHub, Subscription};

use crate::coalescer::{SubmitOutcome, UpdateCoalescer};
use crate::registry::{ProgressOutcome, StateTransition, TaskRegistry};

/// One subscription per push channel, owned together. Dropping the bridge
/// (or calling [`EventBridge::detach`]) releases all three.
#[derive(Debug)]
pub struct EventBridge {
    progress: Subscription,
    complete: Subscription,
    error: Subscription,
}

impl EventBridge {
    pub fn attach(hub: &EventHub) -> Self {
        tracing::debug!("attaching event bridge");
        Self {
            progress: hub.subscribe(PushChannel::Progress),
            complete: hub.subscribe(PushChannel::Complete),
            error: hub.subscribe(PushChannel::Error),
        }
    }

    /// Wait for the next well-formed event. Malformed payloads are logged
    /// and skipped. Returns `None` once detached or every channel is closed.
    ///
    /// Progress is polled first so that, for a single task, queued progress
    /// is routed before the terminal event the engine emitted after it.
    /// The cost is that while progress keeps arriving faster than it is
    /// routed, queued `complete` and `error` events for other tasks wait
    /// until the progress queue is empty.
    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        loop {
            let (channel, payload) = tokio::select! {
                biased;
                Some(payload) = self.progress.recv() => (PushChannel::Progress, payload),
                Some(payload) = self.complete.recv() => (PushChannel::Complete, payload),
                Some(payload) = self.error.recv() => (PushChannel::Error, payload),
                else => return None,
            };
            if let Some(event) = decode(channel, payload) {
                return Some(event);
            }
        }
    }

    /// Non-blocking variant of [`EventBridge::next_event`].
    pub fn try_next_event(&mut self) -> Option<EngineEvent> {
        loop {
            let (channel, payload) = if let Some(payload) = self.progress.try_recv() {
                (PushChannel::Progress, payload)
            } else if let Some(payload) = self.complete.try_recv() {
                (PushChannel::Complete, payload)
            } else if let Some(payload) = self.error.try_recv() {
                (PushChannel::Error, payload)
            } else {
                return None;
            };
            if let Some(event) = decode(channel, payload) {
                return Some(event);
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.progress.is_active() || self.complete.is_active() || self.error.is_active()
    }

    /// Release every subscription. Idempotent.
    pub fn detach(&mut self) {
        if self.is_attached() {
            tracing::debug!("detaching event bridge");
        }
        self.progress.unsubscribe();
        self.complete.unsubscribe();
        self.error.unsubscribe();
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

fn decode(channel: PushChannel, payload: Value) -> Option<EngineEvent> {
    match decode_push(channel, payload) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::warn!(channel = %channel, error = %err, "dropping malformed push payload");
            None
        }
    }
}

/// What routing one event did to client state.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// No task with that id; dropped.
    Orphan,
    /// The task is already terminal; dropped.
    Absorbed { status: TaskStatus },
    /// Progress was queued in the coalescer. `started` is set when the
    /// sample moved the task from `Pending` to `Downloading`.
    Coalesced {
        submit: SubmitOutcome,
        started: Option<StateTransition>,
    },
    /// A terminal event was applied. `flushed` is the pending sample that
    /// was written to the tracker first; `transitions` are in the order
    /// they were applied.
    Finished {
        flushed: Option<ProgressSample>,
        transitions: Vec<StateTransition>,
    },
}

/// Apply one decoded event.
pub fn route(
    event: &EngineEvent,
    registry: &mut TaskRegistry,
    coalescer: &mut UpdateCoalescer,
    now: Instant,
    at: DateTime<Utc>,
) -> RouteOutcome {
    let task_id = event.task_id();
    let Some(status) = registry.status(task_id) else {
        tracing::debug!(task_id = %task_id, channel = %event.channel(), "dropping event for unknown task");
        return RouteOutcome::Orphan;
    };
    if status.is_terminal() {
        coalescer.finalize(task_id);
        tracing::debug!(task_id = %task_id, status = %status, channel = %event.channel(), "dropping event for finished task");
        return RouteOutcome::Absorbed { status };
    }

    match event {
        EngineEvent::Progress(sample) => {
            let started = if status == TaskStatus::Pending && sample.percent > 0.0 {
                registry
                    .transition(task_id, TaskStatus::Downloading, at)
                    .applied()
                    .cloned()
            } else {
                None
            };
            let submit = coalescer.submit(sample.clone(), now);
            RouteOutcome::Coalesced { submit, started }
        }
        EngineEvent::Complete(_) | EngineEvent::Error(_) => {
            let flushed = flush(registry, coalescer, task_id);

            let mut transitions = Vec::with_capacity(2);
            if status == TaskStatus::Pending {
                transitions.extend(
                    registry
                        .transition(task_id, TaskStatus::Downloading, at)
                        .applied()
                        .cloned(),
                );
            }
            if let Some(terminal) = event.terminal_status() {
                transitions.extend(registry.transition(task_id, terminal, at).applied().cloned());
            }
            if let EngineEvent::Error(payload) = event {
                tracing::warn!(task_id = %task_id, error = %payload.error, "download failed");
            }
            RouteOutcome::Finished {
                flushed,
                transitions,
            }
        }
    }
}

/// Write the task's pending sample, if any, straight into the tracker.
pub(crate) fn flush(
    registry: &mut TaskRegistry,
    coalescer: &mut UpdateCoalescer,
    task_id: &TaskId,
) -> Option<ProgressSample> {
    let sample = coalescer.finalize(task_id)?;
    match registry.apply_progress(sample.clone()) {
        ProgressOutcome::Applied => Some(sample),
        _ => None,
    }
}
