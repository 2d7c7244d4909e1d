//! In-process push surface.
//!
//! An engine adapter emits raw JSON payloads into an [`EventHub`]; every
//! live [`Subscription`] on that channel receives every payload, whatever
//! task it belongs to. A subscription stays registered until it is
//! unsubscribed or dropped.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use vidl_core::{EngineEvent, PushChannel};

type ListenerId = u64;

#[derive(Debug, Default)]
struct HubInner {
    next_id: ListenerId,
    listeners: HashMap<PushChannel, Vec<(ListenerId, mpsc::UnboundedSender<Value>)>>,
}

#[derive(Debug, Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

fn lock(inner: &Mutex<HubInner>) -> MutexGuard<'_, HubInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: PushChannel) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut guard = lock(&self.inner);
        let id = guard.next_id;
        guard.next_id += 1;
        guard.listeners.entry(channel).or_default().push((id, tx));
        drop(guard);

        tracing::debug!(channel = %channel, listener = id, "push listener registered");
        Subscription {
            channel,
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Deliver `payload` to every listener on `channel`. Returns how many
    /// listeners received it.
    pub fn emit(&self, channel: PushChannel, payload: Value) -> usize {
        let mut guard = lock(&self.inner);
        let Some(listeners) = guard.listeners.get_mut(&channel) else {
            return 0;
        };
        listeners.retain(|(_, tx)| tx.send(payload.clone()).is_ok());
        listeners.len()
    }

    /// Encode a typed event the way the engine puts it on the wire.
    pub fn emit_event(&self, event: &EngineEvent) -> usize {
        let payload = match event {
            EngineEvent::Progress(sample) => serde_json::to_value(sample),
            EngineEvent::Complete(payload) => serde_json::to_value(payload),
            EngineEvent::Error(payload) => serde_json::to_value(payload),
        };
        match payload {
            Ok(payload) => self.emit(event.channel(), payload),
            Err(err) => {
                tracing::warn!(channel = %event.channel(), error = %err, "failed to encode push payload");
                0
            }
        }
    }

    pub fn listener_count(&self, channel: PushChannel) -> usize {
        lock(&self.inner)
            .listeners
            .get(&channel)
            .map_or(0, Vec::len)
    }
}

/// Disposal handle for one channel listener.
#[derive(Debug)]
pub struct Subscription {
    channel: PushChannel,
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<Value>,
    hub: Weak<Mutex<HubInner>>,
    released: bool,
}

impl Subscription {
    pub fn channel(&self) -> PushChannel {
        self.channel
    }

    /// Wait for the next payload. `None` once unsubscribed or the hub is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        if self.released {
            return None;
        }
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Value> {
        if self.released {
            return None;
        }
        self.rx.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        !self.released
    }

    /// Unregister from the hub. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.rx.close();
        if let Some(inner) = self.hub.upgrade() {
            let mut guard = lock(&inner);
            if let Some(listeners) = guard.listeners.get_mut(&self.channel) {
                listeners.retain(|(id, _)| *id != self.id);
            }
        }
        tracing::debug!(channel = %self.channel, listener = self.id, "push listener released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vidl_core::{ProgressSample, TaskId};

    #[test]
    fn every_listener_on_a_channel_sees_every_payload() {
        let hub = EventHub::new();
        let mut a = hub.subscribe(PushChannel::Progress);
        let mut b = hub.subscribe(PushChannel::Progress);
        let mut other = hub.subscribe(PushChannel::Error);

        let delivered = hub.emit(PushChannel::Progress, json!({"taskId": "task-1"}));
        assert_eq!(delivered, 2);
        assert_eq!(a.try_recv(), Some(json!({"taskId": "task-1"})));
        assert_eq!(b.try_recv(), Some(json!({"taskId": "task-1"})));
        assert_eq!(other.try_recv(), None);
    }

    #[test]
    fn unsubscribe_removes_the_listener() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(PushChannel::Complete);
        assert_eq!(hub.listener_count(PushChannel::Complete), 1);

        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(hub.listener_count(PushChannel::Complete), 0);
        assert!(!sub.is_active());
        assert_eq!(hub.emit(PushChannel::Complete, json!({})), 0);
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn dropping_a_subscription_releases_it() {
        let hub = EventHub::new();
        {
            let _sub = hub.subscribe(PushChannel::Error);
            assert_eq!(hub.listener_count(PushChannel::Error), 1);
        }
        assert_eq!(hub.listener_count(PushChannel::Error), 0);
    }

    #[test]
    fn emit_without_listeners_delivers_nothing() {
        let hub = EventHub::new();
        assert_eq!(hub.emit(PushChannel::Progress, json!({"taskId": "x"})), 0);
    }

    #[test]
    fn emit_event_uses_wire_shape() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(PushChannel::Progress);
        let sample = ProgressSample::new(TaskId::new("task-1"), 42.0);

        assert_eq!(hub.emit_event(&EngineEvent::Progress(sample)), 1);
        let payload = sub.try_recv().expect("payload");
        assert_eq!(payload["taskId"], "task-1");
        assert_eq!(payload["percent"], 42.0);
        assert!(payload.get("kind").is_none());
    }

    #[test]
    fn subscription_outliving_the_hub_is_harmless() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(PushChannel::Progress);
        drop(hub);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[tokio::test]
    async fn recv_waits_for_the_next_payload() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe(PushChannel::Error);
        hub.emit(PushChannel::Error, json!({"taskId": "task-2", "error": "boom"}));
        let payload = sub.recv().await.expect("payload");
        assert_eq!(payload["error"], "boom");
    }
}
