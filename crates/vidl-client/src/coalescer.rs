//! Per-task progress coalescer.
//!
//! Each task holds at most one pending sample. The first sample for an idle
//! task arms a deadline one quantum ahead; later samples replace the pending
//! one without moving the deadline, so a steady stream still flushes once
//! per quantum. Timers are per task and share no state.
//!
//! # Invariants
//!
//! - Latest wins: only samples superseded before a flush are dropped.
//! - [`UpdateCoalescer::finalize`] hands back the pending sample so it can
//!   be applied before a terminal status or removal.
//! - Time is passed in explicitly; the coalescer never reads a clock.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use vidl_core::{ProgressSample, TaskId};

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    sample: ProgressSample,
    deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The task was idle; a flush is scheduled for `deadline`.
    Armed { deadline: Instant },
    /// A pending sample was superseded; the deadline is unchanged.
    Replaced { deadline: Instant },
}

#[derive(Debug, Clone)]
pub struct UpdateCoalescer {
    quantum: Duration,
    slots: HashMap<TaskId, Slot>,
}

impl Default for UpdateCoalescer {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl UpdateCoalescer {
    pub fn new(quantum: Duration) -> Self {
        Self {
            quantum,
            slots: HashMap::new(),
        }
    }

    pub fn quantum(&self) -> Duration {
        self.quantum
    }

    pub fn submit(&mut self, sample: ProgressSample, now: Instant) -> SubmitOutcome {
        match self.slots.get_mut(&sample.task_id) {
            Some(slot) => {
                slot.sample = sample;
                SubmitOutcome::Replaced {
                    deadline: slot.deadline,
                }
            }
            None => {
                let deadline = now + self.quantum;
                self.slots
                    .insert(sample.task_id.clone(), Slot { sample, deadline });
                SubmitOutcome::Armed { deadline }
            }
        }
    }

    /// Earliest armed deadline across all tasks.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.values().map(|slot| slot.deadline).min()
    }

    pub fn time_until_flush(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Remove and return every sample whose deadline is at or before `now`,
    /// ordered by deadline. Those tasks go back to idle.
    pub fn take_due(&mut self, now: Instant) -> Vec<ProgressSample> {
        let mut due: Vec<(Instant, TaskId)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.deadline <= now)
            .map(|(id, slot)| (slot.deadline, id.clone()))
            .collect();
        due.sort();
        due.into_iter()
            .filter_map(|(_, id)| self.slots.remove(&id).map(|slot| slot.sample))
            .collect()
    }

    /// Disarm the task's timer and hand back whatever was pending.
    pub fn finalize(&mut self, task_id: &TaskId) -> Option<ProgressSample> {
        self.slots.remove(task_id).map(|slot| slot.sample)
    }

    /// Disarm every timer and return all pending samples.
    pub fn drain(&mut self) -> Vec<ProgressSample> {
        let mut slots: Vec<Slot> = self.slots.drain().map(|(_, slot)| slot).collect();
        slots.sort_by(|a, b| {
            a.deadline
                .cmp(&b.deadline)
                .then_with(|| a.sample.task_id.cmp(&b.sample.task_id))
        });
        slots.into_iter().map(|slot| slot.sample).collect()
    }

    pub fn pending(&self, task_id: &TaskId) -> Option<&ProgressSample> {
        self.slots.get(task_id).map(|slot| &slot.sample)
    }

    pub fn is_pending(&self, task_id: &TaskId) -> bool {
        self.slots.contains_key(task_id)
    }

    pub fn has_pending(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
