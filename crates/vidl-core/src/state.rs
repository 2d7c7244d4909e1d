//! Download task status machine.
//!
//! ```text
//! Pending → Downloading → Completed | Failed | Cancelled
//!    └──────────────────────────────────────────┘ (Cancelled)
//! ```
//!
//! Terminal states have no outgoing edges.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted by the engine, no progress seen yet
    #[default]
    Pending,
    /// At least one non-zero progress sample has arrived
    Downloading,
    Completed,
    Failed,
    /// Cancellation was acknowledged by the engine
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if the task can never change status again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Returns true if the task still occupies a slot in the active view.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Downloading)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "downloading" => Ok(TaskStatus::Downloading),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!(
                "invalid task status '{other}'. valid values: pending, downloading, completed, failed, cancelled"
            )),
        }
    }
}

/// Check whether `from → to` is an edge of the status machine.
///
/// Self-transitions are not edges; callers treat them as no-ops.
pub fn is_transition_allowed(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;

    match (from, to) {
        (Pending, Downloading) => true,
        (Pending, Cancelled) => true,
        (Downloading, Completed) => true,
        (Downloading, Failed) => true,
        (Downloading, Cancelled) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Downloading,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
        let decoded: TaskStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(decoded, TaskStatus::Cancelled);
    }

    #[test]
    fn terminal_and_active_partition_the_statuses() {
        for status in ALL {
            assert_ne!(status.is_terminal(), status.is_active(), "{status}");
        }
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!is_transition_allowed(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn pending_reaches_downloading_and_cancelled_only() {
        assert!(is_transition_allowed(TaskStatus::Pending, TaskStatus::Downloading));
        assert!(is_transition_allowed(TaskStatus::Pending, TaskStatus::Cancelled));
        assert!(!is_transition_allowed(TaskStatus::Pending, TaskStatus::Completed));
        assert!(!is_transition_allowed(TaskStatus::Pending, TaskStatus::Failed));
    }

    #[test]
    fn downloading_reaches_every_terminal_state() {
        assert!(is_transition_allowed(TaskStatus::Downloading, TaskStatus::Completed));
        assert!(is_transition_allowed(TaskStatus::Downloading, TaskStatus::Failed));
        assert!(is_transition_allowed(TaskStatus::Downloading, TaskStatus::Cancelled));
        assert!(!is_transition_allowed(TaskStatus::Downloading, TaskStatus::Pending));
    }

    #[test]
    fn self_transitions_are_not_edges() {
        for status in ALL {
            assert!(!is_transition_allowed(status, status));
        }
    }

    #[test]
    fn parses_status_names_case_insensitively() {
        assert_eq!(" Failed ".parse::<TaskStatus>(), Ok(TaskStatus::Failed));
        let err = "paused".parse::<TaskStatus>().unwrap_err();
        assert!(err.contains("invalid task status 'paused'"));
    }
}
