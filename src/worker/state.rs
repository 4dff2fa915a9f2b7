//! Task state machine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Opaque task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted, worker not yet started.
    Pending,
    /// Worker is executing the unit of work.
    Running,
    /// Work finished and produced a result.
    Completed,
    /// Work failed, timed out, or was stopped.
    Failed,
}

impl TaskStatus {
    /// Check if this status allows transitioning to another status.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        use TaskStatus::*;

        matches!(
            (self, target),
            (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed)
        )
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A status transition event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: TaskStatus,
    pub to: TaskStatus,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

/// The stored state of one task.
///
/// `result` and `error` are private so that only the transition methods can
/// set them; this keeps "exactly one of result/error once terminal" true.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    /// Unique task ID.
    pub id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Name of the unit of work bound to this task.
    pub kind: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
    /// When the task was submitted.
    pub created_at: DateTime<Utc>,
    /// When the worker started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Transition history.
    pub transitions: Vec<StateTransition>,
}

impl TaskRecord {
    /// Create a pending record with a fresh id.
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_id(TaskId::new(), kind)
    }

    /// Create a pending record for a known id.
    pub fn with_id(id: TaskId, kind: impl Into<String>) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            kind: kind.into(),
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            transitions: Vec::new(),
        }
    }

    pub fn result(&self) -> Option<&serde_json::Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Pending -> Running.
    pub fn start(&mut self) -> Result<(), TaskError> {
        self.transition_to(TaskStatus::Running, None)
    }

    /// Running -> Completed, storing the result payload.
    pub fn complete(&mut self, result: serde_json::Value) -> Result<(), TaskError> {
        self.transition_to(TaskStatus::Completed, None)?;
        self.result = Some(result);
        Ok(())
    }

    /// Pending|Running -> Failed, storing the error description.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TaskError> {
        let error = error.into();
        self.transition_to(TaskStatus::Failed, Some(error.clone()))?;
        self.error = Some(error);
        Ok(())
    }

    fn transition_to(&mut self, new_status: TaskStatus, reason: Option<String>) -> Result<(), TaskError> {
        if !self.status.can_transition_to(new_status) {
            return Err(TaskError::InvalidTransition {
                id: self.id,
                from: self.status.to_string(),
                to: new_status.to_string(),
            });
        }

        self.transitions.push(StateTransition {
            from: self.status,
            to: new_status,
            timestamp: Utc::now(),
            reason,
        });
        self.status = new_status;

        match new_status {
            TaskStatus::Running => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::Failed => self.completed_at = Some(Utc::now()),
            TaskStatus::Pending => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_valid() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn status_transitions_invalid() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Running.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Failed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Failed.can_transition_to(TaskStatus::Pending));
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn record_completes_with_result_only() {
        let mut record = TaskRecord::new("price_lookup");
        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.result().is_none() && record.error().is_none());

        record.start().unwrap();
        assert_eq!(record.status, TaskStatus::Running);
        assert!(record.started_at.is_some());
        assert!(record.result().is_none() && record.error().is_none());

        record.complete(serde_json::json!({"price": 1})).unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.completed_at.is_some());
        assert_eq!(record.result().unwrap()["price"], 1);
        assert!(record.error().is_none());
        assert_eq!(record.transitions.len(), 2);
    }

    #[test]
    fn record_fails_with_error_only() {
        let mut record = TaskRecord::new("price_lookup");
        record.start().unwrap();
        record.fail("boom").unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error(), Some("boom"));
        assert!(record.result().is_none());
        assert_eq!(record.transitions[1].reason.as_deref(), Some("boom"));
    }

    #[test]
    fn terminal_record_rejects_further_writes() {
        let mut record = TaskRecord::new("price_lookup");
        record.start().unwrap();
        record.complete(serde_json::json!(1)).unwrap();

        assert!(matches!(
            record.fail("late"),
            Err(TaskError::InvalidTransition { .. })
        ));
        assert!(record.complete(serde_json::json!(2)).is_err());
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result(), Some(&serde_json::json!(1)));
        assert!(record.error().is_none());
    }

    #[test]
    fn pending_cannot_complete_directly() {
        let mut record = TaskRecord::new("price_lookup");
        assert!(record.complete(serde_json::json!(1)).is_err());
        assert!(record.result().is_none());
    }

    #[test]
    fn task_id_parses_round_trip() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TaskId>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TaskStatus::Running).unwrap(), "\"running\"");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
    }
}
