//! Task lifecycle events broadcast to live subscribers.

use serde::{Deserialize, Serialize};

use crate::worker::state::{TaskId, TaskStatus};

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Emitted on every status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    TaskUpdate {
        task_id: TaskId,
        status: TaskStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl TaskEvent {
    pub fn update(task_id: TaskId, status: TaskStatus) -> Self {
        Self::TaskUpdate {
            task_id,
            status,
            error: None,
        }
    }

    pub fn failed(task_id: TaskId, error: impl Into<String>) -> Self {
        Self::TaskUpdate {
            task_id,
            status: TaskStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            Self::TaskUpdate { task_id, .. } => *task_id,
        }
    }

    pub fn status(&self) -> TaskStatus {
        match self {
            Self::TaskUpdate { status, .. } => *status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_wire_format() {
        let id = TaskId::new();
        let json = serde_json::to_value(TaskEvent::update(id, TaskStatus::Running)).unwrap();
        assert_eq!(json["type"], "task_update");
        assert_eq!(json["task_id"], id.to_string());
        assert_eq!(json["status"], "running");
        assert!(json.get("error").is_none());

        let json = serde_json::to_value(TaskEvent::failed(id, "boom")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }
}
