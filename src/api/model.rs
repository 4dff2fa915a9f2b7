//! Request and response bodies for the task API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::worker::{TaskId, TaskRecord, TaskStatus};

/// Body of `POST /execute`, as sent by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub agent_name: Option<String>,
    /// Loosely-typed arguments; validated per unit of work.
    #[serde(default)]
    pub arguments: Value,
}

/// Response of `POST /execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStartResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// Response of `GET /task_status/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskRecord> for TaskStatusResponse {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.id,
            status: record.status,
            result: record.result().cloned(),
            error: record.error().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_tolerates_missing_fields() {
        let req: TaskRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.agent_name.is_none());
        assert!(req.arguments.is_null());

        let req: TaskRequest =
            serde_json::from_value(json!({"agent_name": "finance", "arguments": {"currency": "ETH"}}))
                .unwrap();
        assert_eq!(req.arguments["currency"], "ETH");
    }

    #[test]
    fn status_response_omits_empty_fields() {
        let record = TaskRecord::new("price_lookup");
        let json = serde_json::to_value(TaskStatusResponse::from(record)).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }
}
