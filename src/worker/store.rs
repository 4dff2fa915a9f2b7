//! In-memory registry of task records.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::TaskError;
use crate::worker::state::{TaskId, TaskRecord, TaskStatus};

/// Concurrency-safe map from task id to task record.
///
/// Reads take the shared lock and return a cloned snapshot. Every mutation
/// happens under the exclusive lock, so a record never has two writers.
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl TaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new record. Fails if the id is already present.
    pub async fn insert(&self, record: TaskRecord) -> Result<(), TaskError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&record.id) {
            return Err(TaskError::DuplicateKey { id: record.id });
        }
        tasks.insert(record.id, record);
        Ok(())
    }

    /// Get a snapshot of a record by id.
    pub async fn get(&self, id: TaskId) -> Result<TaskRecord, TaskError> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(TaskError::NotFound { id })
    }

    /// Apply a mutation to an existing record atomically.
    pub async fn update<F, R>(&self, id: TaskId, f: F) -> Result<R, TaskError>
    where
        F: FnOnce(&mut TaskRecord) -> R,
    {
        let mut tasks = self.tasks.write().await;
        let record = tasks.get_mut(&id).ok_or(TaskError::NotFound { id })?;
        Ok(f(record))
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Remove terminal records that finished more than `older_than` ago.
    /// Returns the number of records removed.
    pub async fn evict_terminal(&self, older_than: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, record| {
            !(record.status.is_terminal()
                && record.completed_at.is_some_and(|done| done <= cutoff))
        });
        before - tasks.len()
    }

    /// Count records per status.
    pub async fn summary(&self) -> StoreSummary {
        let tasks = self.tasks.read().await;

        let mut summary = StoreSummary::default();
        for record in tasks.values() {
            match record.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::Running => summary.running += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Failed => summary.failed += 1,
            }
        }

        summary.total = tasks.len();
        summary
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of all task records.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct StoreSummary {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}
