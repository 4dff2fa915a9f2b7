//! Per-task worker execution.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use crate::error::{TaskError, WorkError};
use crate::worker::events::TaskEvent;
use crate::worker::state::{TaskId, TaskStatus};
use crate::worker::store::TaskStore;
use crate::worker::task::{UnitOfWork, WorkContext};

/// Cancellation handles for tasks that have not reached a terminal status.
pub type ActiveTasks = Arc<RwLock<HashMap<TaskId, CancellationToken>>>;

/// Shared dependencies for worker execution.
#[derive(Clone)]
pub struct WorkerDeps {
    pub store: Arc<TaskStore>,
    pub active: ActiveTasks,
    pub events: broadcast::Sender<TaskEvent>,
    /// Upper bound on a single unit of work (`None` = unbounded).
    pub timeout: Option<Duration>,
}

/// Worker that executes a single task.
///
/// The worker owns every transition after Pending. Failures of the unit of
/// work are recorded on the task and never returned to anyone.
pub struct Worker {
    task_id: TaskId,
    deps: WorkerDeps,
}

impl Worker {
    /// Create a new worker for a specific task.
    pub fn new(task_id: TaskId, deps: WorkerDeps) -> Self {
        Self { task_id, deps }
    }

    fn store(&self) -> &Arc<TaskStore> {
        &self.deps.store
    }

    fn emit(&self, event: TaskEvent) {
        // No receivers is fine.
        let _ = self.deps.events.send(event);
    }

    /// Run the unit of work to a terminal status.
    pub async fn run(self, work: Arc<dyn UnitOfWork>, cancel: CancellationToken) {
        let task_id = self.task_id;

        if cancel.is_cancelled() {
            tracing::info!(task_id = %task_id, "Task stopped before its worker started");
            self.finish(Err(WorkError::Cancelled)).await;
            return;
        }

        match self.store().update(task_id, |record| record.start()).await {
            Ok(Ok(())) => self.emit(TaskEvent::update(task_id, TaskStatus::Running)),
            Ok(Err(e)) => {
                tracing::warn!(task_id = %task_id, error = %e, "Worker could not start task");
                self.release().await;
                return;
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Worker bound to unknown task");
                self.release().await;
                return;
            }
        }

        tracing::debug!(task_id = %task_id, kind = work.kind(), "Task running");

        let ctx = WorkContext::new(task_id, cancel.clone());
        let outcome = self.execute(work, ctx, &cancel).await;
        self.finish(outcome).await;
    }

    /// Run the work, converting panics, timeouts and stop requests into errors.
    async fn execute(
        &self,
        work: Arc<dyn UnitOfWork>,
        ctx: WorkContext,
        cancel: &CancellationToken,
    ) -> Result<Value, WorkError> {
        let guarded = AssertUnwindSafe(work.run(ctx))
            .catch_unwind()
            .map(|result| match result {
                Ok(outcome) => outcome,
                Err(panic) => Err(WorkError::Panicked(panic_message(panic.as_ref()))),
            });

        let bounded = async {
            match self.deps.timeout {
                Some(timeout) => tokio::time::timeout(timeout, guarded)
                    .await
                    .unwrap_or(Err(WorkError::Timeout { timeout })),
                None => guarded.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WorkError::Cancelled),
            outcome = bounded => outcome,
        }
    }

    /// Write the terminal status and broadcast it.
    async fn finish(&self, outcome: Result<Value, WorkError>) {
        let task_id = self.task_id;

        let (event, written) = match outcome {
            Ok(result) => (
                TaskEvent::update(task_id, TaskStatus::Completed),
                self.store().update(task_id, |record| record.complete(result)).await,
            ),
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(task_id = %task_id, error = %message, "Task failed");
                (
                    TaskEvent::failed(task_id, message.clone()),
                    self.store().update(task_id, |record| record.fail(message)).await,
                )
            }
        };

        match written.and_then(|inner| inner) {
            Ok(()) => {
                tracing::info!(task_id = %task_id, status = %event.status(), "Task finished");
                self.emit(event);
            }
            Err(e @ TaskError::InvalidTransition { .. }) => {
                tracing::warn!(task_id = %task_id, error = %e, "Dropped late task outcome");
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Failed to record task outcome");
            }
        }

        self.release().await;
    }

    async fn release(&self) {
        self.deps.active.write().await.remove(&self.task_id);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
