//! Unit-of-work abstraction executed by workers.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;
use crate::worker::state::TaskId;

/// Context handed to a unit of work when its worker starts.
#[derive(Debug, Clone)]
pub struct WorkContext {
    /// The task this execution is bound to.
    pub task_id: TaskId,
    cancel: CancellationToken,
}

impl WorkContext {
    pub fn new(task_id: TaskId, cancel: CancellationToken) -> Self {
        Self { task_id, cancel }
    }

    /// Whether a stop has been requested for this task.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleep for `duration`, returning early with `WorkError::Cancelled` on stop.
    pub async fn sleep(&self, duration: std::time::Duration) -> Result<(), WorkError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(WorkError::Cancelled),
        }
    }
}

/// A computation run on a background worker.
///
/// Arguments are captured by the implementor at construction time, already
/// validated into typed fields.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Short name recorded on the task (e.g. `price_lookup`).
    fn kind(&self) -> &str;

    /// Run the work to completion, returning the result payload.
    async fn run(&self, ctx: WorkContext) -> Result<Value, WorkError>;
}
