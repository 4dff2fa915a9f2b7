//! Task manager: submission, status lookup and stop requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::worker::events::{DEFAULT_EVENT_CAPACITY, TaskEvent};
use crate::worker::state::{TaskId, TaskRecord, TaskStatus};
use crate::worker::store::{StoreSummary, TaskStore};
use crate::worker::task::UnitOfWork;
use crate::worker::worker::{ActiveTasks, Worker, WorkerDeps};

/// Tunables for the task manager.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Upper bound on a single unit of work.
    pub task_timeout: Option<Duration>,
    /// How long terminal tasks are kept. `None` keeps them forever.
    pub retention: Option<Duration>,
}

/// Public contract for task submission and inspection.
///
/// Owns the task store. The manager creates each record in Pending; every
/// later transition belongs to that task's worker.
pub struct TaskManager {
    config: ManagerConfig,
    store: Arc<TaskStore>,
    active: ActiveTasks,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskManager {
    /// Create a manager with an empty store.
    pub fn new(config: ManagerConfig) -> Arc<Self> {
        let (events, _rx) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Arc::new(Self {
            config,
            store: Arc::new(TaskStore::new()),
            active: ActiveTasks::default(),
            events,
        })
    }

    /// Submit a unit of work. Returns as soon as the task is registered and
    /// its worker is spawned.
    pub async fn submit(&self, work: Arc<dyn UnitOfWork>) -> TaskId {
        let task_id = self.register(work.kind()).await;
        let cancel = CancellationToken::new();
        self.active.write().await.insert(task_id, cancel.clone());
        let _ = self.events.send(TaskEvent::update(task_id, TaskStatus::Pending));

        let worker = Worker::new(task_id, self.worker_deps());
        tokio::spawn(worker.run(work, cancel));

        tracing::info!(task_id = %task_id, "Task submitted");
        task_id
    }

    /// Insert a fresh Pending record, regenerating the id on collision.
    async fn register(&self, kind: &str) -> TaskId {
        loop {
            let record = TaskRecord::new(kind);
            let task_id = record.id;
            match self.store.insert(record).await {
                Ok(()) => return task_id,
                Err(e) => {
                    tracing::error!(error = %e, "Task id collision, regenerating");
                }
            }
        }
    }

    fn worker_deps(&self) -> WorkerDeps {
        WorkerDeps {
            store: Arc::clone(&self.store),
            active: Arc::clone(&self.active),
            events: self.events.clone(),
            timeout: self.config.task_timeout,
        }
    }

    /// Snapshot of a task's current record.
    pub async fn get_status(&self, task_id: TaskId) -> Result<TaskRecord, TaskError> {
        self.store.get(task_id).await
    }

    /// Request cooperative cancellation of a task.
    ///
    /// The task ends in Failed once its worker observes the request. Stopping
    /// a task that already finished does nothing.
    pub async fn stop(&self, task_id: TaskId) -> Result<(), TaskError> {
        let record = self.store.get(task_id).await?;
        if record.status.is_terminal() {
            tracing::debug!(task_id = %task_id, status = %record.status, "Stop ignored for finished task");
            return Ok(());
        }

        if let Some(cancel) = self.active.read().await.get(&task_id) {
            cancel.cancel();
            tracing::info!(task_id = %task_id, "Stop signal sent");
        }
        Ok(())
    }

    /// Stop every non-terminal task.
    pub async fn stop_all(&self) {
        let active = self.active.read().await;
        for cancel in active.values() {
            cancel.cancel();
        }
        if !active.is_empty() {
            tracing::info!(count = active.len(), "Stopped all active tasks");
        }
    }

    /// Number of tasks that have not reached a terminal status.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Count tasks per status.
    pub async fn summary(&self) -> StoreSummary {
        self.store.summary().await
    }

    /// Subscribe to task lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Apply the retention policy. Returns the number of tasks evicted.
    pub async fn evict_expired(&self) -> usize {
        let Some(retention) = self.config.retention else {
            return 0;
        };

        let evicted = self.store.evict_terminal(retention).await;
        if evicted > 0 {
            tracing::info!(count = evicted, "Evicted finished tasks");
        }
        evicted
    }
}

/// Spawn a background task that periodically evicts expired tasks.
pub fn spawn_eviction_task(manager: Arc<TaskManager>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            manager.evict_expired().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::error::WorkError;
    use crate::worker::task::WorkContext;

    /// Sleeps cooperatively, then echoes its label.
    struct Delayed {
        label: String,
        delay: Duration,
    }

    #[async_trait]
    impl UnitOfWork for Delayed {
        fn kind(&self) -> &str {
            "delayed"
        }

        async fn run(&self, ctx: WorkContext) -> Result<Value, WorkError> {
            ctx.sleep(self.delay).await?;
            Ok(json!({ "label": self.label }))
        }
    }

    fn delayed(label: &str, millis: u64) -> Arc<dyn UnitOfWork> {
        Arc::new(Delayed {
            label: label.to_string(),
            delay: Duration::from_millis(millis),
        })
    }

    async fn wait_terminal(manager: &TaskManager, id: TaskId) -> TaskRecord {
        for _ in 0..200 {
            let record = manager.get_status(id).await.unwrap();
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {id} never finished");
    }

    #[tokio::test]
    async fn submit_returns_before_work_finishes() {
        let manager = TaskManager::new(ManagerConfig::default());
        let id = manager.submit(delayed("slow", 500)).await;

        let record = manager.get_status(id).await.unwrap();
        assert!(matches!(record.status, TaskStatus::Pending | TaskStatus::Running));
        assert!(record.result().is_none());
        assert!(record.error().is_none());
    }

    #[tokio::test]
    async fn task_completes_and_stays_completed() {
        let manager = TaskManager::new(ManagerConfig::default());
        let id = manager.submit(delayed("quick", 10)).await;

        let record = wait_terminal(&manager, id).await;
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.result().unwrap()["label"], "quick");

        tokio::time::sleep(Duration::from_millis(30)).await;
        let again = manager.get_status(id).await.unwrap();
        assert_eq!(again.status, TaskStatus::Completed);
        assert_eq!(again.result(), record.result());
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let manager = TaskManager::new(ManagerConfig::default());
        let result = manager.get_status(TaskId::new()).await;
        assert!(matches!(result, Err(TaskError::NotFound { .. })));
        assert!(manager.stop(TaskId::new()).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_submissions_are_independent() {
        let manager = TaskManager::new(ManagerConfig::default());

        let submissions = (0..32).map(|i| {
            let manager = Arc::clone(&manager);
            async move { (i, manager.submit(delayed(&format!("task-{i}"), 5)).await) }
        });
        let ids = futures::future::join_all(submissions).await;

        let distinct: HashSet<TaskId> = ids.iter().map(|(_, id)| *id).collect();
        assert_eq!(distinct.len(), 32);

        for (i, id) in ids {
            let record = wait_terminal(&manager, id).await;
            assert_eq!(record.status, TaskStatus::Completed);
            assert_eq!(record.result().unwrap()["label"], format!("task-{i}"));
        }
        assert_eq!(manager.summary().await.completed, 32);
    }

    #[tokio::test]
    async fn stop_fails_running_task() {
        let manager = TaskManager::new(ManagerConfig::default());
        let id = manager.submit(delayed("long", 10_000)).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.stop(id).await.unwrap();

        let record = wait_terminal(&manager, id).await;
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error(), Some("Operation stopped by user request."));
    }

    #[tokio::test]
    async fn stop_after_completion_is_noop() {
        let manager = TaskManager::new(ManagerConfig::default());
        let id = manager.submit(delayed("quick", 1)).await;
        wait_terminal(&manager, id).await;

        manager.stop(id).await.unwrap();
        assert_eq!(manager.get_status(id).await.unwrap().status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn events_follow_lifecycle() {
        let manager = TaskManager::new(ManagerConfig::default());
        let mut rx = manager.subscribe();
        let id = manager.submit(delayed("quick", 1)).await;

        let mut seen = Vec::new();
        while seen.len() < 3 {
            let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event.task_id(), id);
            seen.push(event.status());
        }
        assert_eq!(
            seen,
            vec![TaskStatus::Pending, TaskStatus::Running, TaskStatus::Completed]
        );
    }

    #[tokio::test]
    async fn eviction_disabled_by_default() {
        let manager = TaskManager::new(ManagerConfig::default());
        let id = manager.submit(delayed("quick", 1)).await;
        wait_terminal(&manager, id).await;

        assert_eq!(manager.evict_expired().await, 0);
        assert!(manager.get_status(id).await.is_ok());
    }

    #[tokio::test]
    async fn eviction_removes_finished_tasks_only() {
        let manager = TaskManager::new(ManagerConfig {
            retention: Some(Duration::ZERO),
            ..Default::default()
        });
        let done = manager.submit(delayed("quick", 1)).await;
        wait_terminal(&manager, done).await;
        let running = manager.submit(delayed("long", 10_000)).await;

        assert_eq!(manager.evict_expired().await, 1);
        assert!(matches!(
            manager.get_status(done).await,
            Err(TaskError::NotFound { .. })
        ));
        assert!(manager.get_status(running).await.is_ok());
        manager.stop_all().await;
    }
    #[tokio::test(start_paused = true)]
    async fn eviction_task_sweeps_on_interval() {
        let manager = TaskManager::new(ManagerConfig {
            retention: Some(Duration::ZERO),
            ..Default::default()
        });
        let sweeper = spawn_eviction_task(Arc::clone(&manager), Duration::from_secs(60));

        // Let the immediate first tick pass before the task exists.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let id = manager.submit(delayed("quick", 1)).await;
        wait_terminal(&manager, id).await;
        assert!(manager.get_status(id).await.is_ok());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(matches!(
            manager.get_status(id).await,
            Err(TaskError::NotFound { .. })
        ));
        sweeper.abort();
    }
}
