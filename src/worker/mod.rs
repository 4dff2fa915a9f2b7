//! Task lifecycle core.
//!
//! Core components:
//! - `state`: Task state machine (Pending → Running → Completed/Failed)
//! - `store`: TaskStore, the concurrency-safe registry of task records
//! - `task`: UnitOfWork trait and the context handed to it
//! - `worker`: Runs one unit of work and records its outcome
//! - `manager`: Submission, status lookup, stop, and retention
//! - `events`: Lifecycle events broadcast to live subscribers

pub mod events;
pub mod manager;
pub mod state;
pub mod store;
pub mod task;
pub mod worker;

pub use events::TaskEvent;
pub use manager::{ManagerConfig, TaskManager, spawn_eviction_task};
pub use state::{StateTransition, TaskId, TaskRecord, TaskStatus};
pub use store::{StoreSummary, TaskStore};
pub use task::{UnitOfWork, WorkContext};
pub use worker::{Worker, WorkerDeps};
