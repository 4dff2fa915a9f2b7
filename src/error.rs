//! Error types for the finance agent.

use std::time::Duration;

use crate::worker::TaskId;

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Work error: {0}")]
    Work(#[from] WorkError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised synchronously by the task registry and manager.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task {id} not found")]
    NotFound { id: TaskId },

    /// The id did not parse, so it was never issued.
    #[error("Task {raw:?} not found: malformed id")]
    MalformedId { raw: String },

    /// Id generation produced an id that is already registered.
    /// This is an internal invariant violation, never a caller error.
    #[error("Task {id} already exists")]
    DuplicateKey { id: TaskId },

    #[error("Invalid task arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("Task {id} cannot transition from {from} to {to}")]
    InvalidTransition { id: TaskId, from: String, to: String },
}

/// Failures inside a unit of work.
///
/// These never reach the submitter directly: the worker records them as the
/// task's `error` field.
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    #[error("{0}")]
    Failed(String),

    #[error("Upstream {source_name} failed: {reason}")]
    Upstream { source_name: String, reason: String },

    #[error("Work timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Operation stopped by user request.")]
    Cancelled,

    #[error("Work panicked: {0}")]
    Panicked(String),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
