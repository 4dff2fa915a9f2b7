//! HTTP transport: REST routes plus a live event WebSocket.

pub mod model;
pub mod routes;
mod ws;

pub use model::{TaskRequest, TaskStartResponse, TaskStatusResponse};
pub use routes::{AppState, task_routes};
