//! REST endpoints for task submission and polling.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{debug, info};

use super::model::{TaskRequest, TaskStartResponse, TaskStatusResponse};
use super::ws::ws_handler;
use crate::config::AgentConfig;
use crate::error::TaskError;
use crate::price::{HttpPriceSource, MockPriceSource, PriceArgs, PriceLookup, PriceSource};
use crate::worker::{TaskId, TaskManager, TaskStatus};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TaskManager>,
    /// Where price lookups get their numbers.
    pub prices: Arc<dyn PriceSource>,
    /// Simulated latency of each lookup.
    pub work_delay: Duration,
}

impl AppState {
    /// Wire a fresh task manager and price source from configuration.
    pub fn from_config(config: &AgentConfig) -> crate::error::Result<Self> {
        let prices: Arc<dyn PriceSource> = match &config.price_url {
            Some(url) => Arc::new(HttpPriceSource::new(url.clone())?),
            None => Arc::new(MockPriceSource::new()),
        };

        Ok(Self {
            manager: TaskManager::new(config.manager_config()),
            prices,
            work_delay: config.work_delay,
        })
    }
}

/// Build the Axum router with task REST and WebSocket routes.
pub fn task_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute_task))
        .route("/task_status/{id}", get(task_status))
        .route("/task_stop/{id}", post(stop_task))
        .route("/api/tasks/summary", get(summary))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TaskError::NotFound { .. } | TaskError::MalformedId { .. } => {
                debug!(error = %self, "Unknown task requested");
                (StatusCode::NOT_FOUND, "Task not found".to_string())
            }
            TaskError::InvalidArguments { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            TaskError::DuplicateKey { .. } | TaskError::InvalidTransition { .. } => {
                tracing::error!(error = %self, "Internal task error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, TaskError> {
    raw.parse().map_err(|_| TaskError::MalformedId {
        raw: raw.to_string(),
    })
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "finance-agent"
    }))
}

// ── Tasks ───────────────────────────────────────────────────────────────

/// POST /execute
async fn execute_task(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<impl IntoResponse, TaskError> {
    let args = PriceArgs::from_value(&request.arguments)?;
    info!(
        agent = request.agent_name.as_deref().unwrap_or("-"),
        currency = %args.currency,
        "Task request received"
    );

    let work = PriceLookup::new(args, Arc::clone(&state.prices), state.work_delay);
    let task_id = state.manager.submit(Arc::new(work)).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskStartResponse {
            task_id,
            status: TaskStatus::Pending,
        }),
    ))
}

/// GET /task_status/{id}
async fn task_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskStatusResponse>, TaskError> {
    let task_id = parse_task_id(&id)?;
    let record = state.manager.get_status(task_id).await?;
    debug!(task_id = %task_id, status = %record.status, "Status polled");
    Ok(Json(record.into()))
}

/// POST /task_stop/{id}
async fn stop_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, TaskError> {
    let task_id = parse_task_id(&id)?;
    state.manager.stop(task_id).await?;
    Ok(Json(serde_json::json!({ "status": "stop signal sent" })))
}

/// GET /api/tasks/summary
async fn summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.summary().await)
}
