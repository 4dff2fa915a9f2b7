//! WebSocket stream of task lifecycle events.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::routes::AppState;
use crate::worker::TaskManager;

pub(super) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.manager))
}

async fn handle_socket(mut socket: WebSocket, manager: Arc<TaskManager>) {
    info!("WebSocket client connected");

    let mut rx = manager.subscribe();

    // Tell the client the stream is live so it does not race the first event.
    let summary = manager.summary().await;
    let hello = serde_json::json!({ "type": "subscribed", "summary": summary });
    if socket.send(Message::Text(hello.to_string().into())).await.is_err() {
        warn!("Failed to send subscription ack, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        let Ok(json) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        // Clients recover by polling /task_status.
                        warn!(missed = n, "WS client lagged behind task events");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }
}
