// File: ./src/server/ws.rs
use super::AppState;
use super::handlers::ApiError;
use crate::model::WsMessage;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, Default)]
pub struct WsParams {
    pub client_id: Option<String>,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<WsParams>,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    if !state.hub.is_enabled() {
        return ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "WebSocket not enabled")
            .into_response();
    }
    let Some(upgrade) = upgrade else {
        return ApiError::new(StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required")
            .into_response();
    };
    let client_id = params
        .client_id
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    upgrade.on_upgrade(move |socket| serve_socket(state, socket, id, client_id))
}

async fn serve_socket(state: AppState, socket: WebSocket, list_id: String, client_id: String) {
    let Some(mut sub) = state.hub.subscribe(&list_id, &client_id) else {
        return;
    };
    tracing::info!(%list_id, %client_id, "websocket client connected");

    let (mut sink, mut stream) = socket.split();

    match serde_json::to_string(&WsMessage::connected(&list_id, &client_id)) {
        Ok(welcome) => {
            if sink.send(Message::Text(welcome)).await.is_err() {
                state.hub.unsubscribe(&list_id, &client_id, sub.connection);
                return;
            }
        }
        Err(e) => tracing::error!(error = %e, "failed to encode welcome message"),
    }

    loop {
        tokio::select! {
            outgoing = sub.receiver.recv() => {
                // None: the hub replaced or dropped this connection.
                let Some(text) = outgoing else { break };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%client_id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    state.hub.unsubscribe(&list_id, &client_id, sub.connection);
    let _ = sink.close().await;
    tracing::info!(%list_id, %client_id, "websocket client disconnected");
}
