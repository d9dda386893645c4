//! WebSocket upgrade handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use meethub_realtime::connection::authenticator::AuthenticatedConnection;
use meethub_realtime::connection::heartbeat::{HeartbeatConfig, run_heartbeat};
use meethub_realtime::message::types::{AuthErrorCode, ServerEvent};

use crate::state::AppState;

/// Query parameters for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
///
/// Authentication failures still upgrade, so the structured
/// `auth_error` event can be delivered before the server closes the
/// socket; the client must reconnect with a valid token.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    let Some(token) = query.token else {
        return ws.on_upgrade(|socket| {
            reject(socket, AuthErrorCode::TokenMissing, "Missing access token")
        });
    };

    match state.engine.authenticator.authenticate(&token) {
        Ok(auth) => ws.on_upgrade(move |socket| handle_ws_connection(state, auth, socket)),
        Err(e) => {
            warn!(error = %e, "WebSocket authentication failed");
            let message = e.message;
            ws.on_upgrade(move |socket| {
                reject_owned(socket, AuthErrorCode::TokenInvalid, message)
            })
        }
    }
}

/// Sends `auth_error` and closes the socket.
async fn reject(socket: WebSocket, code: AuthErrorCode, message: &str) {
    reject_owned(socket, code, message.to_string()).await;
}

async fn reject_owned(mut socket: WebSocket, code: AuthErrorCode, message: String) {
    let event = ServerEvent::AuthError { code, message };
    if let Ok(text) = serde_json::to_string(&event) {
        let _ = socket.send(Message::Text(text.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

/// Handles an established, authenticated WebSocket connection.
async fn handle_ws_connection(state: AppState, auth: AuthenticatedConnection, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state
        .engine
        .connections
        .register(auth.user_id, auth.session_id, auth.role, auth.username)
        .await;

    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %auth.user_id,
        "WebSocket connection established"
    );

    // Outbound: serialize hub events onto the socket.
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let heartbeat = run_heartbeat(
        Arc::clone(&handle),
        HeartbeatConfig {
            ping_interval: Duration::from_secs(state.engine.config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(state.engine.config.ping_timeout_seconds),
        },
    );

    // Inbound: route client events until the socket closes or the
    // heartbeat declares the connection dead.
    let inbound = async {
        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    state
                        .engine
                        .connections
                        .handle_inbound(&conn_id, text.as_str())
                        .await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = inbound => {}
        _ = heartbeat => {}
    }

    outbound_task.abort();
    state.engine.connections.unregister(&conn_id).await;

    info!(
        conn_id = %conn_id,
        user_id = %auth.user_id,
        "WebSocket connection closed"
    );
}
