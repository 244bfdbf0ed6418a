//! WebSocket handler for live order-update delivery
//!
//! One persistent duplex channel per connection, keyed by the
//! authenticated user identity. The hub side never blocks on this
//! connection: events arrive through a bounded mpsc receiver and a stalled
//! socket just loses events (the dashboard refetches on reconnect).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::auth::{CurrentUser, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Browser WebSocket clients cannot set headers, so the credential may
    /// arrive as a query parameter instead of `Authorization: Bearer`.
    pub token: Option<String>,
}

/// GET /api/events/ws — upgrade to WebSocket
///
/// Requires a valid, previously issued credential at connection time;
/// rejects with 401 before upgrading otherwise.
pub async fn subscribe_ws(
    State(state): State<ServerState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let header_token = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(JwtService::extract_from_header)
        .map(str::to_string);

    let token = query
        .token
        .or(header_token)
        .ok_or_else(AppError::unauthorized)?;

    let claims = state.jwt_service().validate_token(&token).map_err(|e| {
        tracing::warn!(target: "security", error = %e, "ws_auth_failed");
        match e {
            crate::auth::JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;
    let user = CurrentUser::try_from(claims)
        .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {e}")))?;

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(socket, state, user)))
}

async fn handle_ws_connection(socket: WebSocket, state: ServerState, user: CurrentUser) {
    tracing::info!(user_id = %user.id, role = %user.role, "WebSocket connected");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Register in the hub; the subscription dies with this connection
    let mut subscription = state.hub().subscribe(&user.id);
    let shutdown = state.hub().shutdown_token().clone();

    // Main select loop
    loop {
        tokio::select! {
            // Incoming message from the client
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(user_id = %user.id, "WebSocket disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(user_id = %user.id, "WebSocket error: {e}");
                        break;
                    }
                    // Clients have nothing to say on this channel
                    _ => {}
                }
            }

            // Event to push to the client
            event = subscription.rx.recv() => {
                match event {
                    Some(event) => {
                        if let Ok(json) = serde_json::to_string(&event)
                            && ws_sink.send(Message::Text(json.into())).await.is_err()
                        {
                            tracing::warn!(user_id = %user.id, "Failed to push event via WS");
                            break;
                        }
                    }
                    None => break, // channel closed
                }
            }

            // Server shutting down
            _ = shutdown.cancelled() => {
                tracing::info!(user_id = %user.id, "Closing WebSocket for shutdown");
                break;
            }
        }
    }

    // Send Close frame (best-effort)
    let _ = ws_sink.close().await;

    // Cleanup: free the subscription slot promptly
    state.hub().unsubscribe(&subscription.user_id, subscription.id);

    tracing::info!(user_id = %user.id, "WebSocket session cleaned up");
}
