//! Events API 模块 (WebSocket)

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events/ws", get(handler::subscribe_ws))
}
