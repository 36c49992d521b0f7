// Gateway introspection route definitions

use axum::{
    routing::get,
    Router,
};

use crate::config::state::AppState;
use super::handler;

/// Creates router with the gateway's own liveness and status endpoints
pub fn gateway_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/status", get(handler::status_handler))
}
