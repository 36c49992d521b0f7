// Compose management route definitions

use axum::{
    routing::post,
    Router,
};

use crate::config::state::AppState;
use super::handler;

/// Creates router with endpoints that act on the compose services
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/services/{name}/restart", post(handler::restart_handler))
        .route("/admin/services/{name}/scale", post(handler::scale_handler))
}
