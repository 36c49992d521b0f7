// Gateway liveness and aggregated sub-app status

use std::collections::HashMap;

use serde_json::{json, Value};
use axum::{http::StatusCode, extract::State};
use once_cell::sync::Lazy;

use crate::config::state::AppState;
use crate::health::{HealthStatus, SubAppHealth};
use crate::utils::response_handler::HandlerResponse;
use tracing::{instrument, info};

static INSTANCE_ID: Lazy<String> = Lazy::new(get_instance_identifier);

/// Liveness of the gateway process itself
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<AppState>) -> HandlerResponse {
    HandlerResponse::new(StatusCode::OK)
        .data(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "status": "healthy",
            "environment": state.environment.environment.as_ref(),
            "instance_id": INSTANCE_ID.as_str(),
        }))
        .message("Gateway is running")
}

/// Last health check result and breaker state of every sub-app
#[instrument(skip(state))]
pub async fn status_handler(State(state): State<AppState>) -> HandlerResponse {
    info!("Status endpoint called");

    let board: HashMap<String, SubAppHealth> = state.health.snapshot().await;
    let mut subapps: Vec<Value> = Vec::with_capacity(state.registry.len());
    let mut all_healthy: bool = true;

    for subapp in state.registry.iter() {
        let health: Option<&SubAppHealth> = board.get(&subapp.name);
        let breaker: Value = match state.breakers.get(&subapp.name) {
            Some(breaker) => json!(breaker.stats().await),
            None => Value::Null,
        };

        all_healthy &= matches!(
            health,
            Some(SubAppHealth { status: HealthStatus::Healthy, .. })
        );

        subapps.push(json!({
            "name": subapp.name,
            "port": subapp.port,
            "health_path": subapp.health_path,
            "health": health,
            "circuit_breaker": breaker,
        }));
    }

    HandlerResponse::new(StatusCode::OK)
        .data(json!({
            "instance_id": INSTANCE_ID.as_str(),
            "all_healthy": all_healthy,
            "subapps": subapps,
        }))
        .message(if all_healthy {
            "All sub-apps passed their last health check"
        } else {
            "One or more sub-apps are unhealthy or not yet checked"
        })
}

/// Generate a unique identifier for this gateway instance
fn get_instance_identifier() -> String {
    // Try to get container ID first (for Docker environments)
    if let Ok(hostname) = std::env::var("HOSTNAME") {
        if hostname.len() >= 12 && hostname.chars().all(|c: char| c.is_ascii_hexdigit()) {
            return format!("container_{}", &hostname[..12]); // Docker container ID
        }
        return format!("host_{}", hostname);
    }

    // Fallback to hostname
    if let Ok(hostname) = hostname::get() {
        if let Some(hostname_str) = hostname.to_str() {
            return format!("host_{}", hostname_str);
        }
    }

    // Last resort: a process-unique ID
    format!("process_{}", std::process::id())
}
