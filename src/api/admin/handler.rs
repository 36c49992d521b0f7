// Handlers that restart or scale compose services

use serde::Deserialize;
use serde_json::json;
use axum::{http::StatusCode, extract::{Path, State}, Json};

use crate::config::state::AppState;
use crate::deploy::DeployError;
use crate::utils::response_handler::HandlerResponse;
use tracing::{instrument, info, error};

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub replicas: u32,
}

/// Restarts one compose service
#[instrument(skip(state))]
pub async fn restart_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResponse {
    info!("Restart requested");

    match state.orchestrator.restart_service(&name).await {
        Ok(()) => HandlerResponse::new(StatusCode::OK)
            .data(json!({ "service": name }))
            .message(format!("Restarted service: {}", name)),
        Err(e) => deploy_error_response(&name, e),
    }
}

/// Scales one compose service to the requested replica count
#[instrument(skip(state), fields(replicas = request.replicas))]
pub async fn scale_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ScaleRequest>,
) -> HandlerResponse {
    info!("Scale requested");

    match state.orchestrator.scale_service(&name, request.replicas).await {
        Ok(()) => HandlerResponse::new(StatusCode::OK)
            .data(json!({ "service": name, "replicas": request.replicas }))
            .message(format!("Scaled {} to {} replicas", name, request.replicas)),
        Err(e) => deploy_error_response(&name, e),
    }
}

fn deploy_error_response(name: &str, err: DeployError) -> HandlerResponse {
    let status: StatusCode = match &err {
        DeployError::UnknownService(_) => StatusCode::NOT_FOUND,
        DeployError::InvalidReplicas(_) => StatusCode::BAD_REQUEST,
        _ => {
            error!(service = %name, "Compose command failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    HandlerResponse::new(status)
        .data(json!({ "service": name, "error": err.to_string() }))
        .message(format!("Could not update service {}", name))
}
