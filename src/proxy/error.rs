// Proxy failures and their HTTP mapping

use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde_json::json;
use thiserror::Error;

use crate::utils::response_handler::HandlerResponse;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Subapp {0} is currently unavailable: circuit breaker is open")]
    CircuitOpen(String),

    #[error("Subapp {name} is currently unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Request body exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("Failed to read request body: {0}")]
    InvalidBody(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::CircuitOpen(_) | ProxyError::Unavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ProxyError::CircuitOpen(_) => "circuit_open",
            ProxyError::Unavailable { .. } => "upstream_unavailable",
            ProxyError::PayloadTooLarge(_) => "payload_too_large",
            ProxyError::InvalidBody(_) => "invalid_body",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        HandlerResponse::new(self.status_code())
            .data(json!({ "error": self.kind() }))
            .message(self.to_string())
            .into_response()
    }
}
