// Fallback handler that relays unmatched requests to the owning sub-app

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::counter;
use serde_json::json;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use super::error::ProxyError;
use crate::alerting::{self, Alert};
use crate::config::state::AppState;
use crate::registry::Route;
use crate::resilience::CircuitBreaker;
use crate::utils::error_handler::status_for_error;
use crate::utils::response_handler::{HandlerResponse, Proxied};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const FORWARDED_PREFIX_HEADER: &str = "x-forwarded-prefix";

/// Headers that describe a single connection and must not be relayed
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are scoped to this hop too
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Routes the request to a registered sub-app or answers 404
pub async fn proxy_fallback(State(state): State<AppState>, req: Request) -> Response {
    let path: String = req.uri().path().to_string();

    let Some(route) = state.registry.resolve(&path) else {
        return HandlerResponse::new(StatusCode::NOT_FOUND)
            .data(json!({ "path": path }))
            .message("No gateway route or sub-app matches this path")
            .into_response();
    };

    let name: String = route.subapp.name.clone();
    match forward(&state, route, req).await {
        Ok(response) => {
            counter!("proxy_requests_total", "subapp" => name, "outcome" => "relayed").increment(1);
            response
        }
        Err(e) => {
            counter!("proxy_requests_total", "subapp" => name, "outcome" => "rejected").increment(1);
            e.into_response()
        }
    }
}

#[instrument(skip_all, fields(subapp = %route.subapp.name, path = %route.forward_path))]
async fn forward(state: &AppState, route: Route<'_>, req: Request) -> Result<Response, ProxyError> {
    let name: &str = &route.subapp.name;

    let breaker: Option<&CircuitBreaker> = state.breakers.get(name);
    if let Some(breaker) = breaker {
        if !breaker.allow().await {
            warn!("Circuit open, rejecting request");
            return Err(ProxyError::CircuitOpen(name.to_string()));
        }
    }

    let (parts, body) = req.into_parts();

    let limit: usize = state.environment.max_request_body_size;
    let body: Bytes = to_bytes(body, limit).await.map_err(|e: axum::Error| {
        if status_for_error(&e) == StatusCode::PAYLOAD_TOO_LARGE {
            ProxyError::PayloadTooLarge(limit)
        } else {
            ProxyError::InvalidBody(e.to_string())
        }
    })?;

    let mut url: String = format!(
        "http://{}:{}{}",
        state.environment.upstream_host, route.subapp.port, route.forward_path
    );
    if let Some(query) = parts.uri.query() {
        url.push('?');
        url.push_str(query);
    }

    let mut headers: HeaderMap = parts.headers;
    strip_hop_by_hop(&mut headers);
    if !headers.contains_key(REQUEST_ID_HEADER) {
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
    }
    if let Some(prefix) = route.prefix.as_deref() {
        if let Ok(value) = HeaderValue::from_str(prefix) {
            headers.insert(FORWARDED_PREFIX_HEADER, value);
        }
    }

    let result: Result<reqwest::Response, reqwest::Error> = state
        .upstream
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream: reqwest::Response = match result {
        Ok(response) if response.status().is_server_error() => {
            let reason: String = format!("upstream responded with {}", response.status());
            return Err(fail(state, breaker, name, reason).await);
        }
        Ok(response) => response,
        Err(e) => return Err(fail(state, breaker, name, e.to_string()).await),
    };

    let status: StatusCode = upstream.status();
    let mut response_headers: HeaderMap = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let bytes: Bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return Err(fail(state, breaker, name, e.to_string()).await),
    };

    if let Some(breaker) = breaker {
        breaker.record_success().await;
    }

    let mut response: Response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response.extensions_mut().insert(Proxied);
    Ok(response)
}

/// Counts the failure against the breaker, alerting when it trips
async fn fail(
    state: &AppState,
    breaker: Option<&CircuitBreaker>,
    name: &str,
    reason: String,
) -> ProxyError {
    error!("Error processing request for {}: {}", name, reason);

    if let Some(breaker) = breaker {
        if breaker.record_failure().await {
            counter!("circuit_breaker_trips_total", "subapp" => name.to_string()).increment(1);
            alerting::dispatch(state.notifier.clone(), Alert::circuit_open(name));
        }
    }

    ProxyError::Unavailable {
        name: name.to_string(),
        reason,
    }
}
