//! tests/mod.rs
//! Shared test helpers: spawn the gateway and stub sub-apps on ephemeral ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::Request,
    http::{HeaderMap, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener as TokioTcpListener;

use subapp_gateway::alerting::{Alert, AlertError, AlertNotifier};
use subapp_gateway::config::{environment::EnvironmentVariables, state::AppState};
use subapp_gateway::core::server::create_app;
use subapp_gateway::deploy::{CommandOutput, ComposeRunner, DeployError};

/// Compose runner that records every invocation instead of spawning docker
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub fail: bool,
}

#[async_trait]
impl ComposeRunner for RecordingRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, DeployError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if self.fail {
            return Err(DeployError::CommandFailed {
                command: args.join(" "),
                status: "exit status: 1".to_string(),
                stderr: "no such service".to_string(),
            });
        }
        Ok(CommandOutput::default())
    }
}

/// Notifier that keeps alerts in memory
#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<Alert>>,
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub base_url: String,
    pub state: AppState,
    pub runner: Arc<RecordingRunner>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn bind_ephemeral() -> TokioTcpListener {
    // * Bind an ephemeral port using std::net::TcpListener.
    let std_listener: std::net::TcpListener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    std_listener.set_nonblocking(true).unwrap();

    // * Convert std::net::TcpListener to tokio::net::TcpListener.
    TokioTcpListener::from_std(std_listener).expect("Failed to convert to tokio listener")
}

/// A port nothing listens on
pub fn dead_port() -> u16 {
    let listener: std::net::TcpListener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn echo(req: Request) -> Json<Value> {
    let (parts, body) = req.into_parts();
    let body: Bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let header = |headers: &HeaderMap, name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "forwarded_prefix": header(&parts.headers, "x-forwarded-prefix"),
        "request_id": header(&parts.headers, "x-request-id"),
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Spawns a stand-in for an ASGI sub-app and returns its port
pub fn spawn_upstream(name: &'static str) -> u16 {
    let app: Router = Router::new()
        .route("/", get(move || async move { Json(json!({ "message": format!("Hello {name}") })) }))
        .route("/health", get(move || async move { Json(json!({ "status": format!("{name} is Healthy") })) }))
        .route("/healthy", get(move || async move { Json(json!({ "status": format!("{name} is Healthy") })) }))
        .route("/echo", any(echo))
        .route("/boom", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/slow", get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "late"
        }));

    let listener: TokioTcpListener = bind_ephemeral();
    let port: u16 = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Upstream failed");
    });

    port
}

/// Builds gateway state from the given variables without serving it
pub fn build_state(
    vars: &[(&str, &str)],
    runner: RecordingRunner,
) -> (AppState, Arc<RecordingRunner>, Arc<RecordingNotifier>) {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let env: EnvironmentVariables = EnvironmentVariables::from_vars(&vars)
        .expect("Invalid test configuration");

    let runner: Arc<RecordingRunner> = Arc::new(runner);
    let notifier: Arc<RecordingNotifier> = Arc::new(RecordingNotifier::default());
    let state: AppState = AppState::new(env, runner.clone(), notifier.clone())
        .expect("Failed to build state");

    (state, runner, notifier)
}

/// Spawns the gateway with the given extra variables on a random unused port.
pub fn spawn_app_with(vars: &[(&str, &str)], runner: RecordingRunner) -> TestApp {
    let (state, runner, notifier) = build_state(vars, runner);

    // * Build the application using the same layers as main().
    let app: Router = create_app(state.clone());

    let tokio_listener: TokioTcpListener = bind_ephemeral();
    let addr: std::net::SocketAddr = tokio_listener.local_addr().unwrap();

    // * Spawn the server in a background task.
    tokio::spawn(async move {
        axum::serve(tokio_listener, app)
            .await
            .expect("Server failed");
    });

    TestApp {
        // * The base URL, e.g. "http://127.0.0.1:12345".
        base_url: format!("http://{}", addr),
        state,
        runner,
        notifier,
    }
}

/// Gateway in front of a live `main`, a live `alpha`, and a `ghost` nobody serves
pub fn spawn_app() -> TestApp {
    let main_port: String = spawn_upstream("main").to_string();
    let subapps: String = format!(
        "alpha:{}:/health,ghost:{}:/health",
        spawn_upstream("alpha"),
        dead_port()
    );

    spawn_app_with(
        &[
            ("MAIN_APP_PORT", main_port.as_str()),
            ("SUBAPPS", subapps.as_str()),
            ("UPSTREAM_HOST", "127.0.0.1"),
        ],
        RecordingRunner::default(),
    )
}

/// Parses a JSON response body
pub async fn json_body(resp: reqwest::Response) -> Value {
    let body: String = resp.text().await.unwrap();
    serde_json::from_str(&body).unwrap()
}
