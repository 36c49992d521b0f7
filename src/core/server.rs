// Gateway server configuration and setup

use std::future::Future;
use std::time::Duration;
use axum::{
    serve,
    Router,
    middleware::from_fn,
    extract::DefaultBodyLimit,
    error_handling::HandleErrorLayer,
};
use tower::{ServiceBuilder, timeout::TimeoutLayer};
use tokio::{signal, net::TcpListener, sync::watch};
use listenfd::ListenFd;
use anyhow::{Context, Result};

use crate::api::{admin::admin_routes, gateway::gateway_routes};
use crate::config::{environment::EnvironmentVariables, state::AppState};
use crate::middlewares::request_metrics::request_metrics_middleware;
use crate::proxy::proxy_fallback;
use crate::utils::{
    error_handler::handle_global_error,
    response_handler::response_wrapper
};

/// Creates and configures the gateway router with all middleware layers
pub fn create_app(state: AppState) -> Router {
    let env: &EnvironmentVariables = &state.environment;
    let timeout: Duration = Duration::from_secs(env.default_timeout_seconds);
    let body_limit: usize = env.max_request_body_size;

    Router::new()
        .merge(gateway_routes())
        .merge(admin_routes())
        // Anything not owned by the gateway goes to the sub-apps
        .fallback(proxy_fallback)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_metrics_middleware))
                .layer(from_fn(response_wrapper))
                .layer(HandleErrorLayer::new(handle_global_error))
                .layer(TimeoutLayer::new(timeout))
                .layer(DefaultBodyLimit::max(body_limit))
        )
        .with_state(state)
}

/// Runs the gateway on an already bound listener until `shutdown` resolves.
///
/// With `manage_stack` the compose stack is provisioned first and torn down
/// afterwards, also when provisioning or serving fails.
pub async fn run_gateway<F>(
    state: AppState,
    listener: TcpListener,
    manage_stack: bool,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if manage_stack {
        if let Err(e) = state.orchestrator.provision().await {
            // Images or containers may already exist from the steps that succeeded
            let _ = stop_stack(&state).await;
            return Err(anyhow::Error::from(e).context("Failed to provision the compose stack"));
        }
    }

    let served: Result<()> = serve_until(&state, listener, manage_stack, shutdown).await;

    if !manage_stack {
        return served;
    }
    tracing::info!("Stopping services...");
    let stopped: Result<()> = stop_stack(&state).await;
    served.and(stopped)
}

async fn serve_until<F>(
    state: &AppState,
    listener: TcpListener,
    restart_unreachable: bool,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = tokio::spawn(state.health_monitor(restart_unreachable).run(shutdown_rx));

    let app: Router = create_app(state.clone());
    let served = serve(listener, app).with_graceful_shutdown(shutdown).await;

    // Stop health checks before the stack goes away
    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor.await {
        tracing::warn!("Health monitor task ended abnormally: {}", e);
    }

    served.context("Gateway server failed")
}

async fn stop_stack(state: &AppState) -> Result<()> {
    state
        .orchestrator
        .stop_services()
        .await
        .context("Failed to stop the compose stack")?;
    tracing::info!("Services stopped");
    Ok(())
}

/// Sets up the TCP listener from environment or binds to new address
pub async fn setup_listener(env: &EnvironmentVariables) -> Result<TcpListener> {
    let mut listenfd: ListenFd = ListenFd::from_env();

    let listener: TcpListener = match listenfd.take_tcp_listener(0)? {
        Some(std_listener) => {
            std_listener.set_nonblocking(true)?;
            TcpListener::from_std(std_listener)?
        }
        None => {
            let addr: String = format!("{}:{}", env.host, env.port);
            TcpListener::bind(&addr).await?
        }
    };

    Ok(listener)
}

/// Handles graceful shutdown signals (Ctrl+C and TERM)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install TERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Shutting down via Ctrl+C"),
        _ = terminate => tracing::info!("Shutting down via TERM signal"),
    }
}
