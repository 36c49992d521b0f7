// Periodic health checks of the managed applications

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::gauge;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::deploy::Orchestrator;
use crate::registry::{SubApp, SubAppRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy { status_code: u16 },
    Unreachable { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubAppHealth {
    #[serde(flatten)]
    pub status: HealthStatus,
    pub checked_at: String,
}

/// Last known health of every application, shared with the HTTP layer
#[derive(Debug, Clone, Default)]
pub struct HealthBoard {
    entries: Arc<RwLock<HashMap<String, SubAppHealth>>>,
}

impl HealthBoard {
    pub async fn record(&self, name: &str, status: HealthStatus) {
        let entry: SubAppHealth = SubAppHealth {
            status,
            checked_at: Utc::now().to_rfc3339(),
        };
        self.entries.write().await.insert(name.to_string(), entry);
    }

    /// Copy of every recorded result, taken under a single read lock
    pub async fn snapshot(&self) -> HashMap<String, SubAppHealth> {
        self.entries.read().await.clone()
    }
}

pub struct HealthMonitor {
    registry: Arc<SubAppRegistry>,
    client: reqwest::Client,
    upstream_host: String,
    interval: Duration,
    board: HealthBoard,
    // ? Restarts are only issued when the gateway manages the compose stack
    orchestrator: Option<Arc<Orchestrator>>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<SubAppRegistry>,
        client: reqwest::Client,
        upstream_host: impl Into<String>,
        interval: Duration,
        board: HealthBoard,
        orchestrator: Option<Arc<Orchestrator>>,
    ) -> Self {
        Self {
            registry,
            client,
            upstream_host: upstream_host.into(),
            interval,
            board,
            orchestrator,
        }
    }

    /// Checks every application once and records the results
    pub async fn check_all(&self) {
        for subapp in self.registry.iter() {
            let status: HealthStatus = self.probe(subapp).await;

            gauge!("subapp_up", "subapp" => subapp.name.clone())
                .set(if status == HealthStatus::Healthy { 1.0 } else { 0.0 });

            match &status {
                HealthStatus::Healthy => debug!(subapp = %subapp.name, "Health check passed"),
                HealthStatus::Unhealthy { status_code } => {
                    error!(subapp = %subapp.name, status_code, "Health check failed");
                }
                HealthStatus::Unreachable { error } => {
                    error!(subapp = %subapp.name, "Error during health check: {}", error);
                    self.restart(subapp).await;
                }
            }

            self.board.record(&subapp.name, status).await;
        }
    }

    /// Runs `check_all` every interval until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Health monitor started");
        let mut ticker: tokio::time::Interval = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.check_all().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Health monitor stopped");
    }

    async fn probe(&self, subapp: &SubApp) -> HealthStatus {
        let url: String = format!(
            "http://{}:{}{}",
            self.upstream_host, subapp.port, subapp.health_path
        );

        match self.client.get(&url).send().await {
            Ok(response) if response.status() == StatusCode::OK => HealthStatus::Healthy,
            Ok(response) => HealthStatus::Unhealthy {
                status_code: response.status().as_u16(),
            },
            Err(e) => HealthStatus::Unreachable { error: e.to_string() },
        }
    }

    async fn restart(&self, subapp: &SubApp) {
        let Some(orchestrator) = &self.orchestrator else {
            return;
        };

        if let Err(e) = orchestrator.restart_service(&subapp.name).await {
            warn!(subapp = %subapp.name, "Restart after failed health check did not succeed: {}", e);
        }
    }
}
