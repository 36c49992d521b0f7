// Application state shared by the router, the proxy and background tasks

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::alerting::{self, AlertNotifier};
use crate::config::environment::EnvironmentVariables;
use crate::deploy::{ComposeCli, ComposeRunner, Orchestrator};
use crate::health::{HealthBoard, HealthMonitor};
use crate::registry::SubAppRegistry;
use crate::resilience::{BreakerSet, CircuitBreakerConfig};

#[derive(Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub registry: Arc<SubAppRegistry>,
    /// HTTP client used for proxying and health checks
    pub upstream: reqwest::Client,
    pub breakers: Arc<BreakerSet>,
    pub health: HealthBoard,
    pub orchestrator: Arc<Orchestrator>,
    pub notifier: Arc<dyn AlertNotifier>,
}

impl AppState {
    /// Builds the state from loaded configuration, driving the real compose CLI
    pub fn from_environment(environment: EnvironmentVariables) -> Result<Self> {
        let runner: ComposeCli =
            ComposeCli::new(&environment.compose_command, environment.project_dir.clone())
                .context("Invalid COMPOSE_COMMAND")?;
        let notifier: Arc<dyn AlertNotifier> =
            alerting::notifier_from_env(&environment).context("Failed to set up alerting")?;

        Self::new(environment, Arc::new(runner), notifier)
    }

    /// Builds the state with explicit compose runner and alert notifier
    pub fn new(
        environment: EnvironmentVariables,
        runner: Arc<dyn ComposeRunner>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Result<Self> {
        let registry: Arc<SubAppRegistry> = Arc::new(
            SubAppRegistry::from_environment(&environment).context("Invalid sub-app configuration")?,
        );

        let upstream: reqwest::Client = reqwest::Client::builder()
            .timeout(environment.upstream_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to build upstream HTTP client")?;

        let breakers: BreakerSet = BreakerSet::new(
            &registry,
            CircuitBreakerConfig {
                failure_threshold: environment.circuit_failure_threshold.max(1),
                success_threshold: 1,
                recovery_timeout: Duration::from_secs(environment.circuit_recovery_timeout_seconds),
            },
        );

        let orchestrator: Orchestrator = Orchestrator::new(
            registry.clone(),
            runner,
            environment.project_dir.clone(),
            environment.compose_file_path(),
            environment.scaling_factor,
        );

        Ok(Self {
            environment: Arc::new(environment),
            registry,
            upstream,
            breakers: Arc::new(breakers),
            health: HealthBoard::default(),
            orchestrator: Arc::new(orchestrator),
            notifier,
        })
    }

    /// Health monitor wired to this state's board and client
    pub fn health_monitor(&self, restart_unreachable: bool) -> HealthMonitor {
        HealthMonitor::new(
            self.registry.clone(),
            self.upstream.clone(),
            self.environment.upstream_host.to_string(),
            self.environment.health_check_interval(),
            self.health.clone(),
            restart_unreachable.then(|| self.orchestrator.clone()),
        )
    }
}
