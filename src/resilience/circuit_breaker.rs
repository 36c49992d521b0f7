//! Per-upstream circuit breakers
//!
//! A breaker opens after a run of consecutive failures and rejects calls
//! until the recovery timeout has elapsed. It then half-opens and lets calls
//! through; enough successes close it again, any failure reopens it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::registry::SubAppRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 1,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

/// Circuit breaker statistics
#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub total_calls: u64,
    pub failed_calls: u64,
    pub rejected_calls: u64,
    #[serde(skip)]
    pub last_state_change: Instant,
}

impl CircuitBreakerStats {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            total_calls: 0,
            failed_calls: 0,
            rejected_calls: 0,
            last_state_change: Instant::now(),
        }
    }

    fn transition(&mut self, state: CircuitState) {
        self.state = state;
        self.last_state_change = Instant::now();
        self.consecutive_successes = 0;
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    stats: Arc<RwLock<CircuitBreakerStats>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            stats: Arc::new(RwLock::new(CircuitBreakerStats::new())),
        }
    }

    /// Whether a call may proceed. An open breaker whose recovery timeout
    /// has elapsed moves to half-open and admits the call.
    pub async fn allow(&self) -> bool {
        let mut stats = self.stats.write().await;

        match stats.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if stats.last_state_change.elapsed() >= self.config.recovery_timeout {
                    stats.transition(CircuitState::HalfOpen);
                    info!(breaker = %self.name, "Circuit breaker half-open, admitting a trial call");
                    true
                } else {
                    stats.rejected_calls += 1;
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut stats = self.stats.write().await;

        stats.total_calls += 1;
        stats.consecutive_failures = 0;
        stats.consecutive_successes += 1;

        if stats.state == CircuitState::HalfOpen
            && stats.consecutive_successes >= self.config.success_threshold
        {
            stats.transition(CircuitState::Closed);
            info!(breaker = %self.name, "Circuit breaker closed");
        }
    }

    /// Records a failed call. Returns `true` when this failure opened the breaker.
    pub async fn record_failure(&self) -> bool {
        let mut stats = self.stats.write().await;

        stats.total_calls += 1;
        stats.failed_calls += 1;
        stats.consecutive_failures += 1;
        stats.consecutive_successes = 0;

        let trips: bool = match stats.state {
            CircuitState::Closed => stats.consecutive_failures >= self.config.failure_threshold,
            CircuitState::HalfOpen => true,
            CircuitState::Open => false,
        };

        if trips {
            stats.transition(CircuitState::Open);
            warn!(breaker = %self.name, failures = stats.consecutive_failures, "Circuit breaker opened");
        }
        trips
    }

    pub async fn state(&self) -> CircuitState {
        self.stats.read().await.state
    }

    pub async fn stats(&self) -> CircuitBreakerStats {
        self.stats.read().await.clone()
    }

    pub async fn reset(&self) {
        *self.stats.write().await = CircuitBreakerStats::new();
    }
}

/// One breaker per registered application
#[derive(Debug, Clone, Default)]
pub struct BreakerSet {
    breakers: HashMap<String, CircuitBreaker>,
}

impl BreakerSet {
    pub fn new(registry: &SubAppRegistry, config: CircuitBreakerConfig) -> Self {
        let breakers: HashMap<String, CircuitBreaker> = registry
            .iter()
            .map(|app| (app.name.clone(), CircuitBreaker::new(app.name.clone(), config.clone())))
            .collect();

        Self { breakers }
    }

    pub fn get(&self, name: &str) -> Option<&CircuitBreaker> {
        self.breakers.get(name)
    }
}
