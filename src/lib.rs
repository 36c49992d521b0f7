// Library root for the sub-app gateway: deployment artifacts, compose
// orchestration, reverse proxy, health monitoring and circuit breaking

pub mod alerting;
pub mod api;
pub mod config;
pub mod core;
pub mod deploy;
pub mod health;
pub mod middlewares;
pub mod proxy;
pub mod registry;
pub mod resilience;
pub mod utils;

pub use crate::config::environment::EnvironmentVariables;
pub use crate::config::state::AppState;
pub use crate::core::server::create_app;
pub use crate::registry::{SubApp, SubAppRegistry};
