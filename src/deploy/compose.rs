// Compose file model, rendered with serde_yaml

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dockerfile::{CONTAINER_PORT, HEALTHCHECK_TOOL};
use super::error::DeployError;
use crate::registry::{SubApp, SubAppRegistry};

const COMPOSE_VERSION: &str = "3.8";

/// Which flavour of compose file to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    /// Every application, built images, replicas, restart policy and healthchecks
    Production,
    /// Sub-apps only, dev server with auto-reload and bind-mounted sources
    Development,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    pub build: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub replicas: u32,
    pub restart_policy: RestartPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicy {
    pub condition: String,
    pub delay: String,
    pub max_attempts: u32,
    pub window: String,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            condition: "on-failure".to_string(),
            delay: "5s".to_string(),
            max_attempts: 3,
            window: "120s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthcheckConfig {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    pub start_period: String,
}

impl HealthcheckConfig {
    /// Probe run inside the container, hence the container port
    fn for_subapp(subapp: &SubApp) -> Self {
        Self {
            test: vec![
                "CMD-SHELL".to_string(),
                format!(
                    "{HEALTHCHECK_TOOL} --fail http://localhost:{CONTAINER_PORT}{} || exit 1",
                    subapp.health_path
                ),
            ],
            interval: "30s".to_string(),
            timeout: "10s".to_string(),
            retries: 3,
            start_period: "10s".to_string(),
        }
    }
}

fn port_mapping(subapp: &SubApp) -> String {
    format!("{}:{CONTAINER_PORT}", subapp.port)
}

impl ComposeFile {
    pub fn for_mode(mode: ComposeMode, registry: &SubAppRegistry, scaling_factor: u32) -> Self {
        match mode {
            ComposeMode::Production => Self::production(registry, scaling_factor),
            ComposeMode::Development => Self::development(registry),
        }
    }

    /// Stack with every application built from its Dockerfile
    pub fn production(registry: &SubAppRegistry, scaling_factor: u32) -> Self {
        let services: BTreeMap<String, ComposeService> = registry
            .iter()
            .map(|subapp: &SubApp| {
                let service: ComposeService = ComposeService {
                    build: subapp.build_context.clone(),
                    command: None,
                    ports: vec![port_mapping(subapp)],
                    volumes: Vec::new(),
                    deploy: Some(DeployConfig {
                        replicas: scaling_factor,
                        restart_policy: RestartPolicy::default(),
                    }),
                    healthcheck: Some(HealthcheckConfig::for_subapp(subapp)),
                };
                (subapp.name.clone(), service)
            })
            .collect();

        Self {
            version: Some(COMPOSE_VERSION.to_string()),
            services,
        }
    }

    /// Live-editing stack for the sub-apps, served by the dev server with reload
    pub fn development(registry: &SubAppRegistry) -> Self {
        let services: BTreeMap<String, ComposeService> = registry
            .iter()
            .filter(|subapp: &&SubApp| !subapp.is_main())
            .map(|subapp: &SubApp| {
                let service: ComposeService = ComposeService {
                    build: subapp.build_context.clone(),
                    command: Some(format!(
                        "uvicorn {}:{} --host 0.0.0.0 --port {CONTAINER_PORT} --reload",
                        subapp.module_name, subapp.app_name
                    )),
                    ports: vec![port_mapping(subapp)],
                    volumes: vec![format!("{}:/app", subapp.source_dir())],
                    deploy: None,
                    healthcheck: None,
                };
                (subapp.name.clone(), service)
            })
            .collect();

        Self { version: None, services }
    }

    pub fn to_yaml(&self) -> Result<String, DeployError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
