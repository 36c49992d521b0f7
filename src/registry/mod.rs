// Registry of the applications fronted by the gateway

use std::collections::HashSet;
use thiserror::Error;

use crate::config::environment::EnvironmentVariables;

/// Name of the root application, served at "/"
pub const MAIN_APP: &str = "main";

/// First path segments owned by the gateway itself
pub const RESERVED_SEGMENTS: [&str; 4] = ["health", "status", "metrics", "admin"];

const DEFAULT_HEALTH_PATH: &str = "/health";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid sub-app entry '{0}', expected name:port[:health_path]")]
    InvalidEntry(String),
    #[error("invalid sub-app name '{0}'")]
    InvalidName(String),
    #[error("sub-app name '{0}' collides with a gateway route")]
    ReservedName(String),
    #[error("sub-app '{0}' is declared more than once")]
    DuplicateName(String),
    #[error("port {port} is used by both '{first}' and '{second}'")]
    DuplicatePort { port: u16, first: String, second: String },
}

/// One application managed and routed by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubApp {
    pub name: String,
    /// Host port the application is published on
    pub port: u16,
    /// Compose build context, relative to the project directory
    pub build_context: String,
    /// Python module holding the ASGI object
    pub module_name: String,
    /// Attribute name of the ASGI object inside `module_name`
    pub app_name: String,
    pub health_path: String,
}

impl SubApp {
    pub fn main(port: u16) -> Self {
        Self {
            name: MAIN_APP.to_string(),
            port,
            build_context: ".".to_string(),
            module_name: "main".to_string(),
            app_name: "app".to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }

    pub fn new(name: impl Into<String>, port: u16, health_path: impl Into<String>) -> Self {
        let name: String = name.into();
        let mut health_path: String = health_path.into();
        if !health_path.starts_with('/') {
            health_path.insert(0, '/');
        }

        Self {
            build_context: format!("./subapps/{name}"),
            name,
            port,
            module_name: "app".to_string(),
            app_name: "app".to_string(),
            health_path,
        }
    }

    pub fn is_main(&self) -> bool {
        self.name == MAIN_APP
    }

    /// Where the generated Dockerfile lives, relative to the project directory
    pub fn dockerfile_path(&self) -> String {
        if self.is_main() {
            "Dockerfile".to_string()
        } else {
            format!("subapps/{}/Dockerfile", self.name)
        }
    }

    /// Mount source for live editing in the development compose file
    pub fn source_dir(&self) -> String {
        self.build_context.clone()
    }
}

/// A routing decision for an incoming path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<'a> {
    pub subapp: &'a SubApp,
    /// Path to request upstream, with the sub-app prefix removed
    pub forward_path: String,
    /// The stripped prefix, e.g. "/subapp1"; `None` for the bare root
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAppRegistry {
    apps: Vec<SubApp>,
}

impl SubAppRegistry {
    /// Validates and builds a registry. `main` is expected to be part of `apps`.
    pub fn new(apps: Vec<SubApp>) -> Result<Self, RegistryError> {
        let mut names: HashSet<&str> = HashSet::new();

        for (idx, app) in apps.iter().enumerate() {
            validate_name(&app.name)?;

            if !names.insert(app.name.as_str()) {
                return Err(RegistryError::DuplicateName(app.name.clone()));
            }

            if let Some(other) = apps[..idx].iter().find(|a: &&SubApp| a.port == app.port) {
                return Err(RegistryError::DuplicatePort {
                    port: app.port,
                    first: other.name.clone(),
                    second: app.name.clone(),
                });
            }
        }

        Ok(Self { apps })
    }

    /// Builds `main` plus either the SUBAPPS list or the two default sub-apps
    pub fn from_environment(env: &EnvironmentVariables) -> Result<Self, RegistryError> {
        let mut apps: Vec<SubApp> = vec![SubApp::main(env.main_app_port)];

        match env.subapps.as_deref() {
            Some(list) => apps.extend(parse_subapps(list)?),
            None => {
                apps.push(SubApp::new("subapp1", env.subapp1_port, "/health"));
                apps.push(SubApp::new("subapp2", env.subapp2_port, "/healthy"));
            }
        }

        Self::new(apps)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubApp> {
        self.apps.iter()
    }

    pub fn get(&self, name: &str) -> Option<&SubApp> {
        self.apps.iter().find(|app: &&SubApp| app.name == name)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Maps a request path to the sub-app that serves it.
    ///
    /// An empty path belongs to `main`; otherwise the first segment has to
    /// name a registered sub-app. The segment is stripped from the forwarded
    /// path.
    pub fn resolve(&self, path: &str) -> Option<Route<'_>> {
        let trimmed: &str = path.trim_matches('/');

        if trimmed.is_empty() {
            return self.get(MAIN_APP).map(|subapp: &SubApp| Route {
                subapp,
                forward_path: "/".to_string(),
                prefix: None,
            });
        }

        let (segment, rest) = match trimmed.split_once('/') {
            Some((segment, rest)) => (segment, rest),
            None => (trimmed, ""),
        };

        let subapp: &SubApp = self.get(segment)?;

        // Preserve a trailing slash the client sent
        let mut forward_path: String = format!("/{rest}");
        if !rest.is_empty() && path.ends_with('/') {
            forward_path.push('/');
        }

        Some(Route {
            subapp,
            forward_path,
            prefix: Some(format!("/{segment}")),
        })
    }
}

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.is_empty()
        || !name.chars().all(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(RegistryError::InvalidName(name.to_string()));
    }

    if RESERVED_SEGMENTS.contains(&name) {
        return Err(RegistryError::ReservedName(name.to_string()));
    }

    Ok(())
}

/// Parses "name:port[:health_path],..." into sub-app definitions
pub fn parse_subapps(list: &str) -> Result<Vec<SubApp>, RegistryError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry: &&str| !entry.is_empty())
        .map(|entry: &str| {
            let mut parts = entry.splitn(3, ':');
            let name: &str = parts.next().unwrap_or_default().trim();
            let port: u16 = parts
                .next()
                .and_then(|p: &str| p.trim().parse().ok())
                .ok_or_else(|| RegistryError::InvalidEntry(entry.to_string()))?;
            let health_path: &str = parts
                .next()
                .map(str::trim)
                .filter(|p: &&str| !p.is_empty())
                .unwrap_or(DEFAULT_HEALTH_PATH);

            if name == MAIN_APP {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }

            Ok(SubApp::new(name, port, health_path))
        })
        .collect()
}
