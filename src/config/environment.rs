// Start of file: /src/config/environment.rs

// * Environment configuration for the gateway, the managed sub-apps and
// * the compose tooling. Loaded once, with .env support outside production.

use std::{borrow::Cow, collections::HashMap, path::PathBuf, time::Duration};
// * anyhow for convenient error handling
use anyhow::{Context, Result};
use tracing::warn;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_BODY_SIZE: usize = 2_097_152; // 2MB
const DEFAULT_TIMEOUT: u64 = 30; // 30 seconds
const DEFAULT_UPSTREAM_HOST: &str = "localhost";
const DEFAULT_UPSTREAM_TIMEOUT: u64 = 10;
const DEFAULT_MAIN_APP_PORT: u16 = 8000;
const DEFAULT_SUBAPP1_PORT: u16 = 8001;
const DEFAULT_SUBAPP2_PORT: u16 = 8002;
const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
const DEFAULT_COMPOSE_COMMAND: &str = "docker compose";
const DEFAULT_PROJECT_DIR: &str = ".";
const DEFAULT_SCALING_FACTOR: u32 = 1;
const DEFAULT_HEALTH_CHECK_INTERVAL: u64 = 60; // seconds
const DEFAULT_METRICS_PORT: u16 = 9090;
const DEFAULT_ALERT_EMAIL: &str = "admin@example.com";
const DEFAULT_SMTP_SERVER: &str = "smtp.example.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_USERNAME: &str = "username";
const DEFAULT_SMTP_PASSWORD: &str = "password";
const DEFAULT_CIRCUIT_FAILURE_THRESHOLD: u32 = 3;
const DEFAULT_CIRCUIT_RECOVERY_TIMEOUT: u64 = 60; // seconds

/// Where circuit breaker alerts are delivered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertChannel {
    Email,
    Log,
}

/// Console output format of the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    // * Reads LOG_FORMAT from the raw variables so logging can start before the full load
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        match vars.get("LOG_FORMAT").map(|s: &String| s.trim()) {
            Some(s) if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

// * A struct containing all environment variables used by the app
#[derive(Clone, Debug)]
pub struct EnvironmentVariables {
    pub environment: Cow<'static, str>,
    pub host: Cow<'static, str>,
    pub port: u16,
    pub max_request_body_size: usize,
    pub default_timeout_seconds: u64,
    pub upstream_host: Cow<'static, str>,
    pub upstream_timeout_seconds: u64,
    pub main_app_port: u16,
    pub subapp1_port: u16,
    pub subapp2_port: u16,
    // ? Optional "name:port[:health_path],..." list replacing the default sub-apps
    pub subapps: Option<String>,
    pub docker_compose_file: PathBuf,
    pub compose_command: Cow<'static, str>,
    pub project_dir: PathBuf,
    pub scaling_factor: u32,
    pub health_check_interval_seconds: u64,
    pub metrics_port: u16,
    pub alert_channel: AlertChannel,
    pub alert_email: Cow<'static, str>,
    pub smtp_server: Cow<'static, str>,
    pub smtp_port: u16,
    pub smtp_username: Cow<'static, str>,
    pub smtp_password: Cow<'static, str>,
    pub circuit_failure_threshold: u32,
    pub circuit_recovery_timeout_seconds: u64,
    pub log_format: LogFormat,
}

impl EnvironmentVariables {
    // * Collects the process variables, merged with .env.
    // * Only reads .env if ENVIRONMENT != "production".
    pub fn load_vars() -> HashMap<String, String> {
        // ? In non-production environments, attempt to load .env
        if std::env::var("ENVIRONMENT").unwrap_or_default() != "production" {
            dotenv::dotenv().ok();
        }

        // * Collect all environment vars from the system and .env
        std::env::vars()
            .chain(dotenv::vars())
            .collect()
    }

    // * Builds the configuration from an explicit variable map, providing defaults if missing
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        // * A small helper closure to fetch a non-empty variable by key
        let get_var = |key: &str| {
            vars.get(key)
                .map(String::as_str)
                .filter(|s: &&str| !s.trim().is_empty())
        };

        let owned = |key: &str, default: &'static str| -> Cow<'static, str> {
            get_var(key)
                .map(|s| Cow::Owned(s.to_owned()))
                .unwrap_or(Cow::Borrowed(default))
        };

        let alert_channel: AlertChannel = match get_var("ALERT_CHANNEL") {
            None => AlertChannel::Log,
            Some(s) if s.eq_ignore_ascii_case("log") => AlertChannel::Log,
            Some(s) if s.eq_ignore_ascii_case("email") => AlertChannel::Email,
            Some(other) => anyhow::bail!("Invalid ALERT_CHANNEL '{other}', expected 'email' or 'log'"),
        };

        let log_format: LogFormat = LogFormat::from_vars(vars);

        let scaling_factor: u32 = get_var("SCALING_FACTOR")
            .map(|s| s.parse().context("Invalid SCALING_FACTOR"))
            .transpose()?
            .unwrap_or(DEFAULT_SCALING_FACTOR);
        if scaling_factor == 0 {
            anyhow::bail!("SCALING_FACTOR must be at least 1");
        }

        let health_check_interval_seconds: u64 = get_var("HEALTH_CHECK_INTERVAL")
            .map(|s| s.parse().context("Invalid HEALTH_CHECK_INTERVAL"))
            .transpose()?
            .unwrap_or(DEFAULT_HEALTH_CHECK_INTERVAL);
        if health_check_interval_seconds == 0 {
            anyhow::bail!("HEALTH_CHECK_INTERVAL must be at least 1 second");
        }

        // * Build our EnvironmentVariables, providing defaults if missing
        Ok(Self {
            environment: get_var("ENVIRONMENT")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    warn!("Missing ENVIRONMENT, defaulting to '{DEFAULT_ENVIRONMENT}'");
                    Cow::Borrowed(DEFAULT_ENVIRONMENT)
                }),

            host: owned("HOST", DEFAULT_HOST),

            port: get_var("PORT")
                .map(|s| s.parse().context("Invalid PORT value"))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),

            max_request_body_size: get_var("MAX_REQUEST_BODY_SIZE")
                .map(|s| s.parse().context("Invalid MAX_REQUEST_BODY_SIZE"))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_BODY_SIZE),

            default_timeout_seconds: get_var("DEFAULT_TIMEOUT_SECONDS")
                .map(|s| s.parse().context("Invalid DEFAULT_TIMEOUT_SECONDS"))
                .transpose()?
                .unwrap_or(DEFAULT_TIMEOUT),

            upstream_host: owned("UPSTREAM_HOST", DEFAULT_UPSTREAM_HOST),

            upstream_timeout_seconds: get_var("UPSTREAM_TIMEOUT_SECONDS")
                .map(|s| s.parse().context("Invalid UPSTREAM_TIMEOUT_SECONDS"))
                .transpose()?
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT),

            main_app_port: get_var("MAIN_APP_PORT")
                .map(|s| s.parse().context("Invalid MAIN_APP_PORT"))
                .transpose()?
                .unwrap_or(DEFAULT_MAIN_APP_PORT),

            subapp1_port: get_var("SUBAPP1_PORT")
                .map(|s| s.parse().context("Invalid SUBAPP1_PORT"))
                .transpose()?
                .unwrap_or(DEFAULT_SUBAPP1_PORT),

            subapp2_port: get_var("SUBAPP2_PORT")
                .map(|s| s.parse().context("Invalid SUBAPP2_PORT"))
                .transpose()?
                .unwrap_or(DEFAULT_SUBAPP2_PORT),

            subapps: get_var("SUBAPPS").map(str::to_owned),

            docker_compose_file: PathBuf::from(
                get_var("DOCKER_COMPOSE_FILE").unwrap_or(DEFAULT_COMPOSE_FILE),
            ),

            compose_command: owned("COMPOSE_COMMAND", DEFAULT_COMPOSE_COMMAND),

            project_dir: PathBuf::from(get_var("PROJECT_DIR").unwrap_or(DEFAULT_PROJECT_DIR)),

            scaling_factor,

            health_check_interval_seconds,

            metrics_port: get_var("METRICS_PORT")
                .map(|s| s.parse().context("Invalid METRICS_PORT"))
                .transpose()?
                .unwrap_or(DEFAULT_METRICS_PORT),

            alert_channel,

            alert_email: owned("ALERT_EMAIL", DEFAULT_ALERT_EMAIL),

            smtp_server: owned("SMTP_SERVER", DEFAULT_SMTP_SERVER),

            smtp_port: get_var("SMTP_PORT")
                .map(|s| s.parse().context("Invalid SMTP_PORT"))
                .transpose()?
                .unwrap_or(DEFAULT_SMTP_PORT),

            smtp_username: get_var("SMTP_USERNAME")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    if alert_channel == AlertChannel::Email {
                        warn!("Missing SMTP_USERNAME, defaulting to '{DEFAULT_SMTP_USERNAME}'");
                    }
                    Cow::Borrowed(DEFAULT_SMTP_USERNAME)
                }),

            smtp_password: get_var("SMTP_PASSWORD")
                .map(|s| Cow::Owned(s.into()))
                .unwrap_or_else(|| {
                    if alert_channel == AlertChannel::Email {
                        warn!("Missing SMTP_PASSWORD, using the built-in placeholder");
                    }
                    Cow::Borrowed(DEFAULT_SMTP_PASSWORD)
                }),

            circuit_failure_threshold: get_var("CIRCUIT_FAILURE_THRESHOLD")
                .map(|s| s.parse().context("Invalid CIRCUIT_FAILURE_THRESHOLD"))
                .transpose()?
                .unwrap_or(DEFAULT_CIRCUIT_FAILURE_THRESHOLD),

            circuit_recovery_timeout_seconds: get_var("CIRCUIT_RECOVERY_TIMEOUT")
                .map(|s| s.parse().context("Invalid CIRCUIT_RECOVERY_TIMEOUT"))
                .transpose()?
                .unwrap_or(DEFAULT_CIRCUIT_RECOVERY_TIMEOUT),

            log_format,
        })
    }

    /// Absolute-or-relative path of the compose file inside the project directory
    pub fn compose_file_path(&self) -> PathBuf {
        if self.docker_compose_file.is_absolute() {
            self.docker_compose_file.clone()
        } else {
            self.project_dir.join(&self.docker_compose_file)
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }
}

impl Default for EnvironmentVariables {
    fn default() -> Self {
        // ! The empty map only exercises defaults, which are all valid
        Self::from_vars(&HashMap::new()).expect("default configuration is valid")
    }
}


// End of file: /src/config/environment.rs
