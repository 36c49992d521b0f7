// Errors raised while rendering artifacts or driving the compose CLI

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("compose command is empty")]
    EmptyCommand,

    #[error("unknown service '{0}'")]
    UnknownService(String),

    #[error("replica count must be at least 1, got {0}")]
    InvalidReplicas(u32),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render compose file: {0}")]
    Render(#[from] serde_yaml::Error),
}
