// Execution of compose CLI commands

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::error::DeployError;

/// Captured output of a finished compose command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs compose subcommands. `args` excludes the compose program itself.
#[async_trait]
pub trait ComposeRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, DeployError>;
}

/// Shells out to `docker compose` (or any configured equivalent)
#[derive(Debug, Clone)]
pub struct ComposeCli {
    program: String,
    base_args: Vec<String>,
    working_dir: PathBuf,
}

impl ComposeCli {
    /// `command` is split on whitespace, e.g. "docker compose" or "docker-compose"
    pub fn new(command: &str, working_dir: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let mut words = command.split_whitespace().map(str::to_owned);
        let program: String = words.next().ok_or(DeployError::EmptyCommand)?;

        Ok(Self {
            program,
            base_args: words.collect(),
            working_dir: working_dir.into(),
        })
    }

    fn describe(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.base_args.iter().map(String::as_str))
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

#[async_trait]
impl ComposeRunner for ComposeCli {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn run(&self, args: &[String]) -> Result<CommandOutput, DeployError> {
        let command: String = self.describe(args);
        debug!("Running {}", command);

        let output: std::process::Output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source: std::io::Error| DeployError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout: String = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr: String = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            return Err(DeployError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
