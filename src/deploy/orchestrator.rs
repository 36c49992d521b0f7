// Writes deployment artifacts and drives the compose stack

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument};

use super::compose::{ComposeFile, ComposeMode};
use super::dockerfile::DockerfileSpec;
use super::error::DeployError;
use super::runner::{CommandOutput, ComposeRunner};
use crate::registry::{SubApp, SubAppRegistry};

pub struct Orchestrator {
    registry: Arc<SubAppRegistry>,
    runner: Arc<dyn ComposeRunner>,
    project_dir: PathBuf,
    compose_file: PathBuf,
    scaling_factor: u32,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SubAppRegistry>,
        runner: Arc<dyn ComposeRunner>,
        project_dir: impl Into<PathBuf>,
        compose_file: impl Into<PathBuf>,
        scaling_factor: u32,
    ) -> Self {
        Self {
            registry,
            runner,
            project_dir: project_dir.into(),
            compose_file: compose_file.into(),
            scaling_factor,
        }
    }

    /// Renders the compose file for `mode` and writes it to disk
    #[instrument(skip(self))]
    pub async fn generate_compose(&self, mode: ComposeMode) -> Result<PathBuf, DeployError> {
        let compose: ComposeFile = ComposeFile::for_mode(mode, &self.registry, self.scaling_factor);
        let yaml: String = compose.to_yaml()?;

        write_file(&self.compose_file, &yaml).await?;
        info!(path = %self.compose_file.display(), "Generated compose file successfully");

        Ok(self.compose_file.clone())
    }

    /// Writes one Dockerfile per application: `./Dockerfile` for main,
    /// `./subapps/<name>/Dockerfile` for the others
    #[instrument(skip(self))]
    pub async fn write_dockerfiles(&self) -> Result<Vec<PathBuf>, DeployError> {
        let mut written: Vec<PathBuf> = Vec::with_capacity(self.registry.len());

        for subapp in self.registry.iter() {
            let spec: DockerfileSpec = if subapp.is_main() {
                DockerfileSpec::main()
            } else {
                DockerfileSpec::for_subapp(subapp)
            };

            let path: PathBuf = self.project_dir.join(subapp.dockerfile_path());
            write_file(&path, &spec.to_string()).await?;
            written.push(path);
        }

        info!(count = written.len(), "Wrote Dockerfiles");
        Ok(written)
    }

    /// Builds every image in registry order, stopping at the first failure
    #[instrument(skip(self))]
    pub async fn build_images(&self) -> Result<(), DeployError> {
        for subapp in self.registry.iter() {
            self.compose(&["build", &subapp.name])
                .await
                .inspect_err(|e: &DeployError| error!(subapp = %subapp.name, "Failed to build Docker image: {}", e))?;
            info!(subapp = %subapp.name, "Built Docker image successfully");
        }
        Ok(())
    }

    pub async fn start_services(&self) -> Result<(), DeployError> {
        self.compose(&["up", "-d"])
            .await
            .inspect_err(|e: &DeployError| error!("Failed to start compose services: {}", e))?;
        info!("Compose services started successfully");
        Ok(())
    }

    pub async fn stop_services(&self) -> Result<(), DeployError> {
        self.compose(&["down"])
            .await
            .inspect_err(|e: &DeployError| error!("Failed to stop compose services: {}", e))?;
        info!("Compose services stopped successfully");
        Ok(())
    }

    pub async fn restart_service(&self, name: &str) -> Result<(), DeployError> {
        let subapp: &SubApp = self.lookup(name)?;

        self.compose(&["restart", &subapp.name])
            .await
            .inspect_err(|e: &DeployError| error!(subapp = %name, "Failed to restart service: {}", e))?;
        info!(subapp = %name, "Restarted service");
        Ok(())
    }

    pub async fn scale_service(&self, name: &str, replicas: u32) -> Result<(), DeployError> {
        if replicas == 0 {
            return Err(DeployError::InvalidReplicas(replicas));
        }
        let subapp: &SubApp = self.lookup(name)?;
        let scale: String = format!("{}={}", subapp.name, replicas);

        self.compose(&["up", "-d", "--scale", &scale])
            .await
            .inspect_err(|e: &DeployError| error!(subapp = %name, "Failed to scale service: {}", e))?;
        info!(subapp = %name, replicas, "Scaled service");
        Ok(())
    }

    /// Generates artifacts, builds the images and starts the stack
    pub async fn provision(&self) -> Result<(), DeployError> {
        self.generate_compose(ComposeMode::Production).await?;
        self.write_dockerfiles().await?;
        self.build_images().await?;
        self.start_services().await
    }

    fn lookup(&self, name: &str) -> Result<&SubApp, DeployError> {
        self.registry
            .get(name)
            .ok_or_else(|| DeployError::UnknownService(name.to_string()))
    }

    async fn compose(&self, args: &[&str]) -> Result<CommandOutput, DeployError> {
        // The runner executes inside the project directory
        let file: &Path = self
            .compose_file
            .strip_prefix(&self.project_dir)
            .unwrap_or(&self.compose_file);
        let mut full: Vec<String> = vec!["-f".to_string(), file.display().to_string()];
        full.extend(args.iter().map(|arg: &&str| arg.to_string()));
        self.runner.run(&full).await
    }
}

async fn write_file(path: &Path, contents: &str) -> Result<(), DeployError> {
    let to_err = |source: std::io::Error| DeployError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p: &&Path| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(to_err)?;
    }
    tokio::fs::write(path, contents).await.map_err(to_err)
}
