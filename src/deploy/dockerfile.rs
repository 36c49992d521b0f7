// Multi-stage container build file for an ASGI application served by
// Gunicorn with Uvicorn workers

use std::fmt;

use crate::registry::SubApp;

const BASE_IMAGE: &str = "python:3.10-slim";
const REQUIREMENTS_FILE: &str = "requirements.txt";
const BUILDER_WORKDIR: &str = "/main";
const APP_WORKDIR: &str = "/app";
const WORKERS: u8 = 4;
const WORKER_CLASS: &str = "uvicorn.workers.UvicornWorker";
/// Port every application listens on inside its container
pub const CONTAINER_PORT: u16 = 8000;
/// Binary the compose healthcheck runs inside the container. The slim base
/// image does not ship it, so the final stage installs it.
pub const HEALTHCHECK_TOOL: &str = "curl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerfileSpec {
    pub base_image: String,
    pub requirements_file: String,
    pub builder_workdir: String,
    pub app_workdir: String,
    pub module_name: String,
    pub app_name: String,
    pub workers: u8,
    pub worker_class: String,
    pub port: u16,
    /// Debian packages installed in the final stage
    pub system_packages: Vec<String>,
}

impl DockerfileSpec {
    /// Build recipe for the root application (`main:app`)
    pub fn main() -> Self {
        Self {
            base_image: BASE_IMAGE.to_string(),
            requirements_file: REQUIREMENTS_FILE.to_string(),
            builder_workdir: BUILDER_WORKDIR.to_string(),
            app_workdir: APP_WORKDIR.to_string(),
            module_name: "main".to_string(),
            app_name: "app".to_string(),
            workers: WORKERS,
            worker_class: WORKER_CLASS.to_string(),
            port: CONTAINER_PORT,
            system_packages: vec![HEALTHCHECK_TOOL.to_string()],
        }
    }

    pub fn for_subapp(subapp: &SubApp) -> Self {
        Self {
            module_name: subapp.module_name.clone(),
            app_name: subapp.app_name.clone(),
            ..Self::main()
        }
    }

    pub fn installs(&self, package: &str) -> bool {
        self.system_packages.iter().any(|p: &String| p == package)
    }
}

/// Renders the Dockerfile text.
///
/// The startup command uses the shell form so `${MODULE_NAME}` and
/// `${APP_NAME}` are substituted from the image environment at run time.
impl fmt::Display for DockerfileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FROM {} AS builder", self.base_image)?;
        writeln!(f)?;
        writeln!(f, "WORKDIR {}", self.builder_workdir)?;
        writeln!(f)?;
        writeln!(f, "COPY {} .", self.requirements_file)?;
        writeln!(
            f,
            "RUN pip install --no-cache-dir --prefix=/install -r {}",
            self.requirements_file
        )?;
        writeln!(f)?;
        writeln!(f, "COPY . {}", self.builder_workdir)?;
        writeln!(f)?;

        writeln!(f, "FROM {}", self.base_image)?;
        writeln!(f)?;
        if !self.system_packages.is_empty() {
            writeln!(
                f,
                "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
                self.system_packages.join(" ")
            )?;
            writeln!(f)?;
        }
        writeln!(f, "COPY --from=builder /install /usr/local")?;
        writeln!(f, "COPY --from=builder {} {}", self.builder_workdir, self.app_workdir)?;
        writeln!(f, "WORKDIR {}", self.app_workdir)?;
        writeln!(f)?;
        writeln!(f, "RUN pip install --no-cache-dir gunicorn \"uvicorn[standard]\"")?;
        writeln!(f)?;
        writeln!(f, "ENV MODULE_NAME={}", self.module_name)?;
        writeln!(f, "ENV APP_NAME={}", self.app_name)?;
        writeln!(f)?;
        writeln!(f, "EXPOSE {}", self.port)?;
        writeln!(f)?;
        writeln!(
            f,
            "CMD gunicorn -w {} -k {} ${{MODULE_NAME}}:${{APP_NAME}} --bind 0.0.0.0:{}",
            self.workers, self.worker_class, self.port
        )
    }
}
