// Start of file: src/main.rs

use std::collections::HashMap;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use subapp_gateway::config::environment::{EnvironmentVariables, LogFormat};
use subapp_gateway::config::state::AppState;
use subapp_gateway::core::{exporter, logging, server};
use subapp_gateway::deploy::ComposeMode;

#[derive(Debug, Parser)]
#[command(name = "subapp-gateway", version, about = "Gateway and compose orchestrator for a main app and its sub-apps")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Provision the compose stack, then serve the gateway until SIGINT/SIGTERM
    Serve {
        /// Route to an already running stack instead of building and starting it
        #[arg(long)]
        no_provision: bool,
    },
    /// Write the compose file and Dockerfiles without running anything
    Generate {
        /// Emit the live-reload development compose file for the sub-apps
        #[arg(long)]
        dev: bool,
    },
    /// Build the images and start the stack in the background
    Up,
    /// Stop and remove the stack
    Down,
    /// Restart one service
    Restart { name: String },
    /// Scale one service to the given number of replicas
    Scale { name: String, replicas: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = Cli::parse();

    // Logging starts before the full load so configuration warnings are kept
    let vars: HashMap<String, String> = EnvironmentVariables::load_vars();
    logging::init_tracing(LogFormat::from_vars(&vars));
    let env: EnvironmentVariables = EnvironmentVariables::from_vars(&vars)?;

    let state: AppState = AppState::from_environment(env)?;

    match cli.command.unwrap_or(Command::Serve { no_provision: false }) {
        Command::Serve { no_provision } => run_gateway(state, !no_provision).await,
        Command::Generate { dev } => {
            let mode: ComposeMode = if dev { ComposeMode::Development } else { ComposeMode::Production };
            let path = state.orchestrator.generate_compose(mode).await?;
            let dockerfiles = state.orchestrator.write_dockerfiles().await?;
            println!("Wrote {}", path.display());
            for dockerfile in dockerfiles {
                println!("Wrote {}", dockerfile.display());
            }
            Ok(())
        }
        Command::Up => Ok(state.orchestrator.provision().await?),
        Command::Down => Ok(state.orchestrator.stop_services().await?),
        Command::Restart { name } => Ok(state.orchestrator.restart_service(&name).await?),
        Command::Scale { name, replicas } => {
            Ok(state.orchestrator.scale_service(&name, replicas).await?)
        }
    }
}

async fn run_gateway(state: AppState, manage_stack: bool) -> Result<()> {
    // Claim both ports before any container is started
    exporter::init_metrics(state.environment.metrics_port)?;
    let listener: TcpListener = server::setup_listener(&state.environment).await?;
    tracing::info!("Gateway listening on: {}", listener.local_addr()?);

    server::run_gateway(state, listener, manage_stack, server::shutdown_signal()).await?;
    tracing::info!("Exiting...");
    Ok(())
}

// End of file: src/main.rs
