//! simflow operator - Simulation reconciliation daemon
//!
//! The operator provides:
//! - A watch-driven reconciliation loop for Simulation resources
//! - Building block (Pod) creation and readiness tracking
//! - Health and status endpoints for probes

use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use simflow_operator::config::{ExecutionMode, OperatorConfig};
use simflow_operator::error::{OperatorError, OperatorResult};
use simflow_operator::server::Server;
use simflow_types::Simulation;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// simflow operator CLI
#[derive(Parser)]
#[command(name = "simflowd")]
#[command(about = "simflow operator - Simulation reconciliation daemon", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, env = "SIMFLOW_CONFIG")]
    config: Option<String>,

    /// How to reach the cluster: Local (kubeconfig) or InCluster
    #[arg(long, env = "EXECUTION_MODE")]
    execution_mode: Option<ExecutionMode>,

    /// Only watch Simulations in this namespace
    #[arg(short, long)]
    namespace: Option<String>,

    /// Log level
    #[arg(long, env = "SIMFLOW_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "SIMFLOW_LOG_JSON")]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the operator (default)
    Run,

    /// Print the Simulation CustomResourceDefinition as YAML
    Crd,
}

#[tokio::main]
async fn main() -> OperatorResult<()> {
    let cli = Cli::parse();

    if let Some(Command::Crd) = cli.command {
        let manifest = serde_yaml::to_string(&Simulation::crd())
            .map_err(|e| OperatorError::Serialization(e.to_string()))?;
        print!("{}", manifest);
        return Ok(());
    }

    // Load configuration
    let mut config = OperatorConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(namespace) = cli.namespace {
        config.watch_namespace = Some(namespace);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    config.validate()?;

    let mode = match config.resolve_execution_mode(cli.execution_mode) {
        Ok(mode) => mode,
        Err(e) => {
            tracing::error!(error = %e, "Unable to determine execution mode");
            return Err(e);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        execution_mode = %mode,
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        "Starting simflow operator"
    );

    let server = Server::new(config, mode).await?;
    server.run().await
}
