//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::{ExecutionMode, OperatorConfig};
use crate::error::{OperatorError, OperatorResult};
use crate::execution::IdleExecutionDriver;
use crate::scheduler::{controller, ControllerContext, Reconciler};
use crate::store::KubeSimulationStore;
use crate::workload::PodWorkloadClient;
use kube::config::KubeConfigOptions;
use kube::Client;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Build a Kubernetes client for the resolved execution mode
pub async fn connect(mode: ExecutionMode) -> OperatorResult<Client> {
    let config = match mode {
        ExecutionMode::InCluster => kube::Config::incluster().map_err(|e| {
            OperatorError::Config(format!("Cannot load in-cluster configuration: {}", e))
        })?,
        ExecutionMode::Local => kube::Config::from_kubeconfig(&KubeConfigOptions::default())
            .await
            .map_err(|e| OperatorError::Config(format!("Cannot load kubeconfig: {}", e)))?,
    };

    Ok(Client::try_from(config)?)
}

/// simflow operator server
pub struct Server {
    config: OperatorConfig,
    mode: ExecutionMode,
    client: Client,
    context: Arc<ControllerContext>,
    ready: Arc<AtomicBool>,
}

impl Server {
    /// Connect to the cluster and assemble the reconciler
    pub async fn new(config: OperatorConfig, mode: ExecutionMode) -> OperatorResult<Self> {
        let client = connect(mode).await?;
        Ok(Self::with_client(config, mode, client))
    }

    /// Assemble the reconciler on an existing client
    pub fn with_client(config: OperatorConfig, mode: ExecutionMode, client: Client) -> Self {
        let reconciler = Reconciler::new(
            Arc::new(KubeSimulationStore::new(client.clone())),
            Arc::new(PodWorkloadClient::new(client.clone())),
            Arc::new(IdleExecutionDriver),
            config.reconciler.clone(),
            config.blocks.clone(),
        );

        let ready = Arc::new(AtomicBool::new(false));
        let context = Arc::new(ControllerContext::new(reconciler, ready.clone()));

        Self {
            config,
            mode,
            client,
            context,
            ready,
        }
    }

    /// Run the controller and health server until a shutdown signal arrives
    pub async fn run(self) -> OperatorResult<()> {
        let (controller_tx, controller_rx) = oneshot::channel::<()>();
        let (health_tx, health_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = controller_tx.send(());
        });

        let health = if self.config.health.enabled {
            let addr = self.config.health.listen_addr;
            let listener = TcpListener::bind(addr).await?;
            let state = AppState::new(
                self.context.reconciler.stats(),
                self.ready.clone(),
                self.mode,
            );
            let app = create_router(state);

            tracing::info!("Health server listening on {}", addr);

            Some(tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = health_rx.await;
                    })
                    .await
            }))
        } else {
            None
        };

        tracing::info!(
            execution_mode = %self.mode,
            requeue_interval = ?self.config.reconciler.requeue_interval(),
            "simflow operator starting"
        );

        controller::run(
            self.client,
            self.config.watch_namespace.clone(),
            self.context.clone(),
            async move {
                let _ = controller_rx.await;
            },
        )
        .await;

        let _ = health_tx.send(());
        if let Some(handle) = health {
            handle
                .await
                .map_err(|e| OperatorError::Server(e.to_string()))?
                .map_err(|e| OperatorError::Server(e.to_string()))?;
        }

        tracing::info!("simflow operator shut down");
        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
