//! Server setup and lifecycle management

use crate::api::{create_router, AppState};
use crate::config::BrokerConfig;
use crate::controller::{Controller, NoopProvisioner, Provisioner};
use crate::error::{DaemonError, DaemonResult};
use crate::operations::BrokerOperations;
use osb_store::{broker_scheme, InMemoryInstanceStore, Informer, InstanceStore};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};

/// Broker daemon: HTTP API, informer and reconciliation controller sharing
/// one instance store
pub struct Server {
    config: BrokerConfig,
    store: Arc<dyn InstanceStore>,
    provisioner: Arc<dyn Provisioner>,
}

impl Server {
    /// Create a server backed by an in-memory store and the no-op provisioner
    pub fn new(config: BrokerConfig) -> DaemonResult<Self> {
        let store = Arc::new(InMemoryInstanceStore::new(Arc::new(broker_scheme())));
        Ok(Self::with_parts(config, store, Arc::new(NoopProvisioner)))
    }

    /// Create a server over a caller-supplied store and provisioner
    pub fn with_parts(
        config: BrokerConfig,
        store: Arc<dyn InstanceStore>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            config,
            store,
            provisioner,
        }
    }

    /// Bind the configured address and serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Broker listening on {}", addr);
        tracing::info!(
            prefix = %self.config.server.versioned_prefix(),
            namespace = %self.config.controller.namespace,
            "Broker routes mounted"
        );

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then stop the
    /// background tasks
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> DaemonResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let controller_config = &self.config.controller;
        let (stop_tx, stop_rx) = watch::channel(false);
        let (event_tx, event_rx) = mpsc::channel(controller_config.event_buffer.max(1));

        let informer = Informer::new(
            self.store.clone(),
            controller_config.namespace.clone(),
            controller_config.resync_interval(),
        );
        let informer_handle = tokio::spawn(informer.run(event_tx, stop_rx.clone()));

        let controller = Controller::new(self.store.clone(), self.provisioner.clone());
        let controller_handle = tokio::spawn(controller.run(event_rx, stop_rx));

        let broker = Arc::new(BrokerOperations::new(
            self.store.clone(),
            controller_config.namespace.clone(),
        ));
        let app = create_router(AppState::new(broker), &self.config.server);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| DaemonError::Server(e.to_string()));

        tracing::info!("Broker shutting down");

        // Stop background tasks
        let _ = stop_tx.send(true);
        let _ = informer_handle.await;
        let _ = controller_handle.await;

        served
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
