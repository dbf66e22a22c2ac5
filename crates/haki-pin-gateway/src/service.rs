//! Pin gateway service: owns the HTTP server task and its shutdown signal.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::PinataClient;
use crate::domain::{GatewayConfig, ServiceError};
use crate::ports::PinningService;
use crate::router::{build_router, AppState};

pub struct PinGatewayService {
    config: GatewayConfig,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl PinGatewayService {
    /// Create a service that pins through `pinner`.
    pub fn new(config: GatewayConfig, pinner: Arc<dyn PinningService>) -> Result<Self, ServiceError> {
        config.validate()?;
        if config.pinata.credentials.is_none() {
            warn!("Pinata credentials not configured; every pin request will fail");
        }
        let state = AppState {
            pinner,
            credentials: config.pinata.credentials.clone(),
        };
        Ok(Self {
            config,
            state,
            shutdown_tx: None,
            server: None,
        })
    }

    /// Create a service backed by the Pinata HTTP client.
    pub fn with_pinata(config: GatewayConfig) -> Result<Self, ServiceError> {
        let client =
            PinataClient::new(&config.pinata).map_err(|e| ServiceError::Client(e.to_string()))?;
        Self::new(config, Arc::new(client))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(&self.config, self.state.clone())
    }

    /// Bind and serve in the background; returns the bound address.
    pub async fn start(&mut self) -> Result<SocketAddr, ServiceError> {
        if self.server.is_some() {
            return Err(ServiceError::AlreadyStarted);
        }

        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::Bind { addr, source })?;
        let local = listener
            .local_addr()
            .map_err(|source| ServiceError::Bind { addr, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = self.router();
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
                info!("Received shutdown signal");
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "HTTP server error");
            }
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.server = Some(server);
        info!(addr = %local, "Pin gateway started");
        Ok(local)
    }

    /// Trigger graceful shutdown and wait for in-flight requests.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            if let Err(e) = server.await {
                error!(error = %e, "HTTP server task failed");
            }
        }
        info!("Pin gateway stopped");
    }
}
