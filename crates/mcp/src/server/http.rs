//! HTTP host for the MCP endpoint and health probes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::Router;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gateway::MeshGateway;
use crate::server::core::MeshMcpCore;
use crate::server::health;

/// Host configuration for the gateway's HTTP listener.
#[derive(Debug, Clone)]
pub struct MeshHttpServer {
    bind_address: SocketAddr,
    gateway: Arc<MeshGateway>,
}

impl MeshHttpServer {
    pub fn new(bind_address: SocketAddr, gateway: Arc<MeshGateway>) -> Self {
        Self { bind_address, gateway }
    }

    fn router(&self, cancellation_token: &CancellationToken) -> Router {
        let gateway = Arc::clone(&self.gateway);
        let service: StreamableHttpService<MeshMcpCore, LocalSessionManager> = StreamableHttpService::new(
            move || Ok(MeshMcpCore::new(Arc::clone(&gateway))),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                stateful_mode: false,
                sse_keep_alive: None,
                cancellation_token: cancellation_token.child_token(),
                ..Default::default()
            },
        );

        Router::new()
            .route_service("/{package_id}", service)
            .merge(health::routes(Arc::clone(self.gateway.registry())))
    }

    /// Bind the listener and serve until [`RunningMeshHttpServer::stop`] is called.
    pub async fn start(self) -> Result<RunningMeshHttpServer> {
        let cancellation_token = CancellationToken::new();
        let router = self.router(&cancellation_token);
        let listener = tokio::net::TcpListener::bind(self.bind_address).await?;
        let bound_address = listener.local_addr()?;
        info!(address = %bound_address, "MCP HTTP server listening");

        let server_handle = tokio::spawn({
            let shutdown = cancellation_token.child_token();
            async move {
                let _ = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        shutdown.cancelled().await;
                    })
                    .await;
            }
        });

        Ok(RunningMeshHttpServer {
            bind_address: bound_address,
            cancellation_token,
            server_handle,
        })
    }
}

/// Runtime handle for a running gateway HTTP server.
#[derive(Debug)]
pub struct RunningMeshHttpServer {
    bind_address: SocketAddr,
    cancellation_token: CancellationToken,
    server_handle: JoinHandle<()>,
}

impl RunningMeshHttpServer {
    /// Return the bound socket address for the running server.
    pub fn bound_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Stop the server and wait for the serve task to finish.
    pub async fn stop(self) -> Result<()> {
        self.cancellation_token.cancel();
        self.server_handle
            .await
            .map_err(|error| anyhow!("MCP HTTP server task failed: {error}"))?;
        info!("MCP HTTP server stopped");
        Ok(())
    }
}

/// Parse the configured bind address.
pub fn resolve_bind_address(bind_address: &str) -> Result<SocketAddr> {
    bind_address
        .trim()
        .parse()
        .map_err(|error| anyhow!("invalid HTTP bind address '{bind_address}': {error}"))
}
