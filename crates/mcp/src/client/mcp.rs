use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult};
use rmcp::service::{Peer, RunningService, ServiceExt as _};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::RoleClient;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use super::connector::{BackendClient, BackendConnector};
use super::http::{build_http_client, resolve_endpoint};
use super::stdio::{build_stdio_command, spawn_stderr_logger};
use crate::config::{ServerConfig, TransportType};
use crate::types::{BackendError, NativeTool};

/// Connects to backends with rmcp over stdio or streamable HTTP.
#[derive(Debug, Default, Clone, Copy)]
pub struct RmcpConnector;

impl RmcpConnector {
    pub fn new() -> Self {
        Self
    }

    async fn connect_stdio(server: &ServerConfig) -> Result<RunningService<RoleClient, ()>, BackendError> {
        let command = build_stdio_command(server)?;
        let (transport, stderr) = TokioChildProcess::builder(command)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| BackendError::connect(&server.id, format!("failed to spawn process: {error}")))?;

        if let Some(stderr) = stderr {
            spawn_stderr_logger(server.id.clone(), stderr);
        }

        ().serve(transport)
            .await
            .map_err(|error| BackendError::connect(&server.id, error.to_string()))
    }

    async fn connect_http(server: &ServerConfig) -> Result<RunningService<RoleClient, ()>, BackendError> {
        let endpoint = resolve_endpoint(server)?;
        let client = build_http_client(server)?;
        let config = StreamableHttpClientTransportConfig::with_uri(endpoint);
        let transport = StreamableHttpClientTransport::with_client(client, config);
        ().serve(transport)
            .await
            .map_err(|error| BackendError::connect(&server.id, error.to_string()))
    }
}

#[async_trait]
impl BackendConnector for RmcpConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Arc<dyn BackendClient>, BackendError> {
        let start_time = Instant::now();
        let handshake = async {
            match server.transport_type() {
                TransportType::Stdio => Self::connect_stdio(server).await,
                TransportType::Http => Self::connect_http(server).await,
                TransportType::Unknown => Err(BackendError::connect(
                    &server.id,
                    "unsupported transport: must be stdio or http",
                )),
            }
        };

        let running = timeout(server.timeout(), handshake)
            .await
            .map_err(|_| BackendError::timeout(format!("connect {}", server.id), server.timeout_ms))??;

        info!(
            server_id = %server.id,
            name = %server.display_name(),
            transport = %server.transport_type(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "backend connected"
        );
        Ok(Arc::new(RmcpBackendClient::new(server, running)))
    }
}

/// Live rmcp client session for one backend.
pub struct RmcpBackendClient {
    server_id: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    closed: AtomicBool,
    timeout: Duration,
    instructions: Option<String>,
}

impl std::fmt::Debug for RmcpBackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RmcpBackendClient")
            .field("server_id", &self.server_id)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RmcpBackendClient {
    fn new(server: &ServerConfig, running: RunningService<RoleClient, ()>) -> Self {
        let instructions = running
            .peer_info()
            .and_then(|info| info.instructions.clone())
            .filter(|text| !text.trim().is_empty());
        Self {
            server_id: server.id.clone(),
            peer: running.peer().clone(),
            service: Mutex::new(Some(running)),
            closed: AtomicBool::new(false),
            timeout: server.timeout(),
            instructions,
        }
    }

    fn ensure_open(&self) -> Result<(), BackendError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BackendError::NotConnected {
                server_id: self.server_id.clone(),
            });
        }
        Ok(())
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

#[async_trait]
impl BackendClient for RmcpBackendClient {
    async fn list_tools(&self) -> Result<Vec<NativeTool>, BackendError> {
        self.ensure_open()?;
        let tools = timeout(self.timeout, self.peer.list_all_tools())
            .await
            .map_err(|_| BackendError::timeout(format!("list_tools {}", self.server_id), self.timeout_ms()))?
            .map_err(|error| BackendError::list_tools(&self.server_id, error.to_string()))?;
        Ok(tools.into_iter().map(NativeTool::from).collect())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, BackendError> {
        self.ensure_open()?;
        let call = self.peer.call_tool(CallToolRequestParams {
            name: name.to_string().into(),
            arguments: Some(arguments),
            task: None,
            meta: None,
        });

        match timeout(self.timeout, call).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(error)) => Err(BackendError::call(name, error.to_string())),
            Err(_) => Err(BackendError::timeout(format!("call_tool {name}"), self.timeout_ms())),
        }
    }

    fn instructions(&self) -> Option<String> {
        self.instructions.clone()
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.closed.store(true, Ordering::Release);
        let Some(running) = self.service.lock().await.take() else {
            return Ok(());
        };
        running
            .cancel()
            .await
            .map(|reason| debug!(server_id = %self.server_id, ?reason, "backend closed"))
            .map_err(|error| BackendError::close(&self.server_id, error.to_string()))
    }
}
