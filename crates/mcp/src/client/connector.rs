use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde_json::{Map, Value};

use crate::config::ServerConfig;
use crate::types::{BackendError, NativeTool};

/// Factory that turns a server configuration into a live backend connection.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Establish and initialize a connection. The launch details in `server`
    /// are opaque to callers.
    async fn connect(&self, server: &ServerConfig) -> Result<Arc<dyn BackendClient>, BackendError>;
}

/// A connected backend MCP server.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Native tools currently exposed by the backend. Doubles as the liveness probe.
    async fn list_tools(&self) -> Result<Vec<NativeTool>, BackendError>;

    /// Invoke a native tool; the result is returned as the backend produced it.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, BackendError>;

    /// Usage instructions from the initialize handshake.
    fn instructions(&self) -> Option<String>;

    /// Release the underlying transport. Safe to call more than once.
    async fn close(&self) -> Result<(), BackendError>;
}
