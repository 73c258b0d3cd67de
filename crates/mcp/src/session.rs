//! A connected backend together with its resolved capabilities.

use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::BackendClient;
use crate::config::{NamingPolicy, ServerConfig};
use crate::naming::NameResolver;
use crate::types::{BackendError, Capability};

/// Immutable view of one live backend connection.
///
/// A reconnect publishes a new session instead of mutating this one, so a
/// caller holding an `Arc<BackendSession>` keeps a stable connection for the
/// duration of its call.
pub struct BackendSession {
    server_id: String,
    client: Arc<dyn BackendClient>,
    capabilities: Arc<Vec<Capability>>,
    naming: NamingPolicy,
}

impl std::fmt::Debug for BackendSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSession")
            .field("server_id", &self.server_id)
            .field("capabilities", &self.capabilities.len())
            .finish_non_exhaustive()
    }
}

impl BackendSession {
    /// Fetch the native tool list from `client` and resolve public capabilities.
    pub async fn open(server: &ServerConfig, client: Arc<dyn BackendClient>) -> Result<Self, BackendError> {
        let tools = client.list_tools().await?;
        let instructions = client.instructions();
        let capabilities = NameResolver::resolve_all(&tools, server, instructions.as_deref());

        info!(server_id = %server.id, tool_count = tools.len(), "backend tools loaded");
        debug!(
            server_id = %server.id,
            "native tools: {}",
            tools.iter().map(|tool| tool.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self::new(server, client, capabilities))
    }

    pub fn new(server: &ServerConfig, client: Arc<dyn BackendClient>, capabilities: Vec<Capability>) -> Self {
        Self {
            server_id: server.id.clone(),
            client,
            capabilities: Arc::new(capabilities),
            naming: server.naming.clone(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn capabilities(&self) -> Arc<Vec<Capability>> {
        Arc::clone(&self.capabilities)
    }

    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }

    pub fn contains(&self, public_name: &str) -> bool {
        self.capabilities.iter().any(|capability| capability.public_name == public_name)
    }

    /// Native name for `public_name`: the stored mapping first, then the prefix heuristic.
    pub fn native_name_for(&self, public_name: &str) -> String {
        self.capabilities
            .iter()
            .find(|capability| capability.public_name == public_name)
            .map(|capability| capability.native_name.clone())
            .unwrap_or_else(|| NameResolver::native_name(&self.naming, public_name))
    }

    /// Forward a call addressed by public name to the backend.
    pub async fn call(&self, public_name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, BackendError> {
        let native_name = self.native_name_for(public_name);
        debug!(server_id = %self.server_id, public = %public_name, native = %native_name, "forwarding tool call");
        self.client.call_tool(&native_name, arguments).await
    }
}
