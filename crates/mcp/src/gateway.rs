//! The two inbound operations served to callers.

use std::sync::Arc;

use mesh_util::preview_json;
use rmcp::model::CallToolResult;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::auth::AuthGateway;
use crate::registry::SessionRegistry;
use crate::router::Router;
use crate::types::{Capability, GatewayError};

/// Authentication, listing and dispatch behind one facade.
#[derive(Debug, Clone)]
pub struct MeshGateway {
    auth: AuthGateway,
    registry: Arc<SessionRegistry>,
    router: Router,
}

impl MeshGateway {
    pub fn new(auth: AuthGateway, registry: Arc<SessionRegistry>) -> Self {
        let router = Router::new(Arc::clone(&registry));
        Self { auth, registry, router }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Capabilities visible in a package. Unknown packages list nothing.
    pub async fn list_capabilities(&self, package_id: &str, token: Option<&str>) -> Result<Vec<Capability>, GatewayError> {
        self.auth.authenticate(token).await?;

        info!(package_id = %package_id, "list tools");
        let capabilities = self.registry.list_capabilities(package_id).await;
        info!(package_id = %package_id, tool_count = capabilities.len(), "list tools completed");
        debug!(
            "tools: {}",
            capabilities
                .iter()
                .map(|capability| capability.public_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(capabilities)
    }

    /// Invoke a capability by public name.
    pub async fn call_capability(
        &self,
        package_id: &str,
        name: &str,
        arguments: Option<Map<String, Value>>,
        token: Option<&str>,
    ) -> Result<CallToolResult, GatewayError> {
        self.auth.authenticate(token).await?;

        if name.trim().is_empty() {
            return Err(GatewayError::not_found("Tool name is required."));
        }

        let arguments = arguments.unwrap_or_default();
        info!(package_id = %package_id, tool = %name, "call tool");
        let payload = Value::Object(arguments.clone());
        debug!("arguments: {}", preview_json(&payload));

        let result = self.router.dispatch(package_id, name, arguments).await?;
        if let Ok(payload) = serde_json::to_value(&result) {
            debug!("response: {}", preview_json(&payload));
        }
        Ok(result)
    }
}
