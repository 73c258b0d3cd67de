//! Dispatch of public tool calls to the owning backend.

use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::registry::SessionRegistry;
use crate::types::GatewayError;

#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<SessionRegistry>,
}

impl Router {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Forward `public_name` to the first backend of the package that exposes it.
    ///
    /// The resolved session is held for the whole call, so a concurrent
    /// reconnect of the same backend does not affect this invocation.
    pub async fn dispatch(&self, package_id: &str, public_name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, GatewayError> {
        if !self.registry.has_package(package_id) {
            return Err(GatewayError::not_found(format!("Package '{package_id}' not found.")));
        }

        let Some(session) = self.registry.resolve(package_id, public_name).await else {
            if let Some(server_id) = self.registry.unavailable_owner(package_id, public_name) {
                warn!(package_id = %package_id, tool = %public_name, server_id = %server_id, "owning backend is unavailable");
                return Err(GatewayError::backend_unavailable(server_id));
            }
            warn!(package_id = %package_id, tool = %public_name, "tool not found");
            return Err(GatewayError::not_found(format!(
                "Tool '{public_name}' not found in package '{package_id}'."
            )));
        };

        info!(package_id = %package_id, tool = %public_name, server_id = %session.server_id(), "dispatching tool call");
        session
            .call(public_name, arguments)
            .await
            .map_err(|error| GatewayError::backend_call_failed(session.server_id(), public_name, error.to_string()))
    }
}
