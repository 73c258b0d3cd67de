//! MCP request handler exposed to downstream callers.

use std::sync::Arc;

use axum::http::request::Parts;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, ErrorData, Implementation, ListToolsResult, PaginatedRequestParams, ProtocolVersion,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};

use crate::gateway::MeshGateway;
use crate::types::Capability;

const TOKEN_PARAM: &str = "token";

/// Package and token carried by an inbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestTarget {
    pub package_id: String,
    pub token: Option<String>,
}

impl RequestTarget {
    fn from_context(context: &RequestContext<RoleServer>) -> Result<Self, ErrorData> {
        let parts = context
            .extensions
            .get::<Parts>()
            .ok_or_else(|| ErrorData::internal_error("missing HTTP request context", None))?;
        Self::from_parts(parts)
    }

    /// The last path segment names the package; `token` comes from the query string.
    pub(crate) fn from_parts(parts: &Parts) -> Result<Self, ErrorData> {
        let package_id = parts
            .uri
            .path()
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .ok_or_else(|| ErrorData::invalid_request("package id is missing from the request path", None))?
            .to_string();

        let token = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == TOKEN_PARAM)
                .map(|(_, value)| value.into_owned())
        });

        Ok(Self { package_id, token })
    }
}

/// Stateless MCP handler; one instance is created per request.
#[derive(Debug, Clone)]
pub struct MeshMcpCore {
    gateway: Arc<MeshGateway>,
}

impl MeshMcpCore {
    pub fn new(gateway: Arc<MeshGateway>) -> Self {
        Self { gateway }
    }
}

impl ServerHandler for MeshMcpCore {
    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        async move {
            let target = RequestTarget::from_context(&context)?;
            let capabilities = self
                .gateway
                .list_capabilities(&target.package_id, target.token.as_deref())
                .await?;
            Ok(ListToolsResult::with_all_items(
                capabilities.iter().map(Capability::to_tool).collect(),
            ))
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let target = RequestTarget::from_context(&context)?;
            let result = self
                .gateway
                .call_capability(&target.package_id, &request.name, request.arguments, target.token.as_deref())
                .await?;
            Ok(result)
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: "mesh".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("MCP Mesh".to_string()),
                ..Default::default()
            },
            instructions: Some(
                "Aggregated MCP gateway. Tools come from the backends of the package named in the request path; \
                 descriptions are prefixed with the originating server."
                    .to_string(),
            ),
        }
    }
}
