//! Tool metadata on both sides of the gateway.
//!
//! Backends report [`NativeTool`]s through `list_tools`. The name resolver turns
//! each one into a [`Capability`]: the public-facing record callers see, which
//! keeps a back-reference to the native name and owning server so dispatch does
//! not have to reverse the renaming.

use std::sync::Arc;

use rmcp::model::{JsonObject, Tool as RmcpTool};
use serde::{Deserialize, Serialize};

/// A tool as defined by the backend itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeTool {
    /// Tool identifier returned by the backend.
    pub name: String,
    /// Optional human-friendly title supplied by the backend.
    pub title: Option<String>,
    /// Optional description explaining the tool's behavior.
    pub description: Option<String>,
    /// JSON schema for the arguments, passed through verbatim.
    pub input_schema: Arc<JsonObject>,
}

impl NativeTool {
    /// Build a native tool with an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut schema = JsonObject::new();
        schema.insert("type".into(), serde_json::Value::String("object".into()));
        Self {
            name: name.into(),
            title: None,
            description: Some(description.into()),
            input_schema: Arc::new(schema),
        }
    }

    /// Build metadata from the raw rmcp tool payload.
    pub fn from_rmcp(tool: &RmcpTool) -> Self {
        Self {
            name: tool.name.to_string(),
            title: tool.title.clone(),
            description: tool.description.as_ref().map(|d| d.to_string()),
            input_schema: Arc::clone(&tool.input_schema),
        }
    }
}

impl From<RmcpTool> for NativeTool {
    fn from(tool: RmcpTool) -> Self {
        Self::from_rmcp(&tool)
    }
}

/// A tool as exposed to callers of a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    /// Name callers use; unique per backend, not enforced across a package.
    pub public_name: String,
    /// Name the owning backend expects on dispatch.
    pub native_name: String,
    /// Owning server id.
    pub server_id: String,
    /// Description with the server context line prepended.
    pub description: String,
    pub input_schema: Arc<JsonObject>,
}

impl Capability {
    /// Render as an MCP tool for `tools/list` responses.
    pub fn to_tool(&self) -> RmcpTool {
        RmcpTool::new(self.public_name.clone(), self.description.clone(), Arc::clone(&self.input_schema))
    }
}
