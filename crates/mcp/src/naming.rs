//! Public naming of backend tools.
//!
//! Every backend owns a [`NamingPolicy`]; the resolver applies it to the native
//! tool metadata to produce the [`Capability`] callers see, and maps a public
//! name back to the native one when no stored mapping is available.

use std::sync::Arc;

use crate::config::{NamingPolicy, ServerConfig};
use crate::types::{Capability, NativeTool};

const CONTEXT_SEPARATOR: &str = " | ";

/// Pure translator between native tool metadata and public capabilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameResolver;

impl NameResolver {
    /// Compute the public capability for a native tool of `server`.
    ///
    /// `instructions` are the usage notes the backend returned during the
    /// handshake, if any.
    pub fn resolve_capability(native: &NativeTool, server: &ServerConfig, instructions: Option<&str>) -> Capability {
        let public_name = Self::public_name(&server.naming, &native.name);
        let description = Self::describe(native, server, instructions, &public_name);

        Capability {
            public_name,
            native_name: native.name.clone(),
            server_id: server.id.clone(),
            description,
            input_schema: Arc::clone(&native.input_schema),
        }
    }

    /// Resolve every tool of a backend, preserving backend order.
    pub fn resolve_all(tools: &[NativeTool], server: &ServerConfig, instructions: Option<&str>) -> Vec<Capability> {
        tools
            .iter()
            .map(|tool| Self::resolve_capability(tool, server, instructions))
            .collect()
    }

    /// Public name for a native tool: override, then prefix, then unchanged.
    pub fn public_name(policy: &NamingPolicy, native_name: &str) -> String {
        if let Some(name) = policy.tool_overrides.get(native_name) {
            return name.clone();
        }
        if !policy.tool_prefix.is_empty() {
            return format!("{}_{}", policy.tool_prefix, native_name);
        }
        native_name.to_string()
    }

    /// Heuristic reverse mapping: strip `{prefix}_` when present.
    ///
    /// Does not invert `toolOverrides`. Callers that hold a [`Capability`]
    /// should prefer its `native_name`.
    pub fn native_name(policy: &NamingPolicy, public_name: &str) -> String {
        if !policy.tool_prefix.is_empty()
            && let Some(stripped) = public_name
                .strip_prefix(policy.tool_prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
        {
            return stripped.to_string();
        }
        public_name.to_string()
    }

    fn describe(native: &NativeTool, server: &ServerConfig, instructions: Option<&str>, public_name: &str) -> String {
        let mut context = Vec::new();
        if !server.naming.server_context.is_empty() {
            context.push(format!("Server: {}", server.naming.server_context));
        }
        if !server.name.is_empty() {
            context.push(format!("Source: {}", server.name));
        }
        if let Some(usage) = instructions.filter(|usage| !usage.is_empty()) {
            context.push(format!("Usage: {usage}"));
        }

        let body = native
            .description
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(public_name);

        let mut description = if context.is_empty() {
            body.to_string()
        } else {
            format!("[{}] {}", context.join(CONTEXT_SEPARATOR), body)
        };

        if !server.naming.description_suffix.is_empty() {
            description.push(' ');
            description.push_str(&server.naming.description_suffix);
        }
        description
    }
}
