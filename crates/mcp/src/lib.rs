//! Core of the MCP mesh gateway.
//!
//! The gateway fronts a set of backend MCP servers and exposes them to callers
//! as named packages. Each package aggregates the tools of its backends under
//! public names derived from per-server naming policies; calls are routed back
//! to the owning backend under the native name.
//!
//! Backends are connected at startup and health-checked lazily whenever a
//! package is listed or a tool is resolved. Callers can optionally be required
//! to present an encrypted credential token that is validated against an
//! external login endpoint.

pub mod auth;
pub mod client;
pub mod config;
pub mod gateway;
pub mod naming;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthGateway, Credentials, TokenCipher};
pub use client::{BackendClient, BackendConnector, RmcpConnector};
pub use config::{ConfigError, MeshConfig, ServerConfig, load_config_from_path};
pub use gateway::MeshGateway;
pub use naming::NameResolver;
pub use registry::{BackendSnapshot, SessionRegistry};
pub use router::Router;
pub use server::{MeshHttpServer, MeshMcpCore, RunningMeshHttpServer, resolve_bind_address};
pub use session::BackendSession;
pub use types::{BackendError, Capability, GatewayError, HealthStatus, NativeTool, SessionState};
