//! Backend connections.
//!
//! The registry only sees the [`BackendConnector`] / [`BackendClient`] seam;
//! [`RmcpConnector`] is the production implementation that speaks MCP to a
//! child process over stdio or to a remote endpoint over streamable HTTP.

mod connector;
mod http;
mod mcp;
mod stdio;

pub use connector::{BackendClient, BackendConnector};
pub use mcp::{RmcpBackendClient, RmcpConnector};
