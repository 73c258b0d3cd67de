mod core;
mod health;
mod http;

pub use core::MeshMcpCore;
pub use http::{MeshHttpServer, RunningMeshHttpServer, resolve_bind_address};
