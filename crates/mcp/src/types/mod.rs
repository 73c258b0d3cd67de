//! Core types for backend session management and routing.

pub mod errors;
pub mod status;
pub mod tools;

pub use errors::{BackendError, GatewayError};
pub use status::{HealthStatus, SessionState};
pub use tools::{Capability, NativeTool};
