//! Error types for backend sessions and request routing.

use rmcp::model::ErrorData;
use thiserror::Error;

/// Failures surfaced to callers of the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Authentication is enabled and the token or credentials were rejected.
    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Unknown package, or no backend in the package exposes the capability.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The backend owning the capability failed its health check and reconnect.
    #[error("Backend unavailable: {server_id}")]
    BackendUnavailable { server_id: String },

    /// The backend accepted the call but raised an error.
    #[error("Backend call failed: {server_id}/{tool_name} - {message}")]
    BackendCallFailed {
        server_id: String,
        tool_name: String,
        message: String,
    },
}

/// Failures talking to a single backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Connection error: {server_id} - {message}")]
    Connect { server_id: String, message: String },

    #[error("Tool listing failed: {server_id} - {message}")]
    ListTools { server_id: String, message: String },

    #[error("Tool invocation error: {tool_name} - {message}")]
    Call { tool_name: String, message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Close failed: {server_id} - {message}")]
    Close { server_id: String, message: String },

    #[error("Backend not connected: {server_id}")]
    NotConnected { server_id: String },
}

impl GatewayError {
    /// Create an unauthorized error.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized { reason: reason.into() }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// Create a backend-unavailable error.
    pub fn backend_unavailable(server_id: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            server_id: server_id.into(),
        }
    }

    /// Create a backend-call-failed error.
    pub fn backend_call_failed(server_id: impl Into<String>, tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendCallFailed {
            server_id: server_id.into(),
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ErrorData {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Unauthorized { .. } | GatewayError::NotFound { .. } => ErrorData::invalid_request(error.to_string(), None),
            GatewayError::BackendUnavailable { .. } | GatewayError::BackendCallFailed { .. } => {
                ErrorData::internal_error(error.to_string(), None)
            }
        }
    }
}

impl BackendError {
    /// Create a connection error.
    pub fn connect(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            server_id: server_id.into(),
            message: message.into(),
        }
    }

    /// Create a tool listing error.
    pub fn list_tools(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ListTools {
            server_id: server_id.into(),
            message: message.into(),
        }
    }

    /// Create a tool invocation error.
    pub fn call(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a close error.
    pub fn close(server_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Close {
            server_id: server_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_gateway_error_creation() {
        let err = GatewayError::unauthorized("Token is missing.");
        assert!(matches!(err, GatewayError::Unauthorized { .. }));
        assert_eq!(err.to_string(), "Unauthorized: Token is missing.");

        let err = GatewayError::backend_call_failed("fs", "read_file", "boom");
        assert_eq!(err.to_string(), "Backend call failed: fs/read_file - boom");
    }

    #[test]
    fn caller_errors_map_to_invalid_request() {
        let data: ErrorData = GatewayError::not_found("Tool 'x' not found in package 'p'.").into();
        assert_eq!(data.code, ErrorCode::INVALID_REQUEST);
        assert!(data.message.contains("Tool 'x'"));

        let data: ErrorData = GatewayError::unauthorized("nope").into();
        assert_eq!(data.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn backend_errors_map_to_internal_error() {
        let data: ErrorData = GatewayError::backend_unavailable("fs").into();
        assert_eq!(data.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn test_backend_error_creation() {
        let err = BackendError::timeout("call_tool read_file", 5000);
        assert_eq!(err.to_string(), "Timeout error: call_tool read_file timed out after 5000ms");
        assert!(matches!(BackendError::connect("fs", "spawn failed"), BackendError::Connect { .. }));
    }
}
