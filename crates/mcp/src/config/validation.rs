//! Configuration validation for servers, packages and authentication.

use std::collections::HashSet;
use std::str::FromStr;

use crate::auth::TokenCipher;
use crate::config::model::TransportType;
use crate::config::{MeshConfig, ServerConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

static ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("id regex should compile"));
static ENV_KEY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env key regex should compile"));

/// Validate the entire mesh configuration.
///
/// Dangling package references are not errors; they are reported with a
/// warning and skipped by the registry at runtime.
pub fn validate_config(config: &MeshConfig) -> Result<(), ValidationError> {
    let mut server_ids = HashSet::new();
    for server in &config.servers {
        validate_id("server", &server.id)?;
        if !server_ids.insert(server.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "server",
                id: server.id.clone(),
            });
        }
        if server.enabled {
            validate_server(server)?;
        }
        debug!("Validated server configuration: {}", server.id);
    }

    let mut package_ids = HashSet::new();
    for package in &config.packages {
        validate_id("package", &package.id)?;
        if !package_ids.insert(package.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                kind: "package",
                id: package.id.clone(),
            });
        }
        for server_id in &package.servers {
            match config.server(server_id) {
                None => warn!(package_id = %package.id, server_id = %server_id, "package references an unknown server"),
                Some(server) if !server.enabled => {
                    warn!(package_id = %package.id, server_id = %server_id, "package references a disabled server")
                }
                Some(_) => {}
            }
        }
    }

    validate_authentication(config)
}

/// Validate an id used as a registry or route key.
pub fn validate_id(kind: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::InvalidId {
            kind,
            id: id.to_string(),
            reason: "id cannot be empty".to_string(),
        });
    }

    if !ID_REGEX.is_match(id) {
        return Err(ValidationError::InvalidId {
            kind,
            id: id.to_string(),
            reason: "id must contain only letters, numbers, dots, underscores, and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validate a single server configuration.
pub fn validate_server(server: &ServerConfig) -> Result<(), ValidationError> {
    if server.timeout_ms == 0 {
        return Err(ValidationError::InvalidTimeout {
            server_id: server.id.clone(),
        });
    }

    match server.transport_type() {
        TransportType::Stdio => validate_stdio_server(server),
        TransportType::Http => validate_http_server(server),
        TransportType::Unknown => Err(ValidationError::InvalidTransport {
            server_id: server.id.clone(),
            reason: "server must have exactly one of 'command' (stdio) or 'baseUrl' (http)".to_string(),
        }),
    }
}

fn validate_stdio_server(server: &ServerConfig) -> Result<(), ValidationError> {
    if server.command.as_deref().is_some_and(|command| command.trim().is_empty()) {
        return Err(ValidationError::MissingRequiredField {
            field: "command".to_string(),
            transport: "stdio".to_string(),
        });
    }

    for key in server.env.keys() {
        validate_env_key(key)?;
    }

    Ok(())
}

fn validate_http_server(server: &ServerConfig) -> Result<(), ValidationError> {
    if let Some(url) = &server.base_url {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ValidationError::InvalidTransport {
                server_id: server.id.clone(),
                reason: format!("Unsupported URL scheme: {} (expected http/https)", scheme),
            });
        }
    }

    for name in server.headers.keys() {
        validate_header_name(name)?;
    }

    Ok(())
}

fn validate_authentication(config: &MeshConfig) -> Result<(), ValidationError> {
    if !config.authentication.enabled {
        return Ok(());
    }

    let login = config
        .authentication
        .login_request
        .as_ref()
        .ok_or_else(|| ValidationError::InvalidAuthentication {
            reason: "authentication is enabled but 'loginRequest' is missing".to_string(),
        })?;

    reqwest::Method::from_str(&login.method.to_ascii_uppercase()).map_err(|_| ValidationError::InvalidAuthentication {
        reason: format!("invalid login request method '{}'", login.method),
    })?;

    url::Url::parse(&login.url).map_err(|error| ValidationError::InvalidAuthentication {
        reason: format!("invalid login request url '{}': {}", login.url, error),
    })?;

    for name in login.headers.keys() {
        validate_header_name(name)?;
    }

    let encryption = config
        .encryption
        .as_ref()
        .ok_or_else(|| ValidationError::InvalidAuthentication {
            reason: "authentication is enabled but 'encryption' is missing".to_string(),
        })?;

    TokenCipher::from_config(encryption).map_err(|error| ValidationError::InvalidAuthentication {
        reason: format!("invalid encryption settings: {error}"),
    })?;

    Ok(())
}

fn validate_env_key(key: &str) -> Result<(), ValidationError> {
    if !ENV_KEY_REGEX.is_match(key) {
        return Err(ValidationError::InvalidEnvKey {
            key: key.to_string(),
            reason: "Environment variable keys must start with a letter or underscore, followed by letters, numbers, or underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validate an HTTP header name.
fn validate_header_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::InvalidHeaderName {
            name: name.to_string(),
            reason: "Header name cannot be empty".to_string(),
        });
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidHeaderName {
            name: name.to_string(),
            reason: "Header name cannot contain control characters".to_string(),
        });
    }

    Ok(())
}

/// Errors that can occur during validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid {kind} id '{id}': {reason}")]
    InvalidId { kind: &'static str, id: String, reason: String },

    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Invalid transport configuration for '{server_id}': {reason}")]
    InvalidTransport { server_id: String, reason: String },

    #[error("Missing required field '{field}' for {transport} transport")]
    MissingRequiredField { field: String, transport: String },

    #[error("Invalid environment variable key '{key}': {reason}")]
    InvalidEnvKey { key: String, reason: String },

    #[error("Invalid HTTP header name '{name}': {reason}")]
    InvalidHeaderName { name: String, reason: String },

    #[error("Invalid timeout for '{server_id}': timeoutMs must be greater than zero")]
    InvalidTimeout { server_id: String },

    #[error("Invalid authentication configuration: {reason}")]
    InvalidAuthentication { reason: String },
}
