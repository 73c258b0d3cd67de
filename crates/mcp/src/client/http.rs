//! Streamable HTTP helpers for backend connections.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

use crate::config::ServerConfig;
use crate::types::BackendError;

/// Endpoint for the streamable HTTP transport.
pub(crate) fn resolve_endpoint(server: &ServerConfig) -> Result<String, BackendError> {
    server
        .base_url
        .as_ref()
        .map(|url| url.to_string())
        .ok_or_else(|| BackendError::connect(&server.id, "baseUrl required for http transport"))
}

/// Build a reqwest client that sends the configured headers on every request.
pub(crate) fn build_http_client(server: &ServerConfig) -> Result<reqwest::Client, BackendError> {
    let mut headers = HeaderMap::new();
    for (key, value) in &server.headers {
        match (HeaderName::try_from(key.as_str()), HeaderValue::try_from(value.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(server_id = %server.id, header = %key, "skipping invalid header"),
        }
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(server.timeout())
        .build()
        .map_err(|error| BackendError::connect(&server.id, format!("failed to build http client: {error}")))
}
