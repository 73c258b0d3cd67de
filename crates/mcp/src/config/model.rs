//! Data models for the mesh configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::interpolation::InterpolationError;
use crate::config::validation::ValidationError;

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Full gateway configuration: backends, packages, startup policy and auth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshConfig {
    /// Backend servers in startup order.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Logical groupings of servers addressed by callers.
    #[serde(default)]
    pub packages: Vec<PackageConfig>,

    /// Seconds to wait before the first backend connect.
    #[serde(default)]
    pub startup_delay: u64,

    /// Connect attempts per backend during startup.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Fixed delay in seconds between startup connect attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    #[serde(default)]
    pub authentication: AuthenticationConfig,

    /// Key material for the token cipher. Required when authentication is enabled.
    #[serde(default)]
    pub encryption: Option<EncryptionConfig>,

    #[serde(default)]
    pub http_server: HttpServerConfig,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            packages: Vec::new(),
            startup_delay: 0,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
            authentication: AuthenticationConfig::default(),
            encryption: None,
            http_server: HttpServerConfig::default(),
        }
    }
}

impl MeshConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }

    /// Look up a server by id.
    pub fn server(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|server| server.id == id)
    }

    /// Servers that should be connected at startup, in configuration order.
    pub fn enabled_servers(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|server| server.enabled)
    }

    /// Enabled packages, in configuration order.
    pub fn enabled_packages(&self) -> impl Iterator<Item = &PackageConfig> {
        self.packages.iter().filter(|package| package.enabled)
    }
}

/// Configuration for a single backend server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Registry key; referenced by packages.
    pub id: String,

    /// Display name, also used as the `Source:` part of tool descriptions.
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Command to execute for stdio transport.
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables for the child process.
    #[serde(default)]
    pub env: IndexMap<String, String>,

    /// Working directory for the child process.
    pub cwd: Option<PathBuf>,

    /// Endpoint for streamable HTTP transport.
    pub base_url: Option<Url>,

    /// Headers sent with every HTTP transport request.
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    /// Upper bound for connect, probe and call operations.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(flatten)]
    pub naming: NamingPolicy,

    /// Load-time error that disabled this server, if any.
    #[serde(skip)]
    pub err: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            enabled: true,
            command: None,
            args: Vec::new(),
            env: IndexMap::new(),
            cwd: None,
            base_url: None,
            headers: IndexMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            naming: NamingPolicy::default(),
            err: None,
        }
    }
}

impl ServerConfig {
    /// Check if this server is configured for stdio transport.
    pub fn is_stdio(&self) -> bool {
        self.command.is_some()
    }

    /// Check if this server is configured for HTTP transport.
    pub fn is_http(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn transport_type(&self) -> TransportType {
        match (self.is_stdio(), self.is_http()) {
            (true, false) => TransportType::Stdio,
            (false, true) => TransportType::Http,
            _ => TransportType::Unknown,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name used in logs and process labels; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// Per-server rules for turning native tool names into public ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingPolicy {
    /// Prepended as `{prefix}_{native}` unless an override applies.
    #[serde(default)]
    pub tool_prefix: String,

    /// Appended to every description.
    #[serde(default)]
    pub description_suffix: String,

    /// Free-form context shown as `Server: ...` in descriptions.
    #[serde(default)]
    pub server_context: String,

    /// Explicit native -> public renames; win over the prefix.
    #[serde(default)]
    pub tool_overrides: IndexMap<String, String>,
}

/// A named group of servers exposed as one capability surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageConfig {
    pub id: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Server ids in aggregation order.
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Request used to validate decrypted credentials against the identity service.
    pub login_request: Option<LoginRequestTemplate>,
}

/// HTTP request template for delegated credential validation.
///
/// `{username}` and `{password}` in `body_template` are substituted verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequestTemplate {
    #[serde(default = "default_method")]
    pub method: String,

    pub url: String,

    #[serde(default)]
    pub headers: IndexMap<String, String>,

    #[serde(default)]
    pub body_template: String,

    #[serde(default = "default_content_type")]
    pub content_type: String,
}

/// Base64-encoded AES key and IV for the token cipher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionConfig {
    pub key: String,
    pub iv: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Transport type for backend servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Stdio,
    Http,
    Unknown,
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportType::Stdio => write!(f, "stdio"),
            TransportType::Http => write!(f, "http"),
            TransportType::Unknown => write!(f, "unknown"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
          "servers": [
            {
              "id": "fs",
              "name": "Filesystem",
              "command": "npx",
              "args": ["-y", "@modelcontextprotocol/server-filesystem", "/data"],
              "env": { "LOG_LEVEL": "debug" },
              "toolPrefix": "fs",
              "serverContext": "Shared drive",
              "toolOverrides": { "read_text_file": "read" }
            },
            {
              "id": "web",
              "baseUrl": "https://mcp.example.com/mcp",
              "headers": { "X-Team": "search" },
              "enabled": false,
              "timeoutMs": 5000
            }
          ],
          "packages": [ { "id": "search", "servers": ["fs", "web"] } ],
          "startupDelay": 2,
          "authentication": {
            "enabled": true,
            "loginRequest": {
              "url": "https://id.example.com/login",
              "bodyTemplate": "{\"user\":\"{username}\",\"pass\":\"{password}\"}"
            }
          },
          "encryption": { "key": "AAAAAAAAAAAAAAAAAAAAAA==", "iv": "AAAAAAAAAAAAAAAAAAAAAA==" }
        }"#;

        let cfg: MeshConfig = serde_json::from_str(json).expect("config deserializes");
        assert_eq!(cfg.servers.len(), 2);
        assert_eq!(cfg.startup_delay, 2);
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.retry_delay, 5);

        let fs = cfg.server("fs").unwrap();
        assert!(fs.enabled);
        assert_eq!(fs.transport_type(), TransportType::Stdio);
        assert_eq!(fs.naming.tool_prefix, "fs");
        assert_eq!(fs.naming.tool_overrides.get("read_text_file").map(String::as_str), Some("read"));
        assert_eq!(fs.timeout(), Duration::from_secs(30));

        let web = cfg.server("web").unwrap();
        assert!(!web.enabled);
        assert_eq!(web.transport_type(), TransportType::Http);
        assert_eq!(web.display_name(), "web");
        assert_eq!(web.timeout_ms, 5000);

        assert_eq!(cfg.enabled_servers().count(), 1);
        assert_eq!(cfg.packages[0].servers, vec!["fs", "web"]);
        assert!(cfg.packages[0].enabled);

        let login = cfg.authentication.login_request.as_ref().unwrap();
        assert_eq!(login.method, "POST");
        assert_eq!(login.content_type, "application/json");
        assert_eq!(cfg.http_server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: MeshConfig = serde_json::from_str("{}").unwrap();
        assert!(cfg.servers.is_empty());
        assert!(!cfg.authentication.enabled);
        assert_eq!(cfg.retry_attempts, 3);
        assert_eq!(cfg.retry_delay(), Duration::from_secs(5));
        assert_eq!(cfg.startup_delay(), Duration::ZERO);
    }

    #[test]
    fn server_with_both_transports_is_unknown() {
        let server = ServerConfig {
            command: Some("node".into()),
            base_url: Some(Url::parse("http://localhost:1").unwrap()),
            ..Default::default()
        };
        assert_eq!(server.transport_type(), TransportType::Unknown);
    }
}
