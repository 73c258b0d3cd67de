//! In-memory backends for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use serde_json::{Map, Value};
use tokio::sync::Notify;

use crate::client::{BackendClient, BackendConnector};
use crate::config::{MeshConfig, NamingPolicy, PackageConfig, ServerConfig};
use crate::types::{BackendError, NativeTool};

#[derive(Default)]
pub(crate) struct FakeConnector {
    servers: Mutex<HashMap<String, Arc<FakeServer>>>,
}

/// Behavior shared by every connection made to one server id.
pub(crate) struct FakeServer {
    pub tools: Vec<NativeTool>,
    pub refuse_connections: AtomicBool,
    connects: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    live: Mutex<Vec<Arc<FakeClient>>>,
    /// While held, `connect` parks after signalling `connect_started`.
    pub gate: tokio::sync::Mutex<()>,
    pub connect_started: Notify,
}

impl FakeServer {
    fn new(tools: &[&str]) -> Self {
        Self {
            tools: tools.iter().map(|name| NativeTool::new(*name, format!("{name} tool"))).collect(),
            refuse_connections: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            live: Mutex::new(Vec::new()),
            gate: tokio::sync::Mutex::new(()),
            connect_started: Notify::new(),
        }
    }

    /// Make every open connection fail from now on.
    pub fn break_connection(&self) {
        for client in self.live.lock().unwrap().iter() {
            client.broken.store(true, Ordering::SeqCst);
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn recorded_calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl FakeConnector {
    pub fn with_server(self, id: &str, tools: &[&str]) -> Self {
        self.servers.lock().unwrap().insert(id.to_string(), Arc::new(FakeServer::new(tools)));
        self
    }

    pub fn server(&self, id: &str) -> Arc<FakeServer> {
        Arc::clone(&self.servers.lock().unwrap()[id])
    }
}

#[async_trait]
impl BackendConnector for FakeConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Arc<dyn BackendClient>, BackendError> {
        tokio::task::yield_now().await;
        let state = self
            .servers
            .lock()
            .unwrap()
            .get(&server.id)
            .cloned()
            .ok_or_else(|| BackendError::connect(&server.id, "unknown server"))?;
        if state.gate.try_lock().is_err() {
            state.connect_started.notify_one();
        }
        drop(state.gate.lock().await);
        if state.refuse_connections.load(Ordering::SeqCst) {
            return Err(BackendError::connect(&server.id, "connection refused"));
        }
        state.connects.fetch_add(1, Ordering::SeqCst);
        let client = Arc::new(FakeClient {
            server: Arc::clone(&state),
            broken: AtomicBool::new(false),
        });
        state.live.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}

pub(crate) struct FakeClient {
    server: Arc<FakeServer>,
    broken: AtomicBool,
}

#[async_trait]
impl BackendClient for FakeClient {
    async fn list_tools(&self) -> Result<Vec<NativeTool>, BackendError> {
        tokio::task::yield_now().await;
        if self.broken.load(Ordering::SeqCst) {
            return Err(BackendError::list_tools("fake", "connection closed"));
        }
        Ok(self.server.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, BackendError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(BackendError::call(name, "connection closed"));
        }
        self.server.calls.lock().unwrap().push((name.to_string(), arguments));
        if name == "explode" {
            return Err(BackendError::call(name, "boom"));
        }
        Ok(CallToolResult::success(vec![Content::text(format!("{name} ok"))]))
    }

    fn instructions(&self) -> Option<String> {
        None
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.broken.store(true, Ordering::SeqCst);
        self.server.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn server(id: &str, prefix: &str) -> ServerConfig {
    ServerConfig {
        id: id.into(),
        command: Some(format!("mcp-{id}")),
        naming: NamingPolicy {
            tool_prefix: prefix.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub(crate) fn package(id: &str, servers: &[&str]) -> PackageConfig {
    PackageConfig {
        id: id.into(),
        enabled: true,
        servers: servers.iter().map(|s| s.to_string()).collect(),
    }
}

/// `search` = [fs, web], `fs` prefixed `fs`, `web` prefixed `web`, no delays.
pub(crate) fn search_config() -> MeshConfig {
    MeshConfig {
        servers: vec![server("fs", "fs"), server("web", "web")],
        packages: vec![package("search", &["fs", "web"])],
        retry_attempts: 2,
        retry_delay: 0,
        ..Default::default()
    }
}

pub(crate) fn search_connector() -> FakeConnector {
    FakeConnector::default()
        .with_server("fs", &["read_file", "explode"])
        .with_server("web", &["fetch"])
}
