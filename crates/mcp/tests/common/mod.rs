#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mesh_mcp::config::{NamingPolicy, PackageConfig};
use mesh_mcp::{BackendClient, BackendConnector, BackendError, MeshConfig, NativeTool, ServerConfig};
use rmcp::model::{CallToolResult, Content};
use serde_json::{Map, Value};

/// Behavior shared by every connection made to one server id.
pub struct FakeServer {
    pub tools: Vec<NativeTool>,
    pub refuse_connections: AtomicBool,
    instructions: Mutex<Option<String>>,
    connects: AtomicUsize,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
    live: Mutex<Vec<Arc<FakeClient>>>,
}

impl FakeServer {
    /// Make every open connection fail from now on.
    pub fn break_connection(&self) {
        for client in self.live.lock().unwrap().iter() {
            client.broken.store(true, Ordering::SeqCst);
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn recorded_calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeConnector {
    servers: HashMap<String, Arc<FakeServer>>,
}

impl FakeConnector {
    pub fn with_server(mut self, id: &str, tools: &[&str]) -> Self {
        self.servers.insert(
            id.to_string(),
            Arc::new(FakeServer {
                tools: tools.iter().map(|name| NativeTool::new(*name, format!("Runs {name}"))).collect(),
                refuse_connections: AtomicBool::new(false),
                instructions: Mutex::new(None),
                connects: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
                live: Mutex::new(Vec::new()),
            }),
        );
        self
    }

    /// Usage instructions reported by `id` on initialize.
    pub fn with_instructions(self, id: &str, instructions: &str) -> Self {
        *self.servers[id].instructions.lock().unwrap() = Some(instructions.to_string());
        self
    }

    pub fn server(&self, id: &str) -> Arc<FakeServer> {
        Arc::clone(&self.servers[id])
    }
}

#[async_trait]
impl BackendConnector for FakeConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Arc<dyn BackendClient>, BackendError> {
        tokio::task::yield_now().await;
        let state = self
            .servers
            .get(&server.id)
            .cloned()
            .ok_or_else(|| BackendError::connect(&server.id, "unknown server"))?;
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

pub struct FakeClient {
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
        Ok(CallToolResult::success(vec![Content::text(format!("{name} done"))]))
    }

    fn instructions(&self) -> Option<String> {
        self.server.instructions.lock().unwrap().clone()
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.broken.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub fn server(id: &str, prefix: &str) -> ServerConfig {
    ServerConfig {
        id: id.into(),
        name: format!("{id} server"),
        command: Some(format!("mcp-{id}")),
        naming: NamingPolicy {
            tool_prefix: prefix.into(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Package `search` over `fs` (prefix `fs`) and `web` (prefix `web`).
pub fn search_config() -> MeshConfig {
    MeshConfig {
        servers: vec![server("fs", "fs"), server("web", "web")],
        packages: vec![PackageConfig {
            id: "search".into(),
            enabled: true,
            servers: vec!["fs".into(), "web".into()],
        }],
        retry_attempts: 1,
        retry_delay: 0,
        ..Default::default()
    }
}

pub fn search_connector() -> FakeConnector {
    FakeConnector::default()
        .with_server("fs", &["read_file", "list_dir"])
        .with_instructions("fs", "Paths are absolute")
        .with_server("web", &["fetch"])
}
