//! Live backend sessions and the package -> backend mapping.
//!
//! Health is checked lazily on the read path: listing a package probes each
//! of its backends and reconnects the ones that fail. Each backend owns a
//! mutual-exclusion region around probe, reconnect and publish so that
//! concurrent callers observing the same failure trigger a single reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::client::BackendConnector;
use crate::config::{MeshConfig, ServerConfig};
use crate::session::BackendSession;
use crate::types::{BackendError, Capability, HealthStatus, SessionState};

/// Point-in-time view of one backend, taken without probing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSnapshot {
    pub server_id: String,
    pub state: SessionState,
    pub health: HealthStatus,
    pub capability_count: usize,
    /// Seconds since the current connection was established.
    pub uptime_secs: Option<u64>,
}

struct SlotStatus {
    state: SessionState,
    session: Option<Arc<BackendSession>>,
    health: HealthStatus,
    /// Capabilities of the most recent session, kept after the backend is disabled.
    last_known: Arc<Vec<Capability>>,
}

struct BackendSlot {
    server: ServerConfig,
    /// Held across probe -> reconnect -> publish.
    maintenance: tokio::sync::Mutex<()>,
    status: Mutex<SlotStatus>,
}

impl BackendSlot {
    fn new(server: ServerConfig) -> Self {
        Self {
            server,
            maintenance: tokio::sync::Mutex::new(()),
            status: Mutex::new(SlotStatus {
                state: SessionState::Disconnected,
                session: None,
                health: HealthStatus::new(),
                last_known: Arc::new(Vec::new()),
            }),
        }
    }

    fn status(&self) -> MutexGuard<'_, SlotStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> Option<Arc<BackendSession>> {
        self.status().session.clone()
    }

    fn set_state(&self, state: SessionState) {
        self.status().state = state;
    }

    /// Install a fresh session unless the registry is closing.
    ///
    /// The flag is read under the status lock so that `shutdown` either sees the
    /// session or the publisher sees the flag.
    fn publish(&self, session: Arc<BackendSession>, latency: std::time::Duration, closing: &AtomicBool) -> bool {
        let mut status = self.status();
        if closing.load(Ordering::SeqCst) {
            return false;
        }
        status.last_known = session.capabilities();
        status.session = Some(session);
        status.state = SessionState::Healthy;
        status.health.mark_connected(latency);
        true
    }

    fn record_failure(&self, state: SessionState, error: &BackendError) {
        let mut status = self.status();
        status.state = state;
        status.health.mark_unhealthy(error.to_string());
        if matches!(state, SessionState::Disabled | SessionState::Disconnected) {
            status.session = None;
        }
    }
}

/// Registry of backend sessions shared by all inbound requests.
pub struct SessionRegistry {
    config: Arc<MeshConfig>,
    connector: Arc<dyn BackendConnector>,
    slots: IndexMap<String, Arc<BackendSlot>>,
    packages: IndexMap<String, Vec<String>>,
    started: AtomicBool,
    initialized: AtomicBool,
    closing: AtomicBool,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("servers", &self.slots.keys().collect::<Vec<_>>())
            .field("packages", &self.packages)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl SessionRegistry {
    /// Build the registry for the enabled servers and packages of `config`.
    ///
    /// Package entries that point at unknown or disabled servers are dropped here.
    pub fn new(config: Arc<MeshConfig>, connector: Arc<dyn BackendConnector>) -> Self {
        let slots: IndexMap<String, Arc<BackendSlot>> = config
            .enabled_servers()
            .map(|server| (server.id.clone(), Arc::new(BackendSlot::new(server.clone()))))
            .collect();

        let packages = config
            .enabled_packages()
            .map(|package| {
                let servers = package
                    .servers
                    .iter()
                    .filter(|server_id| {
                        let known = slots.contains_key(server_id.as_str());
                        if !known {
                            debug!(package_id = %package.id, server_id = %server_id, "skipping unavailable server");
                        }
                        known
                    })
                    .cloned()
                    .collect();
                (package.id.clone(), servers)
            })
            .collect();

        Self {
            config,
            connector,
            slots,
            packages,
            started: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            closing: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Connect every enabled backend, one at a time, in config order.
    ///
    /// Never fails: a backend that exhausts its retries stays disconnected and
    /// is left out of every listing. Only the first call does any work.
    pub async fn initialize(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("registry initialization already started");
            return;
        }

        let delay = self.config.startup_delay();
        if !delay.is_zero() {
            info!(delay_secs = delay.as_secs(), "waiting before connecting backends");
            sleep(delay).await;
        }

        for slot in self.slots.values() {
            self.connect_with_retry(slot).await;
        }

        self.initialized.store(true, Ordering::SeqCst);
        self.warn_on_collisions();

        let healthy = self.slots.values().filter(|slot| slot.status().state.is_healthy()).count();
        info!(healthy, total = self.slots.len(), "backend registry initialized");
    }

    async fn connect_with_retry(&self, slot: &BackendSlot) {
        let server = &slot.server;
        let attempts = self.config.retry_attempts.max(1);

        for attempt in 1..=attempts {
            if self.closing.load(Ordering::SeqCst) {
                return;
            }
            slot.set_state(SessionState::Connecting);
            info!(server_id = %server.id, attempt, attempts, "connecting backend");

            let started = Instant::now();
            match self.open_session(server).await {
                Ok(session) => {
                    let session = Arc::new(session);
                    if !slot.publish(Arc::clone(&session), started.elapsed(), &self.closing) {
                        self.discard(slot, &session).await;
                    }
                    return;
                }
                Err(error) => {
                    warn!(server_id = %server.id, attempt, "backend connect failed: {}", error);
                    slot.record_failure(SessionState::Disconnected, &error);
                    if attempt < attempts {
                        sleep(self.config.retry_delay()).await;
                    }
                }
            }
        }

        warn!(server_id = %server.id, "backend unavailable after {} attempts", attempts);
    }

    async fn open_session(&self, server: &ServerConfig) -> Result<BackendSession, BackendError> {
        let client = self.connector.connect(server).await?;
        match BackendSession::open(server, Arc::clone(&client)).await {
            Ok(session) => Ok(session),
            Err(error) => {
                if let Err(close_error) = client.close().await {
                    debug!(server_id = %server.id, "close after failed open: {}", close_error);
                }
                Err(error)
            }
        }
    }

    /// Close a session opened while the registry was shutting down.
    async fn discard(&self, slot: &BackendSlot, session: &BackendSession) {
        {
            let mut status = slot.status();
            status.state = SessionState::Disconnected;
            status.session = None;
        }
        debug!(server_id = %session.server_id(), "closing session opened during shutdown");
        if let Err(error) = session.client().close().await {
            warn!(server_id = %session.server_id(), "failed to close backend: {}", error);
        }
    }

    /// Probe a backend and reconnect it once if the probe fails.
    ///
    /// Returns the session to use, or `None` when the backend is out of rotation.
    async fn ensure_healthy(&self, slot: &BackendSlot) -> Option<Arc<BackendSession>> {
        let _guard = slot.maintenance.lock().await;
        if self.closing.load(Ordering::SeqCst) {
            return None;
        }
        let session = slot.session()?;

        let error = match session.client().list_tools().await {
            Ok(_) => {
                let mut status = slot.status();
                status.state = SessionState::Healthy;
                status.health.mark_healthy();
                return Some(session);
            }
            Err(error) => error,
        };

        let server_id = &slot.server.id;
        warn!(server_id = %server_id, "liveness probe failed: {}", error);
        slot.record_failure(SessionState::Unhealthy, &error);

        slot.set_state(SessionState::Reconnecting);
        if let Err(close_error) = session.client().close().await {
            warn!(server_id = %server_id, "failed to close stale connection: {}", close_error);
        }

        let started = Instant::now();
        match self.open_session(&slot.server).await {
            Ok(fresh) => {
                let fresh = Arc::new(fresh);
                if !slot.publish(Arc::clone(&fresh), started.elapsed(), &self.closing) {
                    self.discard(slot, &fresh).await;
                    return None;
                }
                info!(server_id = %server_id, "backend reconnected");
                Some(fresh)
            }
            Err(error) => {
                warn!(server_id = %server_id, "reconnect failed, disabling backend: {}", error);
                slot.record_failure(SessionState::Disabled, &error);
                None
            }
        }
    }

    fn package_slots(&self, package_id: &str) -> Vec<Arc<BackendSlot>> {
        self.packages
            .get(package_id)
            .map(|servers| {
                servers
                    .iter()
                    .filter_map(|server_id| self.slots.get(server_id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn healthy_sessions(&self, package_id: &str) -> Vec<Arc<BackendSession>> {
        let mut sessions = Vec::new();
        for slot in self.package_slots(package_id) {
            if let Some(session) = self.ensure_healthy(&slot).await {
                sessions.push(session);
            }
        }
        sessions
    }

    pub fn has_package(&self, package_id: &str) -> bool {
        self.packages.contains_key(package_id)
    }

    /// Capabilities of every reachable backend of a package, in package order.
    ///
    /// Unknown packages yield an empty list.
    pub async fn list_capabilities(&self, package_id: &str) -> Vec<Capability> {
        self.healthy_sessions(package_id)
            .await
            .iter()
            .flat_map(|session| session.capabilities().iter().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// First session, in package order, exposing `public_name`.
    pub async fn resolve(&self, package_id: &str, public_name: &str) -> Option<Arc<BackendSession>> {
        self.healthy_sessions(package_id)
            .await
            .into_iter()
            .find(|session| session.contains(public_name))
    }

    /// Server id of a disabled backend that last advertised `public_name`.
    pub fn unavailable_owner(&self, package_id: &str, public_name: &str) -> Option<String> {
        self.package_slots(package_id).into_iter().find_map(|slot| {
            let status = slot.status();
            let owns = status.state == SessionState::Disabled
                && status.last_known.iter().any(|capability| capability.public_name == public_name);
            owns.then(|| slot.server.id.clone())
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Per-backend state and health, in config order.
    pub fn snapshot(&self) -> Vec<BackendSnapshot> {
        self.slots
            .values()
            .map(|slot| {
                let status = slot.status();
                BackendSnapshot {
                    server_id: slot.server.id.clone(),
                    state: status.state,
                    health: status.health.clone(),
                    capability_count: status.session.as_ref().map_or(0, |session| session.capabilities().len()),
                    uptime_secs: status.session.as_ref().and(status.health.uptime()).map(|uptime| uptime.as_secs()),
                }
            })
            .collect()
    }

    /// Close every backend connection. One failure does not stop the others.
    ///
    /// Waits for any reconnect in flight; sessions opened after this point are
    /// closed instead of published.
    pub async fn shutdown(&self) {
        self.closing.store(true, Ordering::SeqCst);
        for slot in self.slots.values() {
            let _guard = slot.maintenance.lock().await;
            let session = {
                let mut status = slot.status();
                status.state = SessionState::Disconnected;
                status.session.take()
            };
            let Some(session) = session else {
                continue;
            };
            match session.client().close().await {
                Ok(()) => debug!(server_id = %slot.server.id, "backend closed"),
                Err(error) => warn!(server_id = %slot.server.id, "failed to close backend: {}", error),
            }
        }
        info!("backend registry shut down");
    }

    /// Log public names offered by more than one backend of a package.
    fn warn_on_collisions(&self) {
        for (package_id, servers) in &self.packages {
            let mut owners: HashMap<String, &str> = HashMap::new();
            for server_id in servers {
                let Some(session) = self.slots.get(server_id).and_then(|slot| slot.session()) else {
                    continue;
                };
                for capability in session.capabilities().iter() {
                    match owners.get(&capability.public_name) {
                        Some(first) => warn!(
                            package_id = %package_id,
                            tool = %capability.public_name,
                            winner = %first,
                            shadowed = %server_id,
                            "duplicate public tool name; first backend in package order wins"
                        ),
                        None => {
                            owners.insert(capability.public_name.clone(), server_id.as_str());
                        }
                    }
                }
            }
        }
    }
}
