//! Lifecycle and health types for backend sessions.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Lifecycle state of one backend session.
///
/// ```text
/// Disconnected -> Connecting -> Healthy -> Unhealthy -> Reconnecting -> Healthy | Disabled
///                     \-> Disconnected (startup retry)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No connection; initial state and the state after a failed startup attempt or shutdown.
    Disconnected,
    /// A startup connect is in progress.
    Connecting,
    /// Connected and the last probe succeeded.
    Healthy,
    /// The last liveness probe failed.
    Unhealthy,
    /// Old connection closed, new one being opened.
    Reconnecting,
    /// Reconnect failed; the backend is out of rotation.
    Disabled,
}

impl SessionState {
    /// Get the display text for this state.
    pub fn display(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connecting => "Connecting",
            SessionState::Healthy => "Healthy",
            SessionState::Unhealthy => "Unhealthy",
            SessionState::Reconnecting => "Reconnecting",
            SessionState::Disabled => "Disabled",
        }
    }

    /// Check if the session can serve calls.
    pub fn is_healthy(&self) -> bool {
        matches!(self, SessionState::Healthy)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display())
    }
}

/// Health record of a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Whether the backend is healthy.
    pub healthy: bool,

    /// Last health check time.
    pub last_check: Option<SystemTime>,

    /// When the current connection was established.
    pub start_time: Option<SystemTime>,

    /// Connect + tool listing latency in milliseconds.
    pub handshake_latency: Option<u64>,

    /// Number of consecutive failures.
    pub failure_count: u32,

    /// Last error message.
    pub last_error: Option<String>,
}

impl HealthStatus {
    /// Create a new health status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh connection.
    pub fn mark_connected(&mut self, handshake_latency: Duration) {
        self.start_time = Some(SystemTime::now());
        self.handshake_latency = Some(u64::try_from(handshake_latency.as_millis()).unwrap_or(u64::MAX));
        self.mark_healthy();
    }

    /// Mark the backend as healthy.
    pub fn mark_healthy(&mut self) {
        self.healthy = true;
        self.failure_count = 0;
        self.last_error = None;
        self.last_check = Some(SystemTime::now());
    }

    /// Mark the backend as unhealthy with an error.
    pub fn mark_unhealthy(&mut self, error: String) {
        self.healthy = false;
        self.failure_count += 1;
        self.last_error = Some(error);
        self.last_check = Some(SystemTime::now());
    }

    /// Check if the backend is healthy.
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Get the uptime of the current connection.
    pub fn uptime(&self) -> Option<Duration> {
        self.start_time.map(|start| start.elapsed().unwrap_or_default())
    }
}
