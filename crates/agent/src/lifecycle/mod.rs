// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent lifecycle: configuration, startup, shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tf_adapters::{HostError, StoreError, TransportError};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::connection::ConnectionConfig;
use crate::coordinator::{AgentCoordinator, CoordinatorConfig, InFlightPolicy};
use crate::env;
use crate::executor::ExecutorConfig;

/// Which server link to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// Persistent WebSocket.
    #[default]
    Ws,
    /// HTTP polling.
    Http,
}

impl FromStr for TransportKind {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ws" | "websocket" => Ok(TransportKind::Ws),
            "http" | "polling" => Ok(TransportKind::Http),
            other => Err(LifecycleError::Config(format!("unknown transport: {other}"))),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tabfleet)
    pub state_dir: PathBuf,
    /// Control socket
    pub socket_path: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    /// Persistent key-value store
    pub store_path: PathBuf,
    /// Directory for rolling log files
    pub log_dir: PathBuf,
    pub server_url: String,
    pub transport: TransportKind,
    pub host_url: String,
    pub ipc_timeout: Duration,
    pub agent: CoordinatorConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let transport = env::transport().map(|s| s.parse()).transpose()?.unwrap_or_default();
        let inflight_policy = env::inflight_policy()
            .map(|s| s.parse::<InFlightPolicy>())
            .transpose()
            .map_err(LifecycleError::Config)?
            .unwrap_or_default();

        let agent = CoordinatorConfig {
            pool_size: env::pool_size(),
            job_timeout_ms: env::job_timeout_ms(),
            inflight_policy,
            executor: ExecutorConfig::default().search_url(env::search_url()),
            connection: ConnectionConfig::default()
                .heartbeat_interval(env::heartbeat_interval())
                .poll_interval(env::poll_interval())
                .reconnect_delay(env::reconnect_delay())
                .heartbeat_failure_delay(env::heartbeat_failure_delay())
                .max_connect_attempts(env::max_connect_attempts()),
            ..CoordinatorConfig::default()
        };

        Ok(Self {
            socket_path: state_dir.join("agent.sock"),
            lock_path: state_dir.join("agent.pid"),
            store_path: state_dir.join("agent.json"),
            log_dir: state_dir.join("logs"),
            server_url: env::server_url(),
            transport,
            host_url: env::host_url(),
            ipc_timeout: env::ipc_timeout(),
            agent,
            state_dir,
        })
    }
}

/// Running agent.
pub struct AgentState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub agent: Arc<AgentCoordinator>,
}

/// Result of startup: the running agent plus the control socket to serve.
pub struct StartupResult {
    pub state: AgentState,
    pub listener: UnixListener,
}

impl AgentState {
    /// Stop the agent and remove the socket and lock files.
    pub async fn shutdown(&self) {
        info!("shutting down agent");
        self.agent.on_shutdown().await;

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove lock file: {}", e);
            }
        }
        info!("agent shutdown complete");
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to acquire lock: agent already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, #[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Resource host error: {0}")]
    Host(#[from] HostError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
