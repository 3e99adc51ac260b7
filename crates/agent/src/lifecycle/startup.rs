// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent startup and wiring.

use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use tf_adapters::{BridgeHost, FileStore, HttpTransport, Transport, WsTransport};
use tf_core::SystemClock;
use tokio::net::UnixListener;
use tracing::info;

use crate::coordinator::{load_identity, AgentCoordinator, AgentDeps};

use super::{AgentState, Config, LifecycleError, StartupResult, TransportKind};

/// Start the agent
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // A held lock belongs to the agent that is already running.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. State directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Lock before touching anything else
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Collaborators
    let store = Arc::new(FileStore::open(&config.store_path)?);
    let host = Arc::new(BridgeHost::new(config.host_url.clone())?);
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Ws => Arc::new(WsTransport::new(config.server_url.clone())),
        TransportKind::Http => Arc::new(HttpTransport::new(config.server_url.clone())?),
    };

    // 4. Identity and coordinator
    let identity = load_identity(store.as_ref()).await?;
    info!(agent_id = %identity.id, transport = ?config.transport, server = %config.server_url, "starting agent");
    let agent = AgentCoordinator::new(
        AgentDeps { transport, host, store, clock: Arc::new(SystemClock) },
        config.agent.clone(),
        identity,
    );

    // 5. Control socket; a stale one from a crashed run is replaced
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 6. Pool, background duties, first connect
    agent.start().await;

    Ok(StartupResult { state: AgentState { config: config.clone(), lock_file, agent }, listener })
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}
