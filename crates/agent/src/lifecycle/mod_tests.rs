// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tf_core::ConnectionState;

fn config_in(dir: &std::path::Path) -> Config {
    Config {
        state_dir: dir.to_path_buf(),
        socket_path: dir.join("agent.sock"),
        lock_path: dir.join("agent.pid"),
        store_path: dir.join("agent.json"),
        log_dir: dir.join("logs"),
        // Nothing listens on port 1; connects and host calls fail fast.
        server_url: "ws://127.0.0.1:1".to_string(),
        transport: TransportKind::Ws,
        host_url: "http://127.0.0.1:1".to_string(),
        ipc_timeout: Duration::from_secs(1),
        agent: CoordinatorConfig { pool_size: 1, ..CoordinatorConfig::default() },
    }
}

#[yare::parameterized(
    ws = { "ws", Some(TransportKind::Ws) },
    websocket = { "WebSocket", Some(TransportKind::Ws) },
    http = { "http", Some(TransportKind::Http) },
    polling = { "polling", Some(TransportKind::Http) },
    unknown = { "carrier-pigeon", None },
)]
fn transport_kind_parses(input: &str, expected: Option<TransportKind>) {
    assert_eq!(input.parse::<TransportKind>().ok(), expected);
}

#[tokio::test]
async fn startup_persists_identity_and_binds_socket() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let result = startup(&config).await.unwrap();
    assert!(config.socket_path.exists());
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.store_path).unwrap()).unwrap();
    assert_eq!(stored["agentId"], serde_json::json!(result.state.agent.agent_id()));
    assert_ne!(result.state.agent.connection().state(), ConnectionState::Online);

    result.state.shutdown().await;
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn second_startup_fails_on_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let first = startup(&config).await.unwrap();
    let second = startup(&config).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
    // The running agent keeps its socket.
    assert!(config.socket_path.exists());

    first.state.shutdown().await;
}

#[tokio::test]
async fn identity_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let first = startup(&config).await.unwrap();
    let id = first.state.agent.agent_id();
    first.state.shutdown().await;
    drop(first);

    let second = startup(&config).await.unwrap();
    assert_eq!(second.state.agent.agent_id(), id);
    second.state.shutdown().await;
}
