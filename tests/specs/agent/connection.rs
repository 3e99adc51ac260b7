// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection resilience scenarios.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn heartbeat_failure_reconnects_exactly_once() {
    let s = Scenario::start("abc1", pool_of(1)).await;
    s.transport.set_fail_sends(true);

    sleep_ms(30_500).await;
    assert_eq!(s.agent.connection().state(), ConnectionState::Offline);
    s.transport.set_fail_sends(false);

    sleep_ms(9_000).await;
    assert_eq!(s.transport.connect_count(), 1);
    sleep_ms(1_000).await;
    assert_eq!(s.transport.connect_count(), 2);
    assert_eq!(s.agent.connection().state(), ConnectionState::Online);

    sleep_ms(60_000).await;
    assert_eq!(s.transport.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn repeated_force_reconnect_does_not_stack() {
    let s = Scenario::start("abc1", pool_of(1)).await;

    for _ in 0..5 {
        s.agent.on_force_reconnect().await;
        sleep_ms(200).await;
    }
    sleep_ms(5_000).await;

    assert_eq!(s.transport.connect_count(), 2);
    assert_eq!(s.agent.connection().state(), ConnectionState::Online);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_is_restored() {
    let s = Scenario::start("abc1", pool_of(1)).await;
    s.transport.emit(tf_adapters::TransportEvent::Closed { clean: false }).await;
    sleep_ms(100).await;
    assert!(!s.agent.status().is_connected);

    sleep_ms(3_000).await;
    assert!(s.agent.status().is_connected);
    assert_eq!(s.transport.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn unreachable_server_ends_in_error() {
    let transport = FakeTransport::persistent();
    transport.fail_connects(usize::MAX);
    let mut config = pool_of(1);
    config.connection.max_connect_attempts = 3;
    let s = Scenario::start_with(transport, "abc1", config).await;

    sleep_ms(60_000).await;
    let status = s.agent.status();
    assert_eq!(status.connection_status, ConnectionState::Error);
    assert!(!status.is_connected);
    assert_eq!(s.store.value(keys::CONNECTION_STATUS), Some(json!("error")));
}

#[tokio::test(start_paused = true)]
async fn polling_agent_pulls_and_runs_jobs() {
    let transport = FakeTransport::polling();
    let payload = JobAssignment {
        job_id: JobId::new("p1"),
        query: "노트북".to_string(),
        options: JobOptions::default(),
    };
    transport.push_pending(vec![payload]);
    let s = Scenario::start_with(transport, "abc1", pool_of(1)).await;

    sleep_ms(2_000).await;
    let results = s.results();
    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert!(!s.transport.heartbeats().is_empty());
}
