// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity change scenarios.

use crate::prelude::*;

async fn two_jobs_in_flight(config: CoordinatorConfig) -> Scenario {
    let s = Scenario::start("abc1", config).await;
    s.host.set_send_delay(Duration::from_secs(10));
    s.assign("j1", "a", None).await;
    s.assign("j2", "b", None).await;
    sleep_ms(100).await;
    assert_eq!(s.agent.status().current_jobs, 2);
    s
}

#[tokio::test(start_paused = true)]
async fn identity_change_drops_in_flight_jobs() {
    let s = two_jobs_in_flight(pool_of(3)).await;

    let identity = Identity::adopt(AgentId::new("alias_xy12"));
    s.agent.on_identity_change_requested(identity).await;
    sleep_ms(15_000).await;

    assert!(s.results().is_empty());
    assert_eq!(s.transport.deleted(), vec![AgentId::new("abc1")]);
    assert_eq!(s.transport.connects(), vec![AgentId::new("abc1"), AgentId::new("alias_xy12")]);

    let status = s.agent.status();
    assert_eq!(status.agent_id, AgentId::new("alias_xy12"));
    assert_eq!(status.alias, "alias");
    assert_eq!(status.statistics, Statistics::default());
    assert_eq!(status.current_jobs, 0);
    assert_eq!(status.pool.idle, 3);
    assert_eq!(s.store.value(keys::AGENT_ID), Some(json!("alias_xy12")));
    assert_eq!(s.store.value(keys::STATISTICS), Some(json!({"totalJobs": 0, "completedJobs": 0, "failedJobs": 0})));
}

#[tokio::test(start_paused = true)]
async fn identity_change_can_report_abandoned_jobs() {
    let config = CoordinatorConfig { inflight_policy: InFlightPolicy::ReportCancelled, ..pool_of(3) };
    let s = two_jobs_in_flight(config).await;

    s.agent.on_identity_change_requested(Identity::adopt(AgentId::new("alias_xy12"))).await;
    sleep_ms(15_000).await;

    let reports: Vec<(AgentId, JobReport)> = s
        .transport
        .sent()
        .into_iter()
        .filter_map(|m| match m {
            AgentMessage::JobResult { agent_id, payload } => Some((agent_id, payload)),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|(id, r)| id == &AgentId::new("abc1") && r.error.as_deref() == Some("cancelled")));
    assert_eq!(s.agent.status().statistics, Statistics::default());
}

#[tokio::test(start_paused = true)]
async fn heartbeats_switch_to_the_new_identity() {
    let s = Scenario::start("abc1", pool_of(1)).await;
    s.agent.on_alias_updated("shop").await;
    let new_id = s.agent.agent_id();
    assert!(new_id.starts_with("shop_"));

    sleep_ms(31_000).await;
    match s.transport.heartbeats().last() {
        Some(AgentMessage::Heartbeat { agent_id, .. }) => assert_eq!(agent_id, &new_id),
        other => panic!("expected a heartbeat, got {other:?}"),
    }
}
