// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution scenarios.

use crate::prelude::*;

#[tokio::test(start_paused = true)]
async fn three_jobs_on_three_resources_all_succeed() {
    let s = Scenario::start("abc1", pool_of(3)).await;
    s.host.set_send_delay(Duration::from_millis(1_800));

    for id in ["j1", "j2", "j3"] {
        s.assign(id, "노트북", Some(30_000)).await;
    }
    sleep_ms(2_500).await;

    let results = s.results();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.success && r.error.is_none()));
    assert!(results.iter().all(|r| r.processing_time == 2_000));
    let status = s.agent.status();
    assert_eq!(status.pool.idle, 3);
    assert_eq!(status.statistics, Statistics { total_jobs: 3, completed_jobs: 3, failed_jobs: 0 });
}

#[tokio::test(start_paused = true)]
async fn never_ready_resource_times_out_once() {
    let s = Scenario::start("abc1", pool_of(1)).await;
    s.host.set_settle_loading(true);

    s.assign("j1", "노트북", Some(100)).await;
    sleep_ms(5_000).await;

    let results = s.results();
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].error.as_deref(), Some("timeout"));
    assert_eq!(results[0].processing_time, 100);
    assert_eq!(s.agent.status().pool.idle, 1);
}

#[tokio::test(start_paused = true)]
async fn completion_after_timeout_is_not_reported_again() {
    let s = Scenario::start("abc1", pool_of(1)).await;
    s.host.set_send_delay(Duration::from_millis(500));

    s.assign("j1", "노트북", Some(300)).await;
    sleep_ms(2_000).await;

    let results = s.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].error.as_deref(), Some("timeout"));
    assert_eq!(s.agent.status().statistics.failed_jobs, 1);
}

#[tokio::test(start_paused = true)]
async fn extra_job_fails_without_blocking_the_rest() {
    let s = Scenario::start("abc1", pool_of(2)).await;
    s.host.set_send_delay(Duration::from_secs(1));

    for id in ["j1", "j2", "j3"] {
        s.assign(id, "q", None).await;
    }
    sleep_ms(50).await;
    let early = s.results();
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].job_id, JobId::new("j3"));
    assert_eq!(early[0].error.as_deref(), Some("no resource available"));
    assert_eq!(early[0].processing_time, 0);

    sleep_ms(2_000).await;
    let done: Vec<_> = s.results().into_iter().filter(|r| r.success).map(|r| r.job_id).collect();
    assert_eq!(done.len(), 2);
    assert!(done.contains(&JobId::new("j1")) && done.contains(&JobId::new("j2")));
}

#[tokio::test(start_paused = true)]
async fn server_cancellation_suppresses_the_report() {
    let s = Scenario::start("abc1", pool_of(1)).await;
    s.host.set_send_delay(Duration::from_secs(2));

    s.assign("j1", "q", None).await;
    sleep_ms(100).await;
    let payload = tf_wire::JobCancellation { job_id: JobId::new("j1"), reason: None };
    s.transport.emit_message(ServerMessage::JobCancelled { payload }).await;
    sleep_ms(5_000).await;

    assert!(s.results().is_empty());
    assert_eq!(s.agent.status().pool.idle, 1);
    assert_eq!(s.store.value(keys::CURRENT_JOBS), Some(json!([])));
}
