// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource pool scenarios.

use crate::prelude::*;
use tf_core::ResourceId;

#[tokio::test(start_paused = true)]
async fn pool_converges_after_external_destruction() {
    let s = Scenario::start("abc1", pool_of(3)).await;
    s.host.kill(&ResourceId::new("1"));
    s.host.kill(&ResourceId::new("3"));

    sleep_ms(10_500).await;
    let pool = s.agent.status().pool;
    assert_eq!((pool.total, pool.idle), (3, 3));
    assert!(!s.agent.pool().ids().contains(&ResourceId::new("1")));
}

#[tokio::test(start_paused = true)]
async fn failed_creation_shrinks_then_recovers() {
    let s = Scenario::start("abc1", pool_of(2)).await;
    s.host.set_fail_creates(true);
    s.host.kill(&ResourceId::new("2"));

    sleep_ms(10_500).await;
    assert_eq!(s.agent.pool().len(), 1);

    s.host.set_fail_creates(false);
    sleep_ms(10_000).await;
    assert_eq!(s.agent.pool().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn released_resource_is_reset_before_reuse() {
    let s = Scenario::start("abc1", pool_of(1)).await;

    s.assign("j1", "a", None).await;
    sleep_ms(1_000).await;
    s.assign("j2", "b", None).await;
    sleep_ms(1_000).await;

    assert_eq!(s.results().iter().filter(|r| r.success).count(), 2);
    let urls: Vec<String> = s.host.navigations().into_iter().map(|(_, url)| url).collect();
    assert_eq!(urls.len(), 4);
    assert!(urls[0].ends_with("query=a"));
    assert_eq!(urls[1], "about:blank");
    assert!(urls[2].ends_with("query=b"));
    assert_eq!(urls[3], "about:blank");
}
