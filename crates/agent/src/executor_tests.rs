// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use tf_adapters::{FakeHost, HostCall, MemoryStore};
use tf_core::test_support::{job, job_with_timeout};
use tf_core::{ResourceStatus, REASON_NO_RESOURCE};
use tf_wire::ResourceResponse;

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<(JobId, JobOutcome)>>,
}

impl ResultSink for RecordingSink {
    fn report(&self, job_id: &JobId, outcome: &JobOutcome) {
        self.reports.lock().push((job_id.clone(), outcome.clone()));
    }
}

struct Harness {
    host: FakeHost,
    pool: Arc<ResourcePool>,
    registry: Arc<JobRegistry>,
    sink: Arc<RecordingSink>,
    stats: StatsCounter,
    executor: Arc<JobExecutor>,
}

async fn harness(pool_size: usize) -> Harness {
    let host = FakeHost::new();
    let pool = Arc::new(ResourcePool::new(
        Arc::new(host.clone()),
        Arc::new(MemoryStore::new()),
        pool_size,
    ));
    pool.initialize().await;
    let registry = Arc::new(JobRegistry::new());
    let sink = Arc::new(RecordingSink::default());
    let stats = StatsCounter::new();
    let executor = Arc::new(JobExecutor::new(
        Arc::new(host.clone()),
        Arc::clone(&pool),
        Arc::clone(&registry),
        sink.clone(),
        stats.clone(),
        ExecutorConfig {
            search_url: "https://shop.example/search?query=".to_string(),
            ..ExecutorConfig::default()
        },
    ));
    Harness { host, pool, registry, sink, stats, executor }
}

impl Harness {
    /// Register `job`, claim a resource and start executing it.
    async fn start(&self, job: Job) -> tokio::task::JoinHandle<()> {
        let token = self.registry.insert(job.clone()).unwrap();
        let resource = self.pool.acquire(&job.id).await.unwrap();
        let job = self.registry.update(&job.id, |j| j.begin(resource.clone())).unwrap();
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move { executor.execute(job, resource, token).await })
    }

    fn reports(&self) -> Vec<(JobId, JobOutcome)> {
        self.sink.reports.lock().clone()
    }
}

#[test]
fn search_url_encodes_query() {
    let config = ExecutorConfig { search_url: "https://s.example/?q=".into(), ..Default::default() };
    let host: Arc<dyn ResourceHost> = Arc::new(FakeHost::new());
    let store = Arc::new(MemoryStore::new());
    let pool = Arc::new(ResourcePool::new(Arc::clone(&host), store, 1));
    let executor = JobExecutor::new(
        host,
        pool,
        Arc::new(JobRegistry::new()),
        Arc::new(RecordingSink::default()),
        StatsCounter::new(),
        config,
    );
    assert_eq!(executor.search_url("게이밍 노트북"), "https://s.example/?q=%EA%B2%8C%EC%9D%B4%EB%B0%8D%20%EB%85%B8%ED%8A%B8%EB%B6%81");
}

#[tokio::test(start_paused = true)]
async fn successful_job_reports_once_and_releases() {
    let h = harness(1).await;
    h.host.set_response(ResourceResponse::ok(serde_json::json!({"items": [1, 2]})));

    h.start(job("j1", "노트북")).await.await.unwrap();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    let (id, outcome) = &reports[0];
    assert_eq!(id, &JobId::new("j1"));
    assert_eq!(
        outcome,
        &JobOutcome::Success { data: serde_json::json!({"items": [1, 2]}), processing_ms: 200 }
    );
    assert!(h.registry.is_empty());
    assert_eq!(h.pool.stats().idle, 1);
    assert_eq!(h.stats.snapshot().completed_jobs, 1);

    let navigations = h.host.navigations();
    assert_eq!(navigations[0].1, "https://shop.example/search?query=%EB%85%B8%ED%8A%B8%EB%B6%81");
    assert_eq!(navigations.last().unwrap().1, tf_core::BLANK_URL);
}

#[tokio::test(start_paused = true)]
async fn waits_for_page_load_before_collecting() {
    let h = harness(1).await;
    h.host.set_settle_loading(true);

    let handle = h.start(job("j1", "q")).await;
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    let sends = |host: &FakeHost| {
        host.calls().iter().filter(|c| matches!(c, HostCall::Send { .. })).count()
    };
    assert_eq!(sends(&h.host), 0);

    h.host.finish_loading(&ResourceId::new("1"));
    handle.await.unwrap();
    assert_eq!(sends(&h.host), 1);
    assert!(h.reports()[0].1.is_success());
}

#[tokio::test(start_paused = true)]
async fn timeout_reports_exactly_once() {
    let h = harness(1).await;
    h.host.set_settle_loading(true);

    h.start(job_with_timeout("slow", "q", 100)).await.await.unwrap();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].1, JobOutcome::failure(REASON_TIMEOUT, 100));
    assert_eq!(h.pool.slots()[0].status, ResourceStatus::Idle);
    assert_eq!(h.stats.snapshot().failed_jobs, 1);
}

#[tokio::test(start_paused = true)]
async fn late_completion_after_timeout_is_silent() {
    let h = harness(1).await;
    h.host.set_send_delay(Duration::from_millis(500));

    h.start(job_with_timeout("j1", "q", 300)).await.await.unwrap();

    // The work future was dropped at the timeout; nothing else reports.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.reports().len(), 1);
    assert_eq!(h.reports()[0].1.error(), Some("timeout"));
}

#[tokio::test(start_paused = true)]
async fn cancellation_releases_without_reporting() {
    let h = harness(1).await;
    h.host.set_settle_loading(true);

    let handle = h.start(job("j1", "q")).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.registry.cancel(&JobId::new("j1")).is_some());
    handle.await.unwrap();

    assert!(h.reports().is_empty());
    assert_eq!(h.pool.stats().idle, 1);
}

#[tokio::test(start_paused = true)]
async fn collector_failure_is_job_failure() {
    let h = harness(1).await;
    h.host.set_response(ResourceResponse::failed("selector not found"));

    h.start(job("j1", "q")).await.await.unwrap();
    assert_eq!(h.reports()[0].1.error(), Some("selector not found"));
}

#[tokio::test(start_paused = true)]
async fn success_without_data_reports_null_payload() {
    let h = harness(1).await;
    h.host.set_response(ResourceResponse { success: true, data: None, error: None });

    h.start(job("j1", "q")).await.await.unwrap();
    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1.is_success());
    match &reports[0].1 {
        JobOutcome::Success { data, .. } => assert_eq!(data, &serde_json::Value::Null),
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(h.stats.snapshot().completed_jobs, 1);
}

#[tokio::test(start_paused = true)]
async fn resource_vanishing_mid_job_fails_it() {
    let h = harness(1).await;
    h.host.set_send_delay(Duration::from_millis(10));
    let handle = h.start(job("j1", "q")).await;
    tokio::task::yield_now().await;
    h.host.kill(&ResourceId::new("1"));
    handle.await.unwrap();

    let reports = h.reports();
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].1.is_success());
}

#[test]
fn complete_is_gated_by_registry() {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let h = rt.block_on(harness(1));
    h.registry.insert(job("j1", "q"));

    assert!(h.executor.complete(&JobId::new("j1"), JobOutcome::failure(REASON_NO_RESOURCE, 0)));
    assert!(!h.executor.complete(&JobId::new("j1"), JobOutcome::failure(REASON_TIMEOUT, 1)));
    assert_eq!(h.reports().len(), 1);
    assert_eq!(h.stats.snapshot().failed_jobs, 1);
}
