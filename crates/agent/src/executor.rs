// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs one job against one resource.
//!
//! The work future races the job timeout and the job's cancellation token in
//! a single task. Whoever finishes first tries to take the registry entry;
//! only a successful take reports. The executing task always releases the
//! resource exactly once.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tf_adapters::{HostError, ResourceHost};
use tf_core::{Job, JobId, JobOutcome, LoadStatus, ResourceId, StatsCounter, REASON_TIMEOUT};
use tf_wire::ResourceRequest;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pool::ResourcePool;
use crate::registry::JobRegistry;

/// Receives terminal outcomes. Must not block.
pub trait ResultSink: Send + Sync + 'static {
    fn report(&self, job_id: &JobId, outcome: &JobOutcome);
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Prefix the url-encoded query is appended to.
    pub search_url: String,
    pub ready_poll_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            search_url: crate::env::DEFAULT_SEARCH_URL.to_string(),
            ready_poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_millis(200),
        }
    }
}

impl ExecutorConfig {
    tf_core::setters! {
        into { search_url: String }
        set { ready_poll_interval: Duration, settle_delay: Duration }
    }
}

#[derive(Debug, Error)]
enum ExecError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("{0}")]
    Collect(String),
}

pub struct JobExecutor {
    host: Arc<dyn ResourceHost>,
    pool: Arc<ResourcePool>,
    registry: Arc<JobRegistry>,
    sink: Arc<dyn ResultSink>,
    stats: StatsCounter,
    config: ExecutorConfig,
}

impl JobExecutor {
    pub fn new(
        host: Arc<dyn ResourceHost>,
        pool: Arc<ResourcePool>,
        registry: Arc<JobRegistry>,
        sink: Arc<dyn ResultSink>,
        stats: StatsCounter,
        config: ExecutorConfig,
    ) -> Self {
        Self { host, pool, registry, sink, stats, config }
    }

    pub fn search_url(&self, query: &str) -> String {
        format!("{}{}", self.config.search_url, urlencoding::encode(query))
    }

    /// Run `job` on `resource` until it completes, times out or is cancelled.
    pub async fn execute(&self, job: Job, resource: ResourceId, token: CancellationToken) {
        let started = Instant::now();
        let elapsed_ms = || started.elapsed().as_millis() as u64;

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            _ = tokio::time::sleep(job.timeout()) => {
                Some(JobOutcome::failure(REASON_TIMEOUT, elapsed_ms()))
            }
            result = self.work(&job, &resource) => Some(match result {
                Ok(data) => JobOutcome::Success { data, processing_ms: elapsed_ms() },
                Err(e) => JobOutcome::failure(e.to_string(), elapsed_ms()),
            }),
        };

        match outcome {
            Some(outcome) => {
                self.complete(&job.id, outcome);
            }
            None => debug!(job_id = %job.id, "job cancelled, not reporting"),
        }
        self.pool.release(&resource).await;
    }

    /// Decide a job's terminal outcome. Returns false if someone else already did.
    pub fn complete(&self, job_id: &JobId, outcome: JobOutcome) -> bool {
        let Some(mut job) = self.registry.remove(job_id) else {
            debug!(job_id = %job_id, "outcome already decided, dropping");
            return false;
        };
        job.finish(&outcome);
        self.stats.record_outcome(outcome.is_success());
        match outcome.error() {
            None => info!(job_id = %job_id, ms = outcome.processing_ms(), "job completed"),
            Some(error) => warn!(job_id = %job_id, ms = outcome.processing_ms(), error, "job failed"),
        }
        self.sink.report(job_id, &outcome);
        true
    }

    async fn work(&self, job: &Job, resource: &ResourceId) -> Result<Value, ExecError> {
        let url = self.search_url(&job.query);
        debug!(job_id = %job.id, resource = %resource, %url, "navigating");
        self.host.navigate(resource, &url).await?;

        self.wait_ready(resource).await;
        tokio::time::sleep(self.config.settle_delay).await;

        let request = ResourceRequest::CollectPageData { job_id: job.id.clone() };
        let response = self.host.send(resource, &request).await?;
        match (response.success, response.data) {
            (true, data) => Ok(data.unwrap_or(serde_json::Value::Null)),
            (false, _) => Err(ExecError::Collect(
                response.error.unwrap_or_else(|| "page data collection failed".to_string()),
            )),
        }
    }

    /// Poll load status until complete. A failed status query ends the wait.
    async fn wait_ready(&self, resource: &ResourceId) {
        loop {
            match self.host.get(resource).await {
                Ok(info) if info.status == LoadStatus::Complete => return,
                Ok(_) => tokio::time::sleep(self.config.ready_poll_interval).await,
                Err(e) => {
                    debug!(resource = %resource, error = %e, "status query failed, proceeding");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
