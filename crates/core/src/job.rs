// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crawl job model.
//!
//! A job is one search query leased from the server. It lives in the
//! registry from assignment until its terminal outcome is decided.

use crate::id::{JobId, ResourceId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied when the server doesn't send one.
pub const DEFAULT_JOB_TIMEOUT_MS: u64 = 30_000;

/// Failure reason reported when the job timer fires first.
pub const REASON_TIMEOUT: &str = "timeout";
/// Failure reason reported when every pooled resource is busy.
pub const REASON_NO_RESOURCE: &str = "no resource available";
/// Failure reason reported for in-flight jobs abandoned by an identity change.
pub const REASON_CANCELLED: &str = "cancelled";

/// Per-job options sent by the server.
///
/// Only the timeout is interpreted; everything else is preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default, alias = "timeoutMs", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl JobOptions {
    pub fn with_timeout_ms(ms: u64) -> Self {
        Self { timeout: Some(ms), extra: Default::default() }
    }

    /// Effective timeout; zero or missing falls back to the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Duration::from_millis(DEFAULT_JOB_TIMEOUT_MS),
        }
    }
}

/// Lifecycle of a job inside this agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Assigned,
    Executing,
    Completed,
    Failed,
}

crate::simple_display! {
    JobStatus {
        Assigned => "assigned",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
    }
}

/// An in-flight crawl job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub query: String,
    pub options: JobOptions,
    pub status: JobStatus,
    pub started_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceId>,
}

impl Job {
    pub fn new(id: JobId, query: impl Into<String>, options: JobOptions, started_at_ms: u64) -> Self {
        Self {
            id,
            query: query.into(),
            options,
            status: JobStatus::Assigned,
            started_at_ms,
            resource: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.options.timeout()
    }

    /// Bind the job to a resource and mark it executing.
    pub fn begin(&mut self, resource: ResourceId) {
        self.resource = Some(resource);
        self.status = JobStatus::Executing;
    }

    pub fn finish(&mut self, outcome: &JobOutcome) {
        self.status =
            if outcome.is_success() { JobStatus::Completed } else { JobStatus::Failed };
    }
}

/// Terminal result of a job, as reported to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success { data: serde_json::Value, processing_ms: u64 },
    Failure { error: String, processing_ms: u64 },
}

impl JobOutcome {
    pub fn failure(error: impl Into<String>, processing_ms: u64) -> Self {
        JobOutcome::Failure { error: error.into(), processing_ms }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn processing_ms(&self) -> u64 {
        match self {
            JobOutcome::Success { processing_ms, .. } | JobOutcome::Failure { processing_ms, .. } => {
                *processing_ms
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobOutcome::Failure { error, .. } => Some(error),
            JobOutcome::Success { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
