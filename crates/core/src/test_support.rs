// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Job, JobId, JobOptions, LoadStatus, ResourceId, ResourceInfo};

/// A freshly assigned job with the default timeout.
pub fn job(id: &str, query: &str) -> Job {
    Job::new(JobId::new(id), query, JobOptions::default(), 0)
}

/// A freshly assigned job with an explicit timeout.
pub fn job_with_timeout(id: &str, query: &str, timeout_ms: u64) -> Job {
    Job::new(JobId::new(id), query, JobOptions::with_timeout_ms(timeout_ms), 0)
}

/// A blank, fully loaded resource in the given placement.
pub fn blank_resource(id: &str, placement: Option<&str>) -> ResourceInfo {
    ResourceInfo {
        id: ResourceId::new(id),
        placement: placement.map(str::to_string),
        url: crate::BLANK_URL.to_string(),
        status: LoadStatus::Complete,
    }
}
