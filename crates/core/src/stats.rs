// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide job counters.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Snapshot of the job counters, in the shape heartbeats carry them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
}

/// Shared, cloneable counters. Only an identity change resets them.
#[derive(Debug, Clone, Default)]
pub struct StatsCounter {
    inner: Arc<Mutex<Statistics>>,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_assigned(&self) {
        self.inner.lock().total_jobs += 1;
    }

    pub fn record_outcome(&self, success: bool) {
        let mut stats = self.inner.lock();
        if success {
            stats.completed_jobs += 1;
        } else {
            stats.failed_jobs += 1;
        }
    }

    pub fn snapshot(&self) -> Statistics {
        *self.inner.lock()
    }

    pub fn reset(&self) {
        *self.inner.lock() = Statistics::default();
    }
}
