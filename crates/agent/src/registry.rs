// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-flight job registry.
//!
//! The registry is the single source of truth for whether a job is still
//! live. [`JobRegistry::remove`] is the exactly-once gate: whichever path
//! (completion, timeout, cancellation) removes the entry first owns the
//! terminal outcome; everyone else gets `None` and stays silent.

use std::collections::HashMap;

use parking_lot::Mutex;
use tf_core::{Job, JobId};
use tokio_util::sync::CancellationToken;

struct Entry {
    job: Job,
    token: CancellationToken,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Entry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Returns its cancellation token, or `None` if the id
    /// is already live.
    pub fn insert(&self, job: Job) -> Option<CancellationToken> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.id) {
            return None;
        }
        let token = CancellationToken::new();
        jobs.insert(job.id.clone(), Entry { job, token: token.clone() });
        Some(token)
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.lock().contains_key(id)
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().get(id).map(|e| e.job.clone())
    }

    /// Mutate a live job in place, returning the updated copy.
    pub fn update(&self, id: &JobId, f: impl FnOnce(&mut Job)) -> Option<Job> {
        let mut jobs = self.jobs.lock();
        let entry = jobs.get_mut(id)?;
        f(&mut entry.job);
        Some(entry.job.clone())
    }

    /// Atomically take the entry. Idempotent: later calls return `None`.
    pub fn remove(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().remove(id).map(|e| e.job)
    }

    /// Remove the entry and fire its token so the executor stands down.
    pub fn cancel(&self, id: &JobId) -> Option<Job> {
        let entry = self.jobs.lock().remove(id)?;
        entry.token.cancel();
        Some(entry.job)
    }

    /// Remove and cancel every live job.
    pub fn drain(&self) -> Vec<Job> {
        let entries: Vec<Entry> = self.jobs.lock().drain().map(|(_, e)| e).collect();
        let mut jobs: Vec<Job> = entries
            .into_iter()
            .map(|e| {
                e.token.cancel();
                e.job
            })
            .collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Live job ids, sorted.
    pub fn ids(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Live jobs, sorted by id.
    pub fn snapshot(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.lock().values().map(|e| e.job.clone()).collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
