// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-size pool of reusable resources.
//!
//! Slots are claimed under the pool lock before any host round-trip, so two
//! jobs can never hold the same resource. Defunct handles are replaced in
//! place; a pool that falls below target is topped up by the health check.

use std::sync::Arc;

use parking_lot::Mutex;
use tf_adapters::{HostError, KvStore, ResourceHost, StoreMap};
use tf_core::{JobId, PoolStats, ResourceId, ResourceStatus, BLANK_URL};
use tracing::{debug, info, warn};

use crate::keys;

/// One pooled resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub id: ResourceId,
    pub status: ResourceStatus,
    pub job: Option<JobId>,
    pub placement: Option<String>,
}

impl Slot {
    fn idle(id: ResourceId, placement: Option<String>) -> Self {
        Self { id, status: ResourceStatus::Idle, job: None, placement }
    }
}

pub struct ResourcePool {
    host: Arc<dyn ResourceHost>,
    store: Arc<dyn KvStore>,
    target: usize,
    slots: Mutex<Vec<Slot>>,
    /// Serializes initialize/health passes so concurrent top-ups can't overshoot.
    maintenance: tokio::sync::Mutex<()>,
}

impl ResourcePool {
    pub fn new(host: Arc<dyn ResourceHost>, store: Arc<dyn KvStore>, target: usize) -> Self {
        Self {
            host,
            store,
            target,
            slots: Mutex::new(Vec::new()),
            maintenance: tokio::sync::Mutex::new(()),
        }
    }

    /// Reclaim persisted blank resources, create the shortfall, persist ids.
    /// Returns the resulting pool size.
    pub async fn initialize(&self) -> usize {
        let _guard = self.maintenance.lock().await;

        for id in self.stored_ids().await {
            if self.len() >= self.target {
                break;
            }
            if self.contains(&id) {
                continue;
            }
            match self.host.get(&id).await {
                Ok(info) if info.is_blank() => {
                    debug!(resource = %id, "reclaimed resource");
                    self.slots.lock().push(Slot::idle(info.id, info.placement));
                }
                Ok(info) => debug!(resource = %id, url = %info.url, "stored resource not blank, skipping"),
                Err(e) => debug!(resource = %id, error = %e, "stored resource unavailable, skipping"),
            }
        }

        self.fill().await;
        self.persist().await;

        let size = self.len();
        info!(size, target = self.target, "resource pool initialized");
        size
    }

    /// Claim an idle resource for `job_id`. `None` means the pool is exhausted.
    pub async fn acquire(&self, job_id: &JobId) -> Option<ResourceId> {
        // Each pass either returns or replaces a dead slot; bound the retries
        // so a host that only hands out dead resources can't spin us.
        for _ in 0..=self.target.max(1) * 2 {
            let (id, placement) = {
                let mut slots = self.slots.lock();
                let slot = slots.iter_mut().find(|s| s.status == ResourceStatus::Idle)?;
                slot.status = ResourceStatus::Busy;
                slot.job = Some(job_id.clone());
                (slot.id.clone(), slot.placement.clone())
            };

            if !self.is_defunct(&id).await {
                debug!(resource = %id, job_id = %job_id, "resource acquired");
                return Some(id);
            }

            warn!(resource = %id, "resource is gone, replacing");
            self.replace(&id, placement).await;
        }
        None
    }

    /// Return a resource to the pool, parked on the blank page.
    /// Unknown ids are ignored.
    pub async fn release(&self, id: &ResourceId) {
        if !self.contains(id) {
            debug!(resource = %id, "release of unknown resource ignored");
            return;
        }
        if let Err(e) = self.host.navigate(id, BLANK_URL).await {
            debug!(resource = %id, error = %e, "failed to reset resource");
        }
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|s| &s.id == id) {
            slot.status = ResourceStatus::Idle;
            slot.job = None;
        }
    }

    /// Evict dead resources (busy ones included) and top the pool back up.
    pub async fn check_health(&self) {
        let _guard = self.maintenance.lock().await;

        let mut dead = Vec::new();
        for id in self.ids() {
            if self.is_defunct(&id).await {
                dead.push(id);
            }
        }
        if !dead.is_empty() {
            self.slots.lock().retain(|s| !dead.contains(&s.id));
            warn!(evicted = dead.len(), "evicted dead resources");
        }

        let before = self.len();
        self.fill().await;
        if !dead.is_empty() || self.len() != before {
            self.persist().await;
        }
    }

    /// Forget every slot and the persisted id list. Resources stay on the host.
    pub async fn clear(&self) {
        self.slots.lock().clear();
        if let Err(e) = self.store.remove(&[keys::RESOURCE_POOL_IDS]).await {
            warn!(error = %e, "failed to clear persisted resource ids");
        }
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.slots.lock();
        let busy = slots.iter().filter(|s| s.status == ResourceStatus::Busy).count();
        PoolStats { target: self.target, total: slots.len(), idle: slots.len() - busy, busy }
    }

    pub fn slots(&self) -> Vec<Slot> {
        self.slots.lock().clone()
    }

    pub fn ids(&self) -> Vec<ResourceId> {
        self.slots.lock().iter().map(|s| s.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    pub fn target(&self) -> usize {
        self.target
    }

    fn contains(&self, id: &ResourceId) -> bool {
        self.slots.lock().iter().any(|s| &s.id == id)
    }

    /// Only a definite "not found" counts; transient host errors don't evict.
    async fn is_defunct(&self, id: &ResourceId) -> bool {
        match self.host.get(id).await {
            Ok(_) => false,
            Err(HostError::NotFound(_)) => true,
            Err(e) => {
                debug!(resource = %id, error = %e, "resource status unknown");
                false
            }
        }
    }

    /// Swap a dead slot for a fresh resource in the same position and placement.
    /// The slot is dropped if creation fails.
    async fn replace(&self, old: &ResourceId, placement: Option<String>) {
        let created = self.host.create(placement.as_deref()).await;
        {
            let mut slots = self.slots.lock();
            let Some(pos) = slots.iter().position(|s| &s.id == old) else {
                return;
            };
            match created {
                Ok(info) => {
                    info!(old = %old, new = %info.id, "resource replaced");
                    slots[pos] = Slot::idle(info.id, info.placement.or(placement));
                }
                Err(e) => {
                    warn!(resource = %old, error = %e, "replacement failed, pool shrinks");
                    slots.remove(pos);
                }
            }
        }
        self.persist().await;
    }

    async fn fill(&self) {
        if self.len() >= self.target {
            return;
        }
        let placement = match self.host.default_placement().await {
            Ok(placement) => placement,
            Err(e) => {
                debug!(error = %e, "no default placement");
                None
            }
        };
        while self.len() < self.target {
            match self.host.create(placement.as_deref()).await {
                Ok(info) => {
                    debug!(resource = %info.id, "resource created");
                    self.slots.lock().push(Slot::idle(info.id, info.placement));
                }
                Err(e) => {
                    warn!(error = %e, size = self.len(), target = self.target, "resource creation failed");
                    break;
                }
            }
        }
    }

    async fn stored_ids(&self) -> Vec<ResourceId> {
        match self.store.get(&[keys::RESOURCE_POOL_IDS]).await {
            Ok(map) => map
                .get(keys::RESOURCE_POOL_IDS)
                .cloned()
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to read persisted resource ids");
                Vec::new()
            }
        }
    }

    async fn persist(&self) {
        let mut entries = StoreMap::new();
        entries.insert(keys::RESOURCE_POOL_IDS.to_string(), serde_json::json!(self.ids()));
        if let Err(e) = self.store.set(entries).await {
            warn!(error = %e, "failed to persist resource ids");
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
