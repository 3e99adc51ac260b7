// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent coordinator.
//!
//! Owns the registry, pool, executor and connection for one agent and routes
//! server messages and control commands between them. Constructed once with
//! injected collaborators; there is no process-global state.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tf_adapters::{KvStore, ResourceHost, StoreError, StoreMap, Transport};
use tf_core::{
    AgentId, Clock, Identity, Job, JobId, JobOutcome, StatsCounter, REASON_CANCELLED,
    REASON_NO_RESOURCE,
};
use tf_wire::{AgentStatus, JobAssignment, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ConnectionConfig, ConnectionDeps, ConnectionManager};
use crate::executor::{ExecutorConfig, JobExecutor};
use crate::keys;
use crate::pool::ResourcePool;
use crate::registry::JobRegistry;

/// What happens to in-flight jobs when the identity changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InFlightPolicy {
    /// Forget them without reporting.
    #[default]
    Drop,
    /// Report each as failed with `"cancelled"` under the old identity.
    ReportCancelled,
}

impl FromStr for InFlightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(InFlightPolicy::Drop),
            "report-cancelled" | "report_cancelled" => Ok(InFlightPolicy::ReportCancelled),
            other => Err(format!("unknown in-flight policy: {other}")),
        }
    }
}

/// Result of handling one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Started,
    /// Missing id or query; dropped without a report.
    Invalid,
    /// Id already in flight; ignored.
    Duplicate,
    /// Pool exhausted; failed immediately.
    NoResource,
    /// Cancelled between registration and dispatch.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub pool_size: usize,
    /// Applied to assignments that carry no timeout.
    pub job_timeout_ms: u64,
    pub inflight_policy: InFlightPolicy,
    pub health_interval: Duration,
    pub keepalive_interval: Duration,
    pub executor: ExecutorConfig,
    pub connection: ConnectionConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            job_timeout_ms: tf_core::DEFAULT_JOB_TIMEOUT_MS,
            inflight_policy: InFlightPolicy::Drop,
            health_interval: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
            executor: ExecutorConfig::default(),
            connection: ConnectionConfig::default(),
        }
    }
}

/// External collaborators.
pub struct AgentDeps {
    pub transport: Arc<dyn Transport>,
    pub host: Arc<dyn ResourceHost>,
    pub store: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct AgentCoordinator {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    registry: Arc<JobRegistry>,
    pool: Arc<ResourcePool>,
    executor: Arc<JobExecutor>,
    connection: Arc<ConnectionManager>,
    stats: StatsCounter,
    config: CoordinatorConfig,
    alias: Mutex<String>,
    inbox: Mutex<Option<mpsc::Receiver<ServerMessage>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    identity_lock: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
}

impl AgentCoordinator {
    pub fn new(deps: AgentDeps, mut config: CoordinatorConfig, identity: Identity) -> Arc<Self> {
        let registry = Arc::new(JobRegistry::new());
        let stats = StatsCounter::new();
        let (inbox_tx, inbox_rx) = mpsc::channel(64);

        config.connection.max_concurrent_jobs = config.pool_size;
        let connection = ConnectionManager::new(
            ConnectionDeps {
                transport: deps.transport,
                store: Arc::clone(&deps.store),
                clock: Arc::clone(&deps.clock),
                registry: Arc::clone(&registry),
                stats: stats.clone(),
            },
            config.connection.clone(),
            identity.id,
            inbox_tx,
        );
        let pool = Arc::new(ResourcePool::new(
            Arc::clone(&deps.host),
            Arc::clone(&deps.store),
            config.pool_size,
        ));
        let executor = Arc::new(JobExecutor::new(
            deps.host,
            Arc::clone(&pool),
            Arc::clone(&registry),
            connection.clone(),
            stats.clone(),
            config.executor.clone(),
        ));

        Arc::new(Self {
            store: deps.store,
            clock: deps.clock,
            registry,
            pool,
            executor,
            connection,
            stats,
            config,
            alias: Mutex::new(identity.alias),
            inbox: Mutex::new(Some(inbox_rx)),
            tasks: Mutex::new(Vec::new()),
            identity_lock: tokio::sync::Mutex::new(()),
            shutdown: CancellationToken::new(),
        })
    }

    /// Fill the pool, start background duties and connect.
    pub async fn start(self: &Arc<Self>) {
        self.pool.initialize().await;
        self.connection.start();

        let mut tasks = Vec::new();
        if let Some(rx) = self.inbox.lock().take() {
            tasks.push(tokio::spawn(Arc::clone(self).run_inbox(rx)));
        }
        tasks.push(tokio::spawn(Arc::clone(self).health_loop()));
        tasks.push(tokio::spawn(Arc::clone(self).keepalive_loop()));
        self.tasks.lock().extend(tasks);

        self.persist_state().await;
        self.connection.connect().await;
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn agent_id(&self) -> AgentId {
        self.connection.agent_id()
    }

    pub fn alias(&self) -> String {
        self.alias.lock().clone()
    }

    pub async fn on_job_assigned(self: &Arc<Self>, assignment: JobAssignment) -> AssignOutcome {
        let JobAssignment { job_id, query, mut options } = assignment;
        if job_id.is_empty() || query.trim().is_empty() {
            warn!(job_id = %job_id, "invalid assignment, ignoring");
            return AssignOutcome::Invalid;
        }

        options.timeout = Some(options.timeout.filter(|ms| *ms > 0).unwrap_or(self.config.job_timeout_ms));
        let job = Job::new(job_id.clone(), query, options, self.clock.epoch_ms());
        let Some(token) = self.registry.insert(job) else {
            warn!(job_id = %job_id, "duplicate assignment, ignoring");
            return AssignOutcome::Duplicate;
        };
        self.stats.record_assigned();
        info!(job_id = %job_id, "job assigned");

        let Some(resource) = self.pool.acquire(&job_id).await else {
            warn!(job_id = %job_id, "no idle resource");
            self.executor.complete(&job_id, JobOutcome::failure(REASON_NO_RESOURCE, 0));
            self.persist_state().await;
            return AssignOutcome::NoResource;
        };

        let Some(job) = self.registry.update(&job_id, |job| job.begin(resource.clone())) else {
            debug!(job_id = %job_id, "job cancelled before dispatch");
            self.pool.release(&resource).await;
            return AssignOutcome::Cancelled;
        };

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.executor.execute(job, resource, token).await;
            this.persist_state().await;
        });
        self.persist_state().await;
        AssignOutcome::Started
    }

    /// Drop the job and cancel its execution. Nothing is reported.
    pub async fn on_job_cancelled(&self, job_id: &JobId, reason: Option<&str>) {
        match self.registry.cancel(job_id) {
            Some(_) => info!(job_id = %job_id, reason = reason.unwrap_or(""), "job cancelled"),
            None => debug!(job_id = %job_id, "cancellation for unknown job"),
        }
        self.persist_state().await;
    }

    /// Switch to `identity`: abandon in-flight jobs, retire the old id,
    /// reset statistics and reconnect.
    pub async fn on_identity_change_requested(self: &Arc<Self>, identity: Identity) {
        let _guard = self.identity_lock.lock().await;
        let old = self.connection.agent_id();
        info!(old = %old, new = %identity.id, "changing identity");

        self.connection.stop_ticker();
        for job in self.registry.drain() {
            match self.config.inflight_policy {
                InFlightPolicy::Drop => debug!(job_id = %job.id, "dropping in-flight job"),
                InFlightPolicy::ReportCancelled => {
                    let elapsed = self.clock.elapsed_ms(job.started_at_ms);
                    let outcome = JobOutcome::failure(REASON_CANCELLED, elapsed);
                    if let Err(e) = self.connection.send_result(&old, &job.id, &outcome).await {
                        warn!(job_id = %job.id, error = %e, "failed to report cancelled job");
                    }
                }
            }
        }

        self.connection.stop().await;
        if old != identity.id {
            self.connection.delete_identity(&old).await;
        }

        let mut entries = StoreMap::new();
        entries.insert(keys::AGENT_ID.to_string(), json!(identity.id));
        entries.insert(keys::AGENT_ALIAS.to_string(), json!(identity.alias));
        if let Err(e) = self.store.set(entries).await {
            warn!(error = %e, "failed to persist identity");
        }
        *self.alias.lock() = identity.alias;
        self.connection.set_agent_id(identity.id);
        self.stats.reset();
        self.persist_state().await;

        self.connection.connect().await;
    }

    /// Generate a fresh id for `alias` and switch to it.
    pub async fn on_alias_updated(self: &Arc<Self>, alias: &str) {
        let identity = Identity::generate(alias);
        info!(alias = %identity.alias, "alias updated");
        self.on_identity_change_requested(identity).await;
    }

    pub async fn on_force_reconnect(self: &Arc<Self>) {
        self.connection.force_reconnect().await;
    }

    /// Stop everything. Resources stay on the host; the persisted handle
    /// list is cleared.
    pub async fn on_shutdown(&self) {
        info!("shutting down agent");
        self.shutdown.cancel();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.connection.shutdown().await;
        let abandoned = self.registry.drain();
        if !abandoned.is_empty() {
            info!(jobs = abandoned.len(), "abandoned in-flight jobs");
        }
        self.pool.clear().await;
        self.persist_state().await;
    }

    pub fn status(&self) -> AgentStatus {
        let connection_status = self.connection.state();
        AgentStatus {
            agent_id: self.connection.agent_id(),
            alias: self.alias(),
            server_id: self.connection.server_id(),
            connection_status,
            is_connected: connection_status.is_online(),
            current_jobs: self.registry.len(),
            statistics: self.stats.snapshot(),
            pool: self.pool.stats(),
        }
    }

    /// Mirror agent state into the store for the status UI.
    pub async fn persist_state(&self) {
        let jobs: Vec<Value> =
            self.registry.snapshot().into_iter().map(|job| json!([job.id, job])).collect();
        let mut entries = StoreMap::new();
        entries.insert(keys::AGENT_ID.to_string(), json!(self.connection.agent_id()));
        entries.insert(keys::AGENT_ALIAS.to_string(), json!(self.alias()));
        entries.insert(keys::SERVER_ID.to_string(), json!(self.connection.server_id()));
        entries.insert(keys::IS_CONNECTED.to_string(), json!(self.connection.state().is_online()));
        entries.insert(keys::CURRENT_JOBS.to_string(), Value::Array(jobs));
        entries.insert(keys::STATISTICS.to_string(), json!(self.stats.snapshot()));
        entries.insert(keys::LAST_UPDATE.to_string(), json!(self.clock.epoch_ms()));
        if let Err(e) = self.store.set(entries).await {
            warn!(error = %e, "failed to persist agent state");
        }
    }

    async fn run_inbox(self: Arc<Self>, mut rx: mpsc::Receiver<ServerMessage>) {
        loop {
            let message = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                message = rx.recv() => message,
            };
            match message {
                Some(ServerMessage::JobAssigned { payload }) => {
                    self.on_job_assigned(payload).await;
                }
                Some(ServerMessage::JobCancelled { payload }) => {
                    self.on_job_cancelled(&payload.job_id, payload.reason.as_deref()).await;
                }
                Some(other) => debug!(message = ?other, "ignoring server message"),
                None => break,
            }
        }
    }

    async fn health_loop(self: Arc<Self>) {
        let period = self.config.health_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.pool.check_health().await,
            }
        }
    }

    /// Rebuild an emptied pool and revive a dead ticker.
    async fn keepalive_loop(self: Arc<Self>) {
        let period = self.config.keepalive_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if self.pool.is_empty() {
                        warn!("resource pool empty, reinitializing");
                        self.pool.initialize().await;
                    }
                    self.connection.ensure_ticker();
                }
            }
        }
    }
}

/// Identity requested by `CHANGE_AGENT_ID`. The alias is read from the id;
/// `alias` is used only when the id carries none.
pub fn requested_identity(new_id: &str, alias: Option<&str>) -> Identity {
    let mut identity = Identity::adopt(AgentId::new(new_id.trim()));
    if identity.alias.is_empty() {
        identity.alias = alias.map(str::trim).unwrap_or_default().to_string();
    }
    identity
}

/// Stored identity, or a freshly generated one that is persisted first.
pub async fn load_identity(store: &dyn KvStore) -> Result<Identity, StoreError> {
    let stored = store.get(&[keys::AGENT_ID, keys::AGENT_ALIAS]).await?;
    let alias = stored.get(keys::AGENT_ALIAS).and_then(Value::as_str).unwrap_or_default().to_string();
    if let Some(id) = stored.get(keys::AGENT_ID).and_then(Value::as_str).filter(|id| !id.is_empty()) {
        return Ok(Identity { id: AgentId::new(id), alias });
    }

    let identity = Identity::generate(&alias);
    let mut entries = StoreMap::new();
    entries.insert(keys::AGENT_ID.to_string(), json!(identity.id));
    entries.insert(keys::AGENT_ALIAS.to_string(), json!(identity.alias));
    store.set(entries).await?;
    info!(agent_id = %identity.id, "generated agent identity");
    Ok(identity)
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
