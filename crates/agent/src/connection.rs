// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection to the coordination server.
//!
//! State machine `Offline -> Connecting -> Online -> (Offline | Error)`.
//! At most one connect attempt runs at a time and at most one reconnect is
//! ever scheduled. After `max_connect_attempts` consecutive failures the
//! manager parks in `Error` until a forced reconnect or identity change.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tf_adapters::{KvStore, StoreMap, Transport, TransportError, TransportEvent, TransportMode};
use tf_core::{AgentId, Clock, ConnectionState, JobId, JobOutcome, StatsCounter};
use tf_wire::{AgentMessage, JobReport, Registration, ServerMessage};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::executor::ResultSink;
use crate::keys;
use crate::registry::JobRegistry;

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub heartbeat_interval: Duration,
    pub poll_interval: Duration,
    pub reconnect_delay: Duration,
    pub heartbeat_failure_delay: Duration,
    pub force_reconnect_delay: Duration,
    pub connect_timeout: Duration,
    pub max_connect_attempts: u32,
    /// Advertised in registration; equals the pool size.
    pub max_concurrent_jobs: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            poll_interval: Duration::from_millis(800),
            reconnect_delay: Duration::from_secs(3),
            heartbeat_failure_delay: Duration::from_secs(10),
            force_reconnect_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            max_connect_attempts: 10,
            max_concurrent_jobs: 3,
        }
    }
}

/// Shortest ticker period; zero periods are clamped to this.
const MIN_TICK: Duration = Duration::from_millis(10);

impl ConnectionConfig {
    tf_core::setters! {
        set {
            heartbeat_interval: Duration,
            poll_interval: Duration,
            reconnect_delay: Duration,
            heartbeat_failure_delay: Duration,
            force_reconnect_delay: Duration,
            connect_timeout: Duration,
            max_connect_attempts: u32,
        }
    }
}

pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    registry: Arc<JobRegistry>,
    stats: StatsCounter,
    config: ConnectionConfig,
    agent_id: Mutex<AgentId>,
    server_id: Mutex<Option<String>>,
    state: watch::Sender<ConnectionState>,
    attempts: AtomicU32,
    /// Current link generation. Events tagged with an older one are stale.
    link: AtomicU64,
    connect_lock: tokio::sync::Mutex<()>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    events_tx: mpsc::Sender<(u64, TransportEvent)>,
    events_rx: Mutex<Option<mpsc::Receiver<(u64, TransportEvent)>>>,
    /// Assignments and cancellations for the coordinator.
    inbox: mpsc::Sender<ServerMessage>,
}

/// Collaborators handed to [`ConnectionManager::new`].
pub struct ConnectionDeps {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
    pub registry: Arc<JobRegistry>,
    pub stats: StatsCounter,
}

impl ConnectionManager {
    pub fn new(
        deps: ConnectionDeps,
        config: ConnectionConfig,
        agent_id: AgentId,
        inbox: mpsc::Sender<ServerMessage>,
    ) -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (state, _) = watch::channel(ConnectionState::Offline);
        Arc::new(Self {
            transport: deps.transport,
            store: deps.store,
            clock: deps.clock,
            registry: deps.registry,
            stats: deps.stats,
            config,
            agent_id: Mutex::new(agent_id),
            server_id: Mutex::new(None),
            state,
            attempts: AtomicU32::new(0),
            link: AtomicU64::new(0),
            connect_lock: tokio::sync::Mutex::new(()),
            reconnect: Mutex::new(None),
            ticker: Mutex::new(None),
            pump: Mutex::new(None),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            inbox,
        })
    }

    /// Start consuming transport events. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let Some(rx) = self.events_rx.lock().take() else {
            return;
        };
        let this = Arc::clone(self);
        *self.pump.lock() = Some(tokio::spawn(this.pump_events(rx)));
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id.lock().clone()
    }

    pub fn set_agent_id(&self, agent_id: AgentId) {
        *self.agent_id.lock() = agent_id;
    }

    pub fn server_id(&self) -> Option<String> {
        self.server_id.lock().clone()
    }

    pub fn mode(&self) -> TransportMode {
        self.transport.mode()
    }

    /// Open the transport and register. No-op while another attempt runs.
    pub async fn connect(self: &Arc<Self>) {
        let Ok(_guard) = self.connect_lock.try_lock() else {
            debug!("connect already in progress");
            return;
        };

        let max = self.config.max_connect_attempts;
        let attempt = self.attempts.load(Ordering::SeqCst);
        if attempt >= max {
            warn!(attempts = attempt, "connect attempts exhausted");
            self.set_state(ConnectionState::Error).await;
            return;
        }
        self.attempts.store(attempt + 1, Ordering::SeqCst);

        let agent_id = self.agent_id();
        info!(agent_id = %agent_id, attempt = attempt + 1, max, "connecting");
        self.set_state(ConnectionState::Connecting).await;

        let register = AgentMessage::AgentRegister {
            agent_id,
            payload: Registration::new(self.config.max_concurrent_jobs),
            timestamp: self.clock.epoch_ms(),
        };
        let events = self.open_link();
        let connecting = self.transport.connect(&register, events);
        let result = match tokio::time::timeout(self.config.connect_timeout, connecting).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Connect("timed out".to_string())),
        };

        match result {
            Ok(()) => {
                self.attempts.store(0, Ordering::SeqCst);
                self.set_state(ConnectionState::Online).await;
                self.start_ticker();
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.set_state(ConnectionState::Offline).await;
                self.schedule_reconnect(self.config.reconnect_delay, false);
            }
        }
    }

    /// Send one heartbeat. A failure while online schedules a single reconnect.
    pub async fn heartbeat(self: &Arc<Self>) {
        let message = AgentMessage::Heartbeat {
            agent_id: self.agent_id(),
            timestamp: self.clock.epoch_ms(),
            current_jobs: self.registry.ids(),
            statistics: self.stats.snapshot(),
        };
        match self.transport.send(&message).await {
            Ok(()) => {
                if self.state() == ConnectionState::Offline {
                    self.set_state(ConnectionState::Online).await;
                }
            }
            Err(e) => {
                if self.state() == ConnectionState::Online {
                    warn!(error = %e, "heartbeat failed");
                    self.set_state(ConnectionState::Offline).await;
                    self.schedule_reconnect(self.config.heartbeat_failure_delay, false);
                } else {
                    debug!(error = %e, "heartbeat failed while not online");
                }
            }
        }
    }

    /// Fetch pending jobs, hand them to the coordinator, then heartbeat.
    pub async fn poll(self: &Arc<Self>) {
        match self.transport.poll_jobs(&self.agent_id()).await {
            Ok(jobs) => {
                for payload in jobs {
                    if self.inbox.send(ServerMessage::JobAssigned { payload }).await.is_err() {
                        debug!("coordinator inbox closed");
                    }
                }
            }
            Err(e) => debug!(error = %e, "poll failed"),
        }
        self.heartbeat().await;
    }

    /// Fire-and-forget `JOB_RESULT`.
    pub fn report_result(&self, job_id: &JobId, outcome: &JobOutcome) {
        let message = self.result_message(&self.agent_id(), job_id, outcome);
        let transport = Arc::clone(&self.transport);
        let job_id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.send(&message).await {
                warn!(job_id = %job_id, error = %e, "failed to report job result");
            }
        });
    }

    /// Send `JOB_RESULT` under an explicit identity and wait for the send.
    pub async fn send_result(
        &self,
        agent_id: &AgentId,
        job_id: &JobId,
        outcome: &JobOutcome,
    ) -> Result<(), TransportError> {
        self.transport.send(&self.result_message(agent_id, job_id, outcome)).await
    }

    /// Close the link and reconnect once after `force_reconnect_delay`.
    pub async fn force_reconnect(self: &Arc<Self>) {
        info!("forced reconnect");
        self.stop_ticker();
        self.retire_link();
        self.transport.close().await;
        self.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Offline).await;
        self.schedule_reconnect(self.config.force_reconnect_delay, true);
    }

    /// Cancel tickers and pending reconnects, close the link, go offline.
    pub async fn stop(&self) {
        self.cancel_reconnect();
        let _guard = self.connect_lock.lock().await;
        self.cancel_reconnect();
        self.stop_ticker();
        self.retire_link();
        self.transport.close().await;
        self.attempts.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Offline).await;
    }

    /// [`ConnectionManager::stop`] plus the event pump.
    pub async fn shutdown(&self) {
        self.stop().await;
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }

    /// Best-effort server-side removal of an old identity.
    pub async fn delete_identity(&self, old: &AgentId) {
        match self.transport.delete_agent(old).await {
            Ok(()) => info!(agent_id = %old, "old identity deleted"),
            Err(e) => warn!(agent_id = %old, error = %e, "failed to delete old identity"),
        }
    }

    /// Stop the heartbeat/poll ticker without touching the link.
    pub fn stop_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.abort();
        }
    }

    /// Restart the ticker if it died while online.
    pub fn ensure_ticker(self: &Arc<Self>) {
        let alive = self.ticker.lock().as_ref().is_some_and(|t| !t.is_finished());
        if !alive && self.state() == ConnectionState::Online {
            info!("restarting ticker");
            self.start_ticker();
        }
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.lock().as_ref().is_some_and(|r| !r.is_finished())
    }

    fn result_message(&self, agent_id: &AgentId, job_id: &JobId, outcome: &JobOutcome) -> AgentMessage {
        AgentMessage::JobResult {
            agent_id: agent_id.clone(),
            payload: JobReport::new(job_id.clone(), outcome, self.clock.epoch_ms()),
        }
    }

    /// Start a new link generation and return the sender handed to the
    /// transport. Its events are forwarded tagged with the generation.
    fn open_link(&self) -> mpsc::Sender<TransportEvent> {
        let link = self.link.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, mut rx) = mpsc::channel(64);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if events.send((link, event)).await.is_err() {
                    break;
                }
            }
        });
        tx
    }

    fn retire_link(&self) {
        self.link.fetch_add(1, Ordering::SeqCst);
    }

    fn start_ticker(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let handle = match self.transport.mode() {
            TransportMode::Persistent => tokio::spawn(this.heartbeat_loop()),
            TransportMode::Polling => tokio::spawn(this.poll_loop()),
        };
        if let Some(old) = self.ticker.lock().replace(handle) {
            old.abort();
        }
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let period = self.config.heartbeat_interval.max(MIN_TICK);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.state() == ConnectionState::Online {
                self.heartbeat().await;
            }
        }
    }

    async fn poll_loop(self: Arc<Self>) {
        let period = self.config.poll_interval.max(MIN_TICK);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.state() == ConnectionState::Online {
                self.poll().await;
            }
        }
    }

    /// Schedule `connect()` after `delay`. Keeps an already pending reconnect
    /// unless `replace` is set; either way at most one is pending.
    fn schedule_reconnect(self: &Arc<Self>, delay: Duration, replace: bool) {
        let mut slot = self.reconnect.lock();
        if let Some(pending) = slot.as_ref().filter(|r| !r.is_finished()) {
            if !replace {
                debug!("reconnect already scheduled");
                return;
            }
            pending.abort();
        }
        debug!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let this = Arc::clone(self);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.reconnect.lock().take();
            this.connect().await;
        }));
    }

    fn cancel_reconnect(&self) {
        if let Some(pending) = self.reconnect.lock().take() {
            pending.abort();
        }
    }

    async fn pump_events(self: Arc<Self>, mut rx: mpsc::Receiver<(u64, TransportEvent)>) {
        while let Some((link, event)) = rx.recv().await {
            match event {
                TransportEvent::Message(message) => self.on_message(message).await,
                TransportEvent::Closed { clean } => {
                    if link == self.link.load(Ordering::SeqCst) {
                        self.on_closed(clean).await;
                    } else {
                        debug!(link, "ignoring close of a superseded link");
                    }
                }
            }
        }
    }

    async fn on_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::AgentRegistered { agent_id, server_id } => {
                info!(agent_id = ?agent_id, server_id = ?server_id, "registered");
                *self.server_id.lock() = server_id.clone();
                let mut entries = StoreMap::new();
                entries.insert(keys::SERVER_ID.to_string(), json!(server_id));
                if let Err(e) = self.store.set(entries).await {
                    warn!(error = %e, "failed to persist server id");
                }
            }
            ServerMessage::HeartbeatAck => debug!("heartbeat acknowledged"),
            message @ (ServerMessage::JobAssigned { .. } | ServerMessage::JobCancelled { .. }) => {
                if self.inbox.send(message).await.is_err() {
                    debug!("coordinator inbox closed");
                }
            }
        }
    }

    async fn on_closed(self: &Arc<Self>, clean: bool) {
        self.stop_ticker();
        self.set_state(ConnectionState::Offline).await;
        if clean {
            info!("connection closed by server");
        } else {
            warn!("connection lost");
            self.schedule_reconnect(self.config.reconnect_delay, false);
        }
    }

    async fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous == state {
            return;
        }
        info!(from = %previous, to = %state, "connection state changed");
        let mut entries = StoreMap::new();
        entries.insert(keys::CONNECTION_STATUS.to_string(), json!(state));
        entries.insert(keys::IS_CONNECTED.to_string(), json!(state.is_online()));
        entries.insert(keys::LAST_UPDATE.to_string(), json!(self.clock.epoch_ms()));
        if let Err(e) = self.store.set(entries).await {
            warn!(error = %e, "failed to persist connection state");
        }
    }
}

impl ResultSink for ConnectionManager {
    fn report(&self, job_id: &JobId, outcome: &JobOutcome) {
        self.report_result(job_id, outcome);
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
