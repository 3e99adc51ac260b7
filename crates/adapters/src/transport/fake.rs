// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording transport for tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tf_core::AgentId;
use tf_wire::{AgentMessage, JobAssignment, JobReport, ServerMessage};
use tokio::sync::mpsc;

use super::{Transport, TransportError, TransportEvent, TransportMode};

struct FakeTransportState {
    mode: TransportMode,
    connects: Vec<AgentId>,
    connect_failures: usize,
    fail_sends: bool,
    sent: Vec<AgentMessage>,
    pending: VecDeque<Vec<JobAssignment>>,
    deleted: Vec<AgentId>,
    closes: usize,
    events: Option<mpsc::Sender<TransportEvent>>,
}

/// Fake transport. Records every call; connects succeed unless told otherwise.
#[derive(Clone)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn new(mode: TransportMode) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeTransportState {
                mode,
                connects: Vec::new(),
                connect_failures: 0,
                fail_sends: false,
                sent: Vec::new(),
                pending: VecDeque::new(),
                deleted: Vec::new(),
                closes: 0,
                events: None,
            })),
        }
    }

    pub fn persistent() -> Self {
        Self::new(TransportMode::Persistent)
    }

    pub fn polling() -> Self {
        Self::new(TransportMode::Polling)
    }

    /// Fail the next `n` connect attempts.
    pub fn fail_connects(&self, n: usize) {
        self.inner.lock().connect_failures = n;
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.lock().fail_sends = fail;
    }

    /// Queue one poll response.
    pub fn push_pending(&self, jobs: Vec<JobAssignment>) {
        self.inner.lock().pending.push_back(jobs);
    }

    /// Deliver an inbound event as if the server sent it.
    pub async fn emit(&self, event: TransportEvent) {
        let tx = self.inner.lock().events.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub async fn emit_message(&self, message: ServerMessage) {
        self.emit(TransportEvent::Message(message)).await;
    }

    /// Ids used for each successful connect, in order.
    pub fn connects(&self) -> Vec<AgentId> {
        self.inner.lock().connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        self.inner.lock().connects.len()
    }

    pub fn sent(&self) -> Vec<AgentMessage> {
        self.inner.lock().sent.clone()
    }

    pub fn heartbeats(&self) -> Vec<AgentMessage> {
        self.sent().into_iter().filter(|m| matches!(m, AgentMessage::Heartbeat { .. })).collect()
    }

    pub fn results(&self) -> Vec<JobReport> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                AgentMessage::JobResult { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<AgentId> {
        self.inner.lock().deleted.clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().closes
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn mode(&self) -> TransportMode {
        self.inner.lock().mode
    }

    async fn connect(
        &self,
        register: &AgentMessage,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        let mut state = self.inner.lock();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        state.connects.push(register.agent_id().clone());
        state.sent.push(register.clone());
        state.events = Some(events);
        Ok(())
    }

    async fn send(&self, message: &AgentMessage) -> Result<(), TransportError> {
        let mut state = self.inner.lock();
        if state.fail_sends {
            return Err(TransportError::Send("broken pipe".to_string()));
        }
        state.sent.push(message.clone());
        Ok(())
    }

    async fn poll_jobs(&self, _agent_id: &AgentId) -> Result<Vec<JobAssignment>, TransportError> {
        let mut state = self.inner.lock();
        if state.fail_sends {
            return Err(TransportError::Send("broken pipe".to_string()));
        }
        Ok(state.pending.pop_front().unwrap_or_default())
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> Result<(), TransportError> {
        self.inner.lock().deleted.push(agent_id.clone());
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.inner.lock();
        state.closes += 1;
        state.events = None;
    }
}
