// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Link to the coordination server.
//!
//! Two implementations share one trait: a persistent WebSocket that pushes
//! assignments, and an HTTP endpoint the agent polls.

mod http;
mod ws;

pub use http::HttpTransport;
pub use ws::WsTransport;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeTransport;

use async_trait::async_trait;
use tf_core::AgentId;
use tf_wire::{AgentMessage, JobAssignment, ServerMessage};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("not connected")]
    NotConnected,
    #[error("server rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// How assignments arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Server pushes over an open socket; the agent heartbeats on a timer.
    Persistent,
    /// Agent polls for pending jobs; every poll tick heartbeats.
    Polling,
}

/// Inbound event from a persistent transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(ServerMessage),
    /// Socket closed. `clean` is true for a normal (1000) close.
    Closed { clean: bool },
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn mode(&self) -> TransportMode;

    /// Open the link and register. `register` is the `AGENT_REGISTER` message.
    ///
    /// Any previous link is torn down first without emitting `Closed`.
    async fn connect(
        &self,
        register: &AgentMessage,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError>;

    async fn send(&self, message: &AgentMessage) -> Result<(), TransportError>;

    /// Pending assignments (polling mode only).
    async fn poll_jobs(&self, _agent_id: &AgentId) -> Result<Vec<JobAssignment>, TransportError> {
        Ok(Vec::new())
    }

    /// Ask the server to forget an identity.
    async fn delete_agent(&self, _agent_id: &AgentId) -> Result<(), TransportError> {
        Ok(())
    }

    /// Tear down the link without emitting `Closed`.
    async fn close(&self);
}
