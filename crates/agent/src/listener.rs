// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control socket.
//!
//! One request and one response per connection, framed by `tf_wire`.
//! Identity changes are acknowledged immediately and run in the background;
//! clients poll `GET_AGENT_STATUS` to observe the result.

use std::sync::Arc;
use std::time::Duration;

use tf_wire::{ControlRequest, ControlResponse, ProtocolError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::coordinator::{requested_identity, AgentCoordinator};

pub struct Listener {
    unix: UnixListener,
    agent: Arc<AgentCoordinator>,
    timeout: Duration,
}

impl Listener {
    pub fn new(unix: UnixListener, agent: Arc<AgentCoordinator>, timeout: Duration) -> Self {
        Self { unix, agent, timeout }
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) {
        loop {
            match self.unix.accept().await {
                Ok((stream, _)) => {
                    let agent = Arc::clone(&self.agent);
                    let timeout = self.timeout;
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &agent, timeout).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("control accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("control client disconnected"),
        ProtocolError::Timeout => warn!("control connection timeout"),
        e => error!("control connection error: {}", e),
    }
}

async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    agent: &Arc<AgentCoordinator>,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = tf_wire::read_request(&mut reader, timeout).await?;
    if matches!(request, ControlRequest::GetAgentStatus) {
        debug!(request = ?request, "received control request");
    } else {
        info!(request = ?request, "received control request");
    }

    let response = handle_request(request, agent).await;
    tf_wire::write_response(&mut writer, &response, timeout).await
}

async fn handle_request(request: ControlRequest, agent: &Arc<AgentCoordinator>) -> ControlResponse {
    match request {
        ControlRequest::GetAgentStatus => ControlResponse::Status { status: agent.status() },

        ControlRequest::ForceReconnect => {
            agent.on_force_reconnect().await;
            ControlResponse::Ok
        }

        ControlRequest::UpdateAgentAlias { alias } => {
            let agent = Arc::clone(agent);
            tokio::spawn(async move { agent.on_alias_updated(&alias).await });
            ControlResponse::Ok
        }

        ControlRequest::ChangeAgentId { new_id, alias } => {
            if new_id.trim().is_empty() {
                return ControlResponse::Error { message: "agent id must not be empty".to_string() };
            }
            let identity = requested_identity(&new_id, alias.as_deref());
            let agent = Arc::clone(agent);
            tokio::spawn(async move { agent.on_identity_change_requested(identity).await });
            ControlResponse::Ok
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
