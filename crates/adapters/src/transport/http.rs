// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling HTTP transport.
//!
//! `POST {base}/agent/register`, `POST {base}/agent/get-pending-jobs`,
//! `POST {base}/agent/message`, `DELETE {base}/agent/{id}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tf_core::AgentId;
use tf_wire::{AgentMessage, JobAssignment, PendingJobs, ServerMessage};
use tokio::sync::mpsc;

use super::{Transport, TransportError, TransportEvent, TransportMode};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterReply {
    #[serde(default)]
    agent_id: Option<AgentId>,
    #[serde(default)]
    server_id: Option<String>,
}

impl HttpTransport {
    pub fn new(base: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self { client, base: base.into().trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/agent/{}", self.base, path)
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        check(response).await
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Rejected { status: status.as_u16(), body })
}

#[async_trait]
impl Transport for HttpTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Polling
    }

    async fn connect(
        &self,
        register: &AgentMessage,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        let AgentMessage::AgentRegister { agent_id, payload, .. } = register else {
            return Err(TransportError::Connect("expected AGENT_REGISTER".to_string()));
        };
        let body = json!({ "agentId": agent_id, "payload": payload });
        let response = self.post("register", &body).await.map_err(|e| match e {
            TransportError::Send(msg) => TransportError::Connect(msg),
            other => other,
        })?;

        // Reply body is optional; surface ids the same way the socket would.
        if let Ok(reply) = response.json::<RegisterReply>().await {
            let msg = ServerMessage::AgentRegistered {
                agent_id: reply.agent_id,
                server_id: reply.server_id,
            };
            let _ = events.send(TransportEvent::Message(msg)).await;
        }
        Ok(())
    }

    async fn send(&self, message: &AgentMessage) -> Result<(), TransportError> {
        self.post("message", &message.to_envelope()).await?;
        Ok(())
    }

    async fn poll_jobs(&self, agent_id: &AgentId) -> Result<Vec<JobAssignment>, TransportError> {
        let response = self.post("get-pending-jobs", &json!({ "agentId": agent_id })).await?;
        let pending: PendingJobs =
            response.json().await.map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(pending.jobs)
    }

    async fn delete_agent(&self, agent_id: &AgentId) -> Result<(), TransportError> {
        let url = self.url(&urlencoding::encode(agent_id.as_str()));
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        check(response).await?;
        Ok(())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_at_base() {
        let transport = HttpTransport::new("http://mkt.example/api/").unwrap();
        assert_eq!(transport.url("register"), "http://mkt.example/api/agent/register");
        assert_eq!(
            transport.url(&urlencoding::encode("상점_ab12")),
            "http://mkt.example/api/agent/%EC%83%81%EC%A0%90_ab12"
        );
    }

    #[test]
    fn polling_mode() {
        let transport = HttpTransport::new("http://localhost").unwrap();
        assert_eq!(transport.mode(), TransportMode::Polling);
    }
}
