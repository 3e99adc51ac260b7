// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages sent by the coordination server.

use serde::{Deserialize, Serialize};
use tf_core::{AgentId, JobId, JobOptions};

use crate::ProtocolError;

/// Inbound server message.
///
/// Servers send either the bare message or the same object wrapped as
/// `{"response": {...}}`; [`ServerMessage::parse`] accepts both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Registration accepted; the server may assign its own id.
    AgentRegistered {
        #[serde(default)]
        agent_id: Option<AgentId>,
        #[serde(default)]
        server_id: Option<String>,
    },

    JobAssigned { payload: JobAssignment },

    JobCancelled { payload: JobCancellation },

    HeartbeatAck,
}

/// A job lease. Fields default to empty so malformed assignments reach
/// validation instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAssignment {
    #[serde(default)]
    pub job_id: JobId,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub options: JobOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCancellation {
    pub job_id: JobId,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of the polling endpoint's reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingJobs {
    #[serde(default)]
    pub jobs: Vec<JobAssignment>,
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: serde_json::Value) -> Result<Self, ProtocolError> {
        if let Some(inner) = value.get_mut("response").filter(|v| v.is_object()) {
            value = inner.take();
        }
        let kind = value.get("type").and_then(|t| t.as_str()).map(str::to_string);
        serde_json::from_value(value).map_err(|e| match kind {
            Some(kind) if !Self::is_known(&kind) => ProtocolError::Unrecognized(kind),
            _ => ProtocolError::Json(e),
        })
    }

    fn is_known(kind: &str) -> bool {
        matches!(kind, "AGENT_REGISTERED" | "JOB_ASSIGNED" | "JOB_CANCELLED" | "HEARTBEAT_ACK")
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
