// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages the agent sends to the coordination server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tf_core::{AgentId, JobId, JobOutcome, Statistics};

/// Version string advertised in registration.
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outbound server message (persistent-transport framing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum AgentMessage {
    AgentRegister { agent_id: AgentId, payload: Registration, timestamp: u64 },

    Heartbeat {
        agent_id: AgentId,
        timestamp: u64,
        current_jobs: Vec<JobId>,
        statistics: Statistics,
    },

    JobResult { agent_id: AgentId, payload: JobReport },
}

/// Capability descriptor sent on registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub capabilities: Vec<String>,
    pub max_concurrent_jobs: usize,
    pub supported_sites: Vec<String>,
    pub version: String,
}

impl Registration {
    pub fn new(max_concurrent_jobs: usize) -> Self {
        Self {
            name: "tabfleet agent".to_string(),
            capabilities: vec!["browser_tabs".to_string(), "naver_shopping".to_string()],
            max_concurrent_jobs,
            supported_sites: vec!["naver.com".to_string(), "shopping.naver.com".to_string()],
            version: AGENT_VERSION.to_string(),
        }
    }
}

/// Terminal job report.
///
/// Carries both `success`/`result` and `status`/`data` so either server
/// dialect can read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: JobId,
    pub success: bool,
    pub status: String,
    pub result: Option<Value>,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub processing_time: u64,
    pub timestamp: u64,
}

impl JobReport {
    pub fn new(job_id: JobId, outcome: &JobOutcome, timestamp: u64) -> Self {
        let (result, error) = match outcome {
            JobOutcome::Success { data, .. } => (Some(data.clone()), None),
            JobOutcome::Failure { error, .. } => (None, Some(error.clone())),
        };
        let status = if outcome.is_success() { "completed" } else { "failed" };
        Self {
            job_id,
            success: outcome.is_success(),
            status: status.to_string(),
            data: result.clone(),
            result,
            error,
            processing_time: outcome.processing_ms(),
            timestamp,
        }
    }
}

impl AgentMessage {
    pub fn agent_id(&self) -> &AgentId {
        match self {
            AgentMessage::AgentRegister { agent_id, .. }
            | AgentMessage::Heartbeat { agent_id, .. }
            | AgentMessage::JobResult { agent_id, .. } => agent_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AgentMessage::AgentRegister { .. } => "AGENT_REGISTER",
            AgentMessage::Heartbeat { .. } => "HEARTBEAT",
            AgentMessage::JobResult { .. } => "JOB_RESULT",
        }
    }

    /// Polling-transport framing: `{agentId, type, payload}`.
    pub fn to_envelope(&self) -> Value {
        let payload = match self {
            AgentMessage::AgentRegister { payload, .. } => json!(payload),
            AgentMessage::Heartbeat { timestamp, current_jobs, statistics, .. } => json!({
                "timestamp": timestamp,
                "currentJobs": current_jobs,
                "statistics": statistics,
            }),
            AgentMessage::JobResult { payload, .. } => json!(payload),
        };
        json!({ "agentId": self.agent_id(), "type": self.kind(), "payload": payload })
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
