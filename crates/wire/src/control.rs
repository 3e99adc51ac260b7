// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local control surface (status UI, operator tooling).

use serde::{Deserialize, Serialize};
use tf_core::{AgentId, ConnectionState, PoolStats, Statistics};

/// Request from a local client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ControlRequest {
    GetAgentStatus,

    ForceReconnect,

    /// Regenerate the identity as `{alias}_{suffix}`.
    UpdateAgentAlias { alias: String },

    /// Switch to an explicit identity.
    ChangeAgentId {
        new_id: AgentId,
        #[serde(default)]
        alias: Option<String>,
    },
}

/// Response to a local client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlResponse {
    Ok,

    Status { status: AgentStatus },

    Error { message: String },
}

/// Snapshot returned by `GET_AGENT_STATUS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub agent_id: AgentId,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub server_id: Option<String>,
    pub connection_status: ConnectionState,
    pub is_connected: bool,
    pub current_jobs: usize,
    pub statistics: Statistics,
    pub pool: PoolStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        status = { r#"{"type":"GET_AGENT_STATUS"}"#, ControlRequest::GetAgentStatus },
        reconnect = { r#"{"type":"FORCE_RECONNECT"}"#, ControlRequest::ForceReconnect },
        alias = {
            r#"{"type":"UPDATE_AGENT_ALIAS","alias":"shop"}"#,
            ControlRequest::UpdateAgentAlias { alias: "shop".to_string() }
        },
        change_id = {
            r#"{"type":"CHANGE_AGENT_ID","newId":"shop_zz99"}"#,
            ControlRequest::ChangeAgentId { new_id: AgentId::new("shop_zz99"), alias: None }
        },
    )]
    fn parses_requests(json: &str, expected: ControlRequest) {
        assert_eq!(serde_json::from_str::<ControlRequest>(json).unwrap(), expected);
    }

    #[test]
    fn status_response_shape() {
        let response = ControlResponse::Status {
            status: AgentStatus {
                agent_id: AgentId::new("k3x9"),
                alias: String::new(),
                server_id: None,
                connection_status: ConnectionState::Online,
                is_connected: true,
                current_jobs: 2,
                statistics: Statistics::default(),
                pool: PoolStats { target: 3, total: 3, idle: 1, busy: 2 },
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "STATUS");
        assert_eq!(json["status"]["connectionStatus"], "online");
        assert_eq!(json["status"]["pool"]["busy"], 2);
    }
}
