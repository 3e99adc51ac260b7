// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store keys shared with the status UI.

pub const AGENT_ID: &str = "agentId";
pub const AGENT_ALIAS: &str = "agentAlias";
pub const SERVER_ID: &str = "serverId";
pub const IS_CONNECTED: &str = "isConnected";
pub const CONNECTION_STATUS: &str = "connectionStatus";
pub const CURRENT_JOBS: &str = "currentJobs";
pub const STATISTICS: &str = "statistics";
pub const LAST_UPDATE: &str = "lastUpdate";
pub const RESOURCE_POOL_IDS: &str = "resourcePoolIds";
