// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state of the agent towards the job server.

use serde::{Deserialize, Serialize};

/// Agent-wide connection state.
///
/// `Error` is sticky: it is entered when the consecutive connect attempts
/// are exhausted and only an explicit reconnect or identity change leaves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Offline,
    Connecting,
    Online,
    Error,
}

impl ConnectionState {
    pub fn is_online(&self) -> bool {
        matches!(self, ConnectionState::Online)
    }
}

crate::simple_display! {
    ConnectionState {
        Offline => "offline",
        Connecting => "connecting",
        Online => "online",
        Error => "error",
    }
}
