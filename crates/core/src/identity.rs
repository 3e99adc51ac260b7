// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identity: `{alias}_{suffix}` or a bare random suffix.

use crate::id::AgentId;
use serde::{Deserialize, Serialize};

/// Length of the random suffix appended to every generated identity.
pub const SUFFIX_LEN: usize = 4;

const SUFFIX_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Identity this agent presents to the server, plus the alias it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: AgentId,
    #[serde(default)]
    pub alias: String,
}

impl Identity {
    /// Generate a fresh identity for `alias` (empty alias → bare suffix).
    pub fn generate(alias: &str) -> Self {
        Self { id: compose(alias, &random_suffix()), alias: alias.trim().to_string() }
    }

    /// Adopt an explicit id, deriving the alias from its shape.
    pub fn adopt(id: impl Into<AgentId>) -> Self {
        let id = id.into();
        let alias = extract_alias(&id);
        Self { id, alias }
    }
}

pub fn random_suffix() -> String {
    nanoid::nanoid!(SUFFIX_LEN, &SUFFIX_ALPHABET)
}

pub fn compose(alias: &str, suffix: &str) -> AgentId {
    let alias = alias.trim();
    if alias.is_empty() {
        AgentId::new(suffix)
    } else {
        AgentId::new(format!("{alias}_{suffix}"))
    }
}

/// `alias_ab12` → `alias`; anything not exactly `<x>_<4 chars>` → empty.
pub fn extract_alias(id: &AgentId) -> String {
    let parts: Vec<&str> = id.split('_').collect();
    match parts.as_slice() {
        [alias, suffix] if suffix.chars().count() == SUFFIX_LEN => alias.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
