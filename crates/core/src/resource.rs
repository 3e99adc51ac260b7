// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pooled execution resources (browser tabs in the reference deployment).

use crate::id::ResourceId;
use serde::{Deserialize, Serialize};

/// URL a resource is parked on between jobs.
pub const BLANK_URL: &str = "about:blank";

/// Whether a pooled resource is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Idle,
    Busy,
}

crate::simple_display! {
    ResourceStatus {
        Idle => "idle",
        Busy => "busy",
    }
}

/// Page load state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Loading,
    Complete,
}

/// Host-side description of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub id: ResourceId,
    /// Window/process group the resource lives in; replacements reuse it.
    #[serde(default)]
    pub placement: Option<String>,
    #[serde(default)]
    pub url: String,
    pub status: LoadStatus,
}

impl ResourceInfo {
    /// Blank resources are the only ones reclaimed across restarts.
    pub fn is_blank(&self) -> bool {
        self.url.is_empty() || self.url == BLANK_URL || self.url == "chrome://newtab/"
    }
}

/// Pool occupancy snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub target: usize,
    pub total: usize,
    pub idle: usize,
    pub busy: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        empty     = { "", true },
        blank     = { "about:blank", true },
        new_tab   = { "chrome://newtab/", true },
        in_use    = { "https://search.shopping.naver.com/search/all?query=x", false },
    )]
    fn blank_detection(url: &str, blank: bool) {
        let info = ResourceInfo {
            id: ResourceId::new("1"),
            placement: None,
            url: url.to_string(),
            status: LoadStatus::Complete,
        };
        assert_eq!(info.is_blank(), blank);
    }
}
