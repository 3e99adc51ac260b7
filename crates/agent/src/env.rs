// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Search page the query is appended to, url-encoded.
pub const DEFAULT_SEARCH_URL: &str = "https://search.shopping.naver.com/search/all?query=";

/// Resolve state directory: TF_STATE_DIR > XDG_STATE_HOME/tabfleet > ~/.local/state/tabfleet
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("TF_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("tabfleet"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/tabfleet"))
}

/// Coordination server base url (default `ws://localhost:8080`)
pub fn server_url() -> String {
    non_empty("TF_SERVER_URL").unwrap_or_else(|| "ws://localhost:8080".to_string())
}

/// `ws` (default) or `http`
pub fn transport() -> Option<String> {
    non_empty("TF_TRANSPORT")
}

/// Resource host bridge (default `http://127.0.0.1:9222`)
pub fn host_url() -> String {
    non_empty("TF_HOST_URL").unwrap_or_else(|| "http://127.0.0.1:9222".to_string())
}

/// Resources kept in the pool (default 3)
pub fn pool_size() -> usize {
    parse("TF_POOL_SIZE").filter(|n| *n > 0).unwrap_or(3)
}

/// Polling-mode tick (default 800ms)
pub fn poll_interval() -> Duration {
    millis("TF_POLL_INTERVAL_MS").unwrap_or(Duration::from_millis(800))
}

pub fn heartbeat_interval() -> Duration {
    millis("TF_HEARTBEAT_INTERVAL_MS").unwrap_or(Duration::from_secs(30))
}

/// Delay before retrying a failed connect (default 3s)
pub fn reconnect_delay() -> Duration {
    millis("TF_RECONNECT_DELAY_MS").unwrap_or(Duration::from_secs(3))
}

/// Delay before reconnecting after a failed heartbeat (default 10s)
pub fn heartbeat_failure_delay() -> Duration {
    millis("TF_HEARTBEAT_FAILURE_DELAY_MS").unwrap_or(Duration::from_secs(10))
}

pub fn max_connect_attempts() -> u32 {
    parse("TF_MAX_CONNECT_ATTEMPTS").unwrap_or(10)
}

/// Timeout for jobs assigned without one (default 30s)
pub fn job_timeout_ms() -> u64 {
    parse("TF_JOB_TIMEOUT_MS").filter(|ms| *ms > 0).unwrap_or(tf_core::DEFAULT_JOB_TIMEOUT_MS)
}

pub fn search_url() -> String {
    non_empty("TF_SEARCH_URL").unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string())
}

/// `drop` (default) or `report-cancelled`
pub fn inflight_policy() -> Option<String> {
    non_empty("TF_INFLIGHT_POLICY")
}

/// Control socket read/write timeout
pub fn ipc_timeout() -> Duration {
    millis("TF_IPC_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

/// Positive millisecond count; zero falls back to the default.
fn millis(key: &str) -> Option<Duration> {
    parse::<u64>(key).filter(|ms| *ms > 0).map(Duration::from_millis)
}
