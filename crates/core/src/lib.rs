// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tf-core: domain types shared by the tabfleet crawling agent

pub mod macros;

pub mod clock;
pub mod connection;
pub mod id;
pub mod identity;
pub mod job;
pub mod resource;
pub mod stats;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use connection::ConnectionState;
pub use id::{AgentId, JobId, ResourceId};
pub use identity::Identity;
pub use job::{
    Job, JobOptions, JobOutcome, JobStatus, DEFAULT_JOB_TIMEOUT_MS, REASON_CANCELLED,
    REASON_NO_RESOURCE, REASON_TIMEOUT,
};
pub use resource::{LoadStatus, PoolStats, ResourceInfo, ResourceStatus, BLANK_URL};
pub use stats::{Statistics, StatsCounter};
