// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tabfleet agent: leases crawl jobs from the coordination server and runs
//! them on a pool of host resources.

pub mod connection;
pub mod coordinator;
pub mod env;
pub mod executor;
pub mod keys;
pub mod lifecycle;
pub mod listener;
pub mod pool;
pub mod registry;

pub use connection::{ConnectionConfig, ConnectionDeps, ConnectionManager};
pub use coordinator::{
    load_identity, requested_identity, AgentCoordinator, AgentDeps, AssignOutcome,
    CoordinatorConfig, InFlightPolicy,
};
pub use executor::{ExecutorConfig, JobExecutor, ResultSink};
pub use lifecycle::{startup, AgentState, Config, LifecycleError, StartupResult, TransportKind};
pub use listener::Listener;
pub use pool::{ResourcePool, Slot};
pub use registry::JobRegistry;
