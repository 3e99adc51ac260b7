// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the agent's external collaborators:
//!
//! - [`ResourceHost`]: creates, inspects and drives pooled resources
//! - [`KvStore`]: durable key-value state with change notifications
//! - [`Transport`]: link to the coordination server

pub mod host;
pub mod store;
pub mod transport;

pub use host::{BridgeHost, HostError, ResourceHost};
pub use store::{FileStore, KvStore, MemoryStore, StoreChange, StoreError, StoreMap};
pub use transport::{
    HttpTransport, Transport, TransportError, TransportEvent, TransportMode, WsTransport,
};

#[cfg(any(test, feature = "test-support"))]
pub use host::{FakeHost, HostCall};
#[cfg(any(test, feature = "test-support"))]
pub use transport::FakeTransport;
