// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message shapes exchanged by the tabfleet agent.
//!
//! - [`ServerMessage`] / [`AgentMessage`]: coordination server protocol
//! - [`ResourceRequest`] / [`ResourceResponse`]: agent to pooled resource
//! - [`ControlRequest`] / [`ControlResponse`]: local control socket
//!
//! Control socket wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod agent;
mod control;
mod resource;
mod server;
mod wire;

pub use agent::{AgentMessage, JobReport, Registration, AGENT_VERSION};
pub use control::{AgentStatus, ControlRequest, ControlResponse};
pub use resource::{ResourceRequest, ResourceResponse};
pub use server::{JobAssignment, JobCancellation, PendingJobs, ServerMessage};
pub use wire::{decode, encode, read_message, write_message, ProtocolError};
pub use wire::{read_request, write_response};
