// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end agent scenarios against recording fakes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/agent/connection.rs"]
mod connection;
#[path = "specs/agent/identity.rs"]
mod identity;
#[path = "specs/agent/jobs.rs"]
mod jobs;
#[path = "specs/agent/pool.rs"]
mod pool;
