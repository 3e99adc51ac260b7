// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scenario fixtures.

pub use std::sync::Arc;
pub use std::time::Duration;

pub use serde_json::json;
pub use tf_adapters::{FakeHost, FakeTransport, MemoryStore};
pub use tf_agent::{keys, AgentCoordinator, AgentDeps, CoordinatorConfig, InFlightPolicy};
pub use tf_core::{AgentId, ConnectionState, FakeClock, Identity, JobId, JobOptions, Statistics};
pub use tf_wire::{AgentMessage, JobAssignment, JobReport, ServerMessage};

/// A started agent wired to fakes.
pub struct Scenario {
    pub transport: FakeTransport,
    pub host: FakeHost,
    pub store: MemoryStore,
    pub agent: Arc<AgentCoordinator>,
}

impl Scenario {
    pub async fn start(agent_id: &str, config: CoordinatorConfig) -> Self {
        Self::start_with(FakeTransport::persistent(), agent_id, config).await
    }

    pub async fn start_with(transport: FakeTransport, agent_id: &str, config: CoordinatorConfig) -> Self {
        let host = FakeHost::new();
        let store = MemoryStore::new();
        let agent = AgentCoordinator::new(
            AgentDeps {
                transport: Arc::new(transport.clone()),
                host: Arc::new(host.clone()),
                store: Arc::new(store.clone()),
                clock: Arc::new(FakeClock::new()),
            },
            config,
            Identity::adopt(AgentId::new(agent_id)),
        );
        agent.start().await;
        Self { transport, host, store, agent }
    }

    /// Deliver an assignment the way the server would.
    pub async fn assign(&self, id: &str, query: &str, timeout_ms: Option<u64>) {
        let options = JobOptions { timeout: timeout_ms, ..JobOptions::default() };
        let payload = JobAssignment { job_id: JobId::new(id), query: query.to_string(), options };
        self.transport.emit_message(ServerMessage::JobAssigned { payload }).await;
    }

    pub fn results(&self) -> Vec<JobReport> {
        self.transport.results()
    }
}

pub fn pool_of(size: usize) -> CoordinatorConfig {
    CoordinatorConfig { pool_size: size, ..CoordinatorConfig::default() }
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
