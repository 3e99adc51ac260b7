// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource host adapter.
//!
//! The host owns the actual resources (browser tabs); the agent only holds
//! their handles. A handle the host no longer knows is defunct.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_core::{ResourceId, ResourceInfo};
use tf_wire::{ResourceRequest, ResourceResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("resource not found: {0}")]
    NotFound(ResourceId),
    #[error("create failed: {0}")]
    CreateFailed(String),
    #[error("no response from resource {0}")]
    NoResponse(ResourceId),
    #[error("host request failed: {0}")]
    Request(String),
}

/// Adapter for the environment hosting pooled resources.
#[async_trait]
pub trait ResourceHost: Send + Sync + 'static {
    /// Create a blank resource in `placement` (host default when `None`).
    async fn create(&self, placement: Option<&str>) -> Result<ResourceInfo, HostError>;

    /// Current view of a resource. `NotFound` means it is gone.
    async fn get(&self, id: &ResourceId) -> Result<ResourceInfo, HostError>;

    async fn navigate(&self, id: &ResourceId, url: &str) -> Result<(), HostError>;

    /// Deliver a request to the page running in the resource.
    async fn send(
        &self,
        id: &ResourceId,
        request: &ResourceRequest,
    ) -> Result<ResourceResponse, HostError>;

    /// Placement new resources land in when none is requested.
    async fn default_placement(&self) -> Result<Option<String>, HostError>;

    async fn exists(&self, id: &ResourceId) -> bool {
        self.get(id).await.is_ok()
    }
}

/// HTTP bridge to a host helper process.
///
/// Endpoints are relative to the bridge base URL:
/// `POST /resources`, `GET /resources/{id}`, `POST /resources/{id}/navigate`,
/// `POST /resources/{id}/message`, `GET /placement`.
#[derive(Clone)]
pub struct BridgeHost {
    client: reqwest::Client,
    base: String,
}

#[derive(Serialize)]
struct CreateBody<'a> {
    placement: Option<&'a str>,
}

#[derive(Serialize)]
struct NavigateBody<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct PlacementReply {
    #[serde(default)]
    placement: Option<String>,
}

impl BridgeHost {
    pub fn new(base: impl Into<String>) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HostError::Request(e.to_string()))?;
        Ok(Self { client, base: base.into().trim_end_matches('/').to_string() })
    }

    fn resource_url(&self, id: &ResourceId, tail: &str) -> String {
        format!("{}/resources/{}{}", self.base, urlencoding::encode(id.as_str()), tail)
    }
}

fn request_error(e: reqwest::Error) -> HostError {
    HostError::Request(e.to_string())
}

#[async_trait]
impl ResourceHost for BridgeHost {
    async fn create(&self, placement: Option<&str>) -> Result<ResourceInfo, HostError> {
        let response = self
            .client
            .post(format!("{}/resources", self.base))
            .json(&CreateBody { placement })
            .send()
            .await
            .map_err(|e| HostError::CreateFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(HostError::CreateFailed(format!("status {}", response.status())));
        }
        response.json().await.map_err(|e| HostError::CreateFailed(e.to_string()))
    }

    async fn get(&self, id: &ResourceId) -> Result<ResourceInfo, HostError> {
        let response =
            self.client.get(self.resource_url(id, "")).send().await.map_err(request_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(HostError::NotFound(id.clone()));
        }
        let response = response.error_for_status().map_err(request_error)?;
        response.json().await.map_err(request_error)
    }

    async fn navigate(&self, id: &ResourceId, url: &str) -> Result<(), HostError> {
        let response = self
            .client
            .post(self.resource_url(id, "/navigate"))
            .json(&NavigateBody { url })
            .send()
            .await
            .map_err(request_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(HostError::NotFound(id.clone()));
        }
        response.error_for_status().map_err(request_error)?;
        Ok(())
    }

    async fn send(
        &self,
        id: &ResourceId,
        request: &ResourceRequest,
    ) -> Result<ResourceResponse, HostError> {
        let response = self
            .client
            .post(self.resource_url(id, "/message"))
            .json(request)
            .send()
            .await
            .map_err(request_error)?;
        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Err(HostError::NotFound(id.clone())),
            reqwest::StatusCode::NO_CONTENT => Err(HostError::NoResponse(id.clone())),
            _ => {
                let response = response.error_for_status().map_err(request_error)?;
                response.json().await.map_err(request_error)
            }
        }
    }

    async fn default_placement(&self) -> Result<Option<String>, HostError> {
        let response = self
            .client
            .get(format!("{}/placement", self.base))
            .send()
            .await
            .map_err(request_error)?
            .error_for_status()
            .map_err(request_error)?;
        let reply: PlacementReply = response.json().await.map_err(request_error)?;
        Ok(reply.placement)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{HostError, ResourceHost};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tf_core::{LoadStatus, ResourceId, ResourceInfo, BLANK_URL};
    use tf_wire::{ResourceRequest, ResourceResponse};

    /// Recorded host call
    #[derive(Debug, Clone, PartialEq)]
    pub enum HostCall {
        Create { placement: Option<String> },
        Navigate { id: ResourceId, url: String },
        Send { id: ResourceId, request: ResourceRequest },
    }

    struct FakeHostState {
        resources: Vec<ResourceInfo>,
        next_id: u64,
        calls: Vec<HostCall>,
        default_placement: Option<String>,
        fail_creates: bool,
        status_error: bool,
        settle_loading: bool,
        response: Option<ResourceResponse>,
        send_delay: Option<Duration>,
    }

    /// In-memory host for tests. Ids are sequential integers from 1.
    #[derive(Clone)]
    pub struct FakeHost {
        inner: Arc<Mutex<FakeHostState>>,
    }

    impl Default for FakeHost {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeHostState {
                    resources: Vec::new(),
                    next_id: 1,
                    calls: Vec::new(),
                    default_placement: Some("w1".to_string()),
                    fail_creates: false,
                    status_error: false,
                    settle_loading: false,
                    response: None,
                    send_delay: None,
                })),
            }
        }
    }

    impl FakeHost {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a resource that already exists on the host.
        pub fn insert(&self, info: ResourceInfo) {
            let mut state = self.inner.lock();
            if let Ok(n) = info.id.as_str().parse::<u64>() {
                state.next_id = state.next_id.max(n + 1);
            }
            state.resources.push(info);
        }

        /// Destroy a resource behind the agent's back.
        pub fn kill(&self, id: &ResourceId) {
            self.inner.lock().resources.retain(|r| &r.id != id);
        }

        pub fn ids(&self) -> Vec<ResourceId> {
            self.inner.lock().resources.iter().map(|r| r.id.clone()).collect()
        }

        pub fn resource(&self, id: &ResourceId) -> Option<ResourceInfo> {
            self.inner.lock().resources.iter().find(|r| &r.id == id).cloned()
        }

        pub fn set_fail_creates(&self, fail: bool) {
            self.inner.lock().fail_creates = fail;
        }

        /// Make `get` fail with a transport error instead of answering.
        pub fn set_status_error(&self, fail: bool) {
            self.inner.lock().status_error = fail;
        }

        /// Keep navigated resources in `Loading` until [`FakeHost::finish_loading`].
        pub fn set_settle_loading(&self, loading: bool) {
            self.inner.lock().settle_loading = loading;
        }

        pub fn finish_loading(&self, id: &ResourceId) {
            if let Some(r) = self.inner.lock().resources.iter_mut().find(|r| &r.id == id) {
                r.status = LoadStatus::Complete;
            }
        }

        /// Reply used for every resource request (default: success echoing the job id).
        pub fn set_response(&self, response: ResourceResponse) {
            self.inner.lock().response = Some(response);
        }

        pub fn set_send_delay(&self, delay: Duration) {
            self.inner.lock().send_delay = Some(delay);
        }

        pub fn calls(&self) -> Vec<HostCall> {
            self.inner.lock().calls.clone()
        }

        pub fn navigations(&self) -> Vec<(ResourceId, String)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    HostCall::Navigate { id, url } => Some((id, url)),
                    _ => None,
                })
                .collect()
        }

        pub fn create_count(&self) -> usize {
            self.calls().iter().filter(|c| matches!(c, HostCall::Create { .. })).count()
        }
    }

    #[async_trait]
    impl ResourceHost for FakeHost {
        async fn create(&self, placement: Option<&str>) -> Result<ResourceInfo, HostError> {
            let mut state = self.inner.lock();
            state.calls.push(HostCall::Create { placement: placement.map(str::to_string) });
            if state.fail_creates {
                return Err(HostError::CreateFailed("host refused".to_string()));
            }
            let id = ResourceId::new(state.next_id.to_string());
            state.next_id += 1;
            let info = ResourceInfo {
                id,
                placement: placement.map(str::to_string).or_else(|| state.default_placement.clone()),
                url: BLANK_URL.to_string(),
                status: LoadStatus::Complete,
            };
            state.resources.push(info.clone());
            Ok(info)
        }

        async fn get(&self, id: &ResourceId) -> Result<ResourceInfo, HostError> {
            let state = self.inner.lock();
            if state.status_error {
                return Err(HostError::Request("host unavailable".to_string()));
            }
            state
                .resources
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| HostError::NotFound(id.clone()))
        }

        async fn navigate(&self, id: &ResourceId, url: &str) -> Result<(), HostError> {
            let mut state = self.inner.lock();
            state.calls.push(HostCall::Navigate { id: id.clone(), url: url.to_string() });
            let loading = state.settle_loading;
            let resource = state
                .resources
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| HostError::NotFound(id.clone()))?;
            resource.url = url.to_string();
            resource.status = if loading { LoadStatus::Loading } else { LoadStatus::Complete };
            Ok(())
        }

        async fn send(
            &self,
            id: &ResourceId,
            request: &ResourceRequest,
        ) -> Result<ResourceResponse, HostError> {
            let delay = {
                let mut state = self.inner.lock();
                state.calls.push(HostCall::Send { id: id.clone(), request: request.clone() });
                if !state.resources.iter().any(|r| &r.id == id) {
                    return Err(HostError::NotFound(id.clone()));
                }
                state.send_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let state = self.inner.lock();
            Ok(state.response.clone().unwrap_or_else(|| {
                let ResourceRequest::CollectPageData { job_id } = request;
                ResourceResponse::ok(serde_json::json!({ "jobId": job_id, "items": [] }))
            }))
        }

        async fn default_placement(&self) -> Result<Option<String>, HostError> {
            Ok(self.inner.lock().default_placement.clone())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeHost, HostCall};

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
