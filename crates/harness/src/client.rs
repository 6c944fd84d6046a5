//! REST client for the manager's `/api/v3.1` surface.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use vigil_config::{
    Blueprint, Broker, ClusterNode, Credentials, Deployment, DeploymentCreateRequest,
    ErrorResponse, Event, Execution, ExecutionStartRequest, ListResponse, Manager, ManagerStatus,
    NodeInstance, NodeInstanceUpdate, Snapshot, SnapshotCreateRequest, SnapshotRestoreRequest,
    VersionInfo,
};

use crate::error::ApiError;

const API_PREFIX: &str = "/api/v3.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Authenticated client for one manager.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct Api {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl Api {
    /// `address` is a bare host (`10.0.0.1`, `10.0.0.1:8080`) or a URL with
    /// scheme. Bare hosts get `http://`.
    pub fn new(address: &str, credentials: &Credentials) -> Self {
        Self::with_timeout(address, credentials, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(address: &str, credentials: &Credentials, timeout: Duration) -> Self {
        let address = address.trim_end_matches('/');
        let base_url = if address.contains("://") {
            address.to_owned()
        } else {
            format!("http://{address}")
        };
        Self {
            client: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
            base_url,
            credentials: credentials.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{API_PREFIX}{path}", self.base_url))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header("Tenant", &self.credentials.tenant)
    }

    /// Map non-2xx responses to `ApiError::Status`, keeping the manager's
    /// structured error code when the body carries one.
    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => (err.error_code, err.message),
            Err(_) => (None, body.trim().to_owned()),
        };
        Err(ApiError::Status { status: status.as_u16(), code, message })
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> ApiResult<T> {
        let response = Self::check(builder.send().await?).await?;
        response.json().await.map_err(ApiError::Decode)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        Self::send_json(self.request(Method::GET, path)).await
    }

    async fn get_items<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<Vec<T>> {
        let list: ListResponse<T> =
            Self::send_json(self.request(Method::GET, path).query(query)).await?;
        Ok(list.items)
    }

    async fn send<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        Self::send_json(self.request(method, path).json(body)).await
    }

    // -- status --

    pub async fn status(&self) -> ApiResult<ManagerStatus> {
        self.get("/status").await
    }

    pub async fn version(&self) -> ApiResult<VersionInfo> {
        self.get("/version").await
    }

    /// Raw cluster status body, exactly as the manager returned it.
    pub async fn cluster_status(&self) -> ApiResult<String> {
        let builder = self.request(Method::GET, "/cluster/status");
        let response = Self::check(builder.send().await?).await?;
        response.text().await.map_err(ApiError::Decode)
    }

    pub async fn cluster_nodes(&self) -> ApiResult<Vec<ClusterNode>> {
        self.get_items("/cluster/nodes", &[]).await
    }

    pub async fn managers(&self) -> ApiResult<Vec<Manager>> {
        self.get_items("/managers", &[]).await
    }

    pub async fn brokers(&self) -> ApiResult<Vec<Broker>> {
        self.get_items("/brokers", &[]).await
    }

    // -- snapshots --

    pub async fn snapshots_list(&self) -> ApiResult<Vec<Snapshot>> {
        self.get_items("/snapshots", &[]).await
    }

    pub async fn snapshots_get(&self, id: &str) -> ApiResult<Snapshot> {
        self.get(&format!("/snapshots/{id}")).await
    }

    /// Start snapshot creation. Returns the `create_snapshot` execution.
    pub async fn snapshots_create(
        &self,
        id: &str,
        request: &SnapshotCreateRequest,
    ) -> ApiResult<Execution> {
        self.send(Method::PUT, &format!("/snapshots/{id}"), request).await
    }

    /// Start a restore. Returns the `restore_snapshot` execution.
    pub async fn snapshots_restore(
        &self,
        id: &str,
        request: &SnapshotRestoreRequest,
    ) -> ApiResult<Execution> {
        self.send(Method::POST, &format!("/snapshots/{id}/restore"), request).await
    }

    pub async fn snapshots_download(&self, id: &str) -> ApiResult<Vec<u8>> {
        let builder = self.request(Method::GET, &format!("/snapshots/{id}/archive"));
        let response = Self::check(builder.send().await?).await?;
        Ok(response.bytes().await.map_err(ApiError::Decode)?.to_vec())
    }

    pub async fn snapshots_upload(&self, id: &str, archive: Vec<u8>) -> ApiResult<Snapshot> {
        let builder = self.request(Method::PUT, &format!("/snapshots/{id}/archive")).body(archive);
        Self::send_json(builder).await
    }

    pub async fn snapshots_delete(&self, id: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, &format!("/snapshots/{id}"));
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    // -- executions --

    pub async fn executions_get(&self, id: &str) -> ApiResult<Execution> {
        self.get(&format!("/executions/{id}")).await
    }

    pub async fn executions_list(&self, deployment_id: Option<&str>) -> ApiResult<Vec<Execution>> {
        match deployment_id {
            Some(id) => self.get_items("/executions", &[("deployment_id", id)]).await,
            None => self.get_items("/executions", &[]).await,
        }
    }

    pub async fn executions_start(&self, request: &ExecutionStartRequest) -> ApiResult<Execution> {
        self.send(Method::POST, "/executions", request).await
    }

    pub async fn events(&self, execution_id: &str) -> ApiResult<Vec<Event>> {
        self.get_items("/events", &[("execution_id", execution_id)]).await
    }

    // -- node instances --

    pub async fn node_instances_list(&self, deployment_id: &str) -> ApiResult<Vec<NodeInstance>> {
        self.get_items("/node-instances", &[("deployment_id", deployment_id)]).await
    }

    pub async fn node_instances_get(&self, id: &str) -> ApiResult<NodeInstance> {
        self.get(&format!("/node-instances/{id}")).await
    }

    /// Optimistic update: the manager rejects it with 409 when `version`
    /// is stale.
    pub async fn node_instances_update(
        &self,
        id: &str,
        update: &NodeInstanceUpdate,
    ) -> ApiResult<NodeInstance> {
        self.send(Method::PATCH, &format!("/node-instances/{id}"), update).await
    }

    // -- blueprints and deployments --

    pub async fn blueprints_upload(
        &self,
        id: &str,
        archive: Vec<u8>,
        application_file_name: &str,
    ) -> ApiResult<Blueprint> {
        let builder = self
            .request(Method::PUT, &format!("/blueprints/{id}"))
            .query(&[("application_file_name", application_file_name)])
            .body(archive);
        Self::send_json(builder).await
    }

    pub async fn deployments_create(
        &self,
        id: &str,
        request: &DeploymentCreateRequest,
    ) -> ApiResult<Deployment> {
        self.send(Method::PUT, &format!("/deployments/{id}"), request).await
    }
}
