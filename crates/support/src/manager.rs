//! In-process manager REST API for tests.
//!
//! Serves the subset of `/api/v3.1` the harness talks to from in-memory
//! state. Snapshot and execution statuses follow scripts: every GET advances
//! one step and the final step repeats, so pollers see realistic progress.

use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use base64::Engine as _;
use parking_lot::Mutex;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use vigil_config::{
    Blueprint, Broker, ClusterNode, Credentials, Deployment, DeploymentCreateRequest,
    ErrorResponse, Event, Execution, ExecutionStartRequest, ExecutionStatus, ListResponse,
    Manager, ManagerStatus, NodeInstance, NodeInstanceUpdate, ServiceStatus, Settings, Snapshot,
    SnapshotCreateRequest, SnapshotRestoreRequest, SnapshotStatus, VersionInfo,
};

pub const NOT_ACTIVE_MESSAGE: &str = "It is not the active manager";

struct SnapshotEntry {
    steps: VecDeque<SnapshotStatus>,
    error: String,
}

struct ExecutionEntry {
    execution: Execution,
    steps: VecDeque<ExecutionStatus>,
    error: String,
}

/// Advance a script one step; the last step repeats.
fn advance<T: Copy>(steps: &mut VecDeque<T>) -> Option<T> {
    if steps.len() > 1 { steps.pop_front() } else { steps.front().copied() }
}

struct FakeState {
    status: ManagerStatus,
    version: VersionInfo,
    cluster_nodes: Vec<ClusterNode>,
    cluster_status: Option<String>,
    managers: Vec<Manager>,
    brokers: Vec<Broker>,
    snapshots: BTreeMap<String, SnapshotEntry>,
    archives: BTreeMap<String, Vec<u8>>,
    executions: BTreeMap<String, ExecutionEntry>,
    events: BTreeMap<String, Vec<Event>>,
    node_instances: BTreeMap<String, NodeInstance>,
    blueprints: BTreeMap<String, Blueprint>,
    deployments: BTreeMap<String, Deployment>,
    snapshot_script: (Vec<SnapshotStatus>, String),
    execution_script: (Vec<ExecutionStatus>, String),
    execution_seq: u64,
    standby: bool,
    unavailable: bool,
    requests: Vec<String>,
}

impl FakeState {
    fn new() -> Self {
        let services = ["restservice", "postgresql", "rabbitmq"]
            .into_iter()
            .map(|s| (s.to_owned(), ServiceStatus { status: "Active".to_owned() }))
            .collect();
        Self {
            status: ManagerStatus { status: "OK".to_owned(), services },
            version: VersionInfo {
                version: "5.0.5".to_owned(),
                edition: "premium".to_owned(),
                build: None,
            },
            cluster_nodes: Vec::new(),
            cluster_status: None,
            managers: Vec::new(),
            brokers: Vec::new(),
            snapshots: BTreeMap::new(),
            archives: BTreeMap::new(),
            executions: BTreeMap::new(),
            events: BTreeMap::new(),
            node_instances: BTreeMap::new(),
            blueprints: BTreeMap::new(),
            deployments: BTreeMap::new(),
            snapshot_script: (
                vec![SnapshotStatus::Creating, SnapshotStatus::Created],
                String::new(),
            ),
            execution_script: (
                vec![
                    ExecutionStatus::Pending,
                    ExecutionStatus::Started,
                    ExecutionStatus::Terminated,
                ],
                String::new(),
            ),
            execution_seq: 0,
            standby: false,
            unavailable: false,
            requests: Vec::new(),
        }
    }

    fn start_execution(&mut self, workflow_id: &str, deployment_id: Option<String>) -> Execution {
        self.execution_seq += 1;
        let id = format!("exec-{}", self.execution_seq);
        let (steps, error) = self.execution_script.clone();
        let mut steps: VecDeque<_> = steps.into();
        let status = steps.front().copied().unwrap_or(ExecutionStatus::Terminated);
        if steps.is_empty() {
            steps.push_back(status);
        }
        let execution = Execution {
            id: id.clone(),
            workflow_id: workflow_id.to_owned(),
            deployment_id,
            status,
            error: String::new(),
            created_at: None,
        };
        let mut events = vec![event(&format!("Starting '{workflow_id}' workflow execution"))];
        if steps.back().is_some_and(|s| !s.is_success()) && !error.is_empty() {
            events.push(event(&error));
        }
        self.events.insert(id.clone(), events);
        self.executions
            .insert(id, ExecutionEntry { execution: execution.clone(), steps, error });
        execution
    }
}

fn event(message: &str) -> Event {
    Event {
        timestamp: None,
        event_type: Some("workflow_event".to_owned()),
        level: Some("info".to_owned()),
        message: message.to_owned(),
    }
}

#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<FakeState>>,
    authorization: String,
    tenant: String,
}

type ApiErr = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: Option<&str>, message: impl Into<String>) -> ApiErr {
    (status, Json(ErrorResponse { message: message.into(), error_code: code.map(str::to_owned) }))
}

fn not_found(kind: &str, id: &str) -> ApiErr {
    api_error(
        StatusCode::NOT_FOUND,
        Some("not_found_error"),
        format!("Requested `{kind}` with ID `{id}` was not found"),
    )
}

/// A manager REST API on an ephemeral localhost port.
pub struct FakeManager {
    addr: SocketAddr,
    state: Arc<Mutex<FakeState>>,
    credentials: Credentials,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl FakeManager {
    /// Start with the default credentials (`Settings::default()`).
    pub async fn start() -> Self {
        Self::start_with(&Settings::default().credentials).await
    }

    pub async fn start_with(credentials: &Credentials) -> Self {
        let state = Arc::new(Mutex::new(FakeState::new()));
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", credentials.username, credentials.password));
        let app = AppState {
            inner: Arc::clone(&state),
            authorization: format!("Basic {encoded}"),
            tenant: credentials.tenant.clone(),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router(app))
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            credentials: credentials.clone(),
            shutdown: Some(tx),
            server: Some(server),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL without the API prefix, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Stop accepting connections and wait for the server task to end.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), server).await;
        }
    }

    // -- scripting --

    pub fn set_cluster_nodes(&self, nodes: Vec<ClusterNode>) {
        self.state.lock().cluster_nodes = nodes;
    }

    /// Serve `raw` from `/cluster/status` instead of the node listing.
    pub fn set_cluster_status_raw(&self, raw: Option<&str>) {
        self.state.lock().cluster_status = raw.map(str::to_owned);
    }

    pub fn set_managers(&self, managers: Vec<Manager>) {
        self.state.lock().managers = managers;
    }

    pub fn set_brokers(&self, brokers: Vec<Broker>) {
        self.state.lock().brokers = brokers;
    }

    pub fn set_status(&self, status: ManagerStatus) {
        self.state.lock().status = status;
    }

    pub fn set_edition(&self, edition: &str) {
        self.state.lock().version.edition = edition.to_owned();
    }

    /// Reject writes the way a non-leader manager does.
    pub fn set_standby(&self, standby: bool) {
        self.state.lock().standby = standby;
    }

    /// Answer every request with 503.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Status sequence for snapshots created from now on. `error` is
    /// reported once the script ends in `failed`.
    pub fn script_snapshots(&self, steps: Vec<SnapshotStatus>, error: &str) {
        self.state.lock().snapshot_script = (steps, error.to_owned());
    }

    /// Status sequence for executions started from now on.
    pub fn script_executions(&self, steps: Vec<ExecutionStatus>, error: &str) {
        self.state.lock().execution_script = (steps, error.to_owned());
    }

    pub fn add_node_instance(&self, instance: NodeInstance) {
        self.state.lock().node_instances.insert(instance.id.clone(), instance);
    }

    pub fn add_snapshot_archive(&self, id: &str, archive: Vec<u8>) {
        let mut state = self.state.lock();
        state.archives.insert(id.to_owned(), archive);
        let entry =
            SnapshotEntry { steps: [SnapshotStatus::Created].into(), error: String::new() };
        state.snapshots.insert(id.to_owned(), entry);
    }

    // -- inspection --

    /// `METHOD /path` of every request received, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn snapshot_archive(&self, id: &str) -> Option<Vec<u8>> {
        self.state.lock().archives.get(id).cloned()
    }

    pub fn node_instance(&self, id: &str) -> Option<NodeInstance> {
        self.state.lock().node_instances.get(id).cloned()
    }

    pub fn blueprint_ids(&self) -> Vec<String> {
        self.state.lock().blueprints.keys().cloned().collect()
    }

    pub fn deployment_ids(&self) -> Vec<String> {
        self.state.lock().deployments.keys().cloned().collect()
    }

    pub fn execution_count(&self) -> usize {
        self.state.lock().executions.len()
    }
}

impl Drop for FakeManager {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn router(state: AppState) -> Router {
    let read_routes = Router::new()
        .route("/status", get(get_status))
        .route("/version", get(get_version))
        .route("/cluster/status", get(get_cluster_status))
        .route("/cluster/nodes", get(get_cluster_nodes))
        .route("/managers", get(get_managers))
        .route("/brokers", get(get_brokers))
        .route("/snapshots", get(list_snapshots))
        .route("/snapshots/{id}", get(get_snapshot))
        .route("/snapshots/{id}/archive", get(download_archive))
        .route("/executions", get(list_executions))
        .route("/executions/{id}", get(get_execution))
        .route("/events", get(list_events))
        .route("/node-instances", get(list_node_instances))
        .route("/node-instances/{id}", get(get_node_instance));

    let write_routes = Router::new()
        .route("/snapshots/{id}", put(create_snapshot).delete(delete_snapshot))
        .route("/snapshots/{id}/restore", post(restore_snapshot))
        .route("/snapshots/{id}/archive", put(upload_archive))
        .route("/executions", post(start_execution))
        .route("/node-instances/{id}", patch(update_node_instance))
        .route("/blueprints/{id}", put(upload_blueprint))
        .route("/deployments/{id}", put(create_deployment))
        .layer(from_fn_with_state(state.clone(), require_active));

    let api = Router::new()
        .merge(read_routes)
        .merge(write_routes)
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/v3.1", api)
        .layer(from_fn_with_state(state.clone(), track))
        .with_state(state)
}

// -- middleware --

/// Record the request; answer 503 while the manager is marked unavailable.
async fn track(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let unavailable = {
        let mut inner = state.inner.lock();
        inner.requests.push(format!("{} {}", request.method(), request.uri().path()));
        inner.unavailable
    };
    if unavailable {
        return api_error(StatusCode::SERVICE_UNAVAILABLE, None, "manager unavailable")
            .into_response();
    }
    next.run(request).await
}

/// Basic auth plus the `Tenant` header.
async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiErr> {
    let (authorized, tenant_ok) = {
        let headers = request.headers();
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let authorized = header("authorization")
            .is_some_and(|v| bool::from(v.as_bytes().ct_eq(state.authorization.as_bytes())));
        (authorized, header("tenant") == Some(state.tenant.as_str()))
    };
    if !authorized {
        return Err(api_error(
            StatusCode::UNAUTHORIZED,
            Some("unauthorized_error"),
            "User unauthorized",
        ));
    }
    if !tenant_ok {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            Some("forbidden_error"),
            "User is not associated with the requested tenant",
        ));
    }
    Ok(next.run(request).await)
}

/// Writes are only accepted by the active manager.
async fn require_active(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiErr> {
    if state.inner.lock().standby {
        return Err(api_error(StatusCode::BAD_REQUEST, None, NOT_ACTIVE_MESSAGE));
    }
    Ok(next.run(request).await)
}

// -- read handlers --

async fn get_status(State(state): State<AppState>) -> Json<ManagerStatus> {
    Json(state.inner.lock().status.clone())
}

async fn get_version(State(state): State<AppState>) -> Json<VersionInfo> {
    Json(state.inner.lock().version.clone())
}

async fn get_cluster_status(State(state): State<AppState>) -> Response {
    let inner = state.inner.lock();
    match &inner.cluster_status {
        Some(raw) => raw.clone().into_response(),
        None => Json(ListResponse::new(inner.cluster_nodes.clone())).into_response(),
    }
}

async fn get_cluster_nodes(State(state): State<AppState>) -> Json<ListResponse<ClusterNode>> {
    Json(ListResponse::new(state.inner.lock().cluster_nodes.clone()))
}

async fn get_managers(State(state): State<AppState>) -> Json<ListResponse<Manager>> {
    Json(ListResponse::new(state.inner.lock().managers.clone()))
}

async fn get_brokers(State(state): State<AppState>) -> Json<ListResponse<Broker>> {
    Json(ListResponse::new(state.inner.lock().brokers.clone()))
}

fn snapshot_view(id: &str, entry: &SnapshotEntry, status: SnapshotStatus) -> Snapshot {
    let error = if status == SnapshotStatus::Failed { entry.error.clone() } else { String::new() };
    Snapshot { id: id.to_owned(), status, error, created_at: None }
}

async fn list_snapshots(State(state): State<AppState>) -> Json<ListResponse<Snapshot>> {
    let inner = state.inner.lock();
    let items = inner
        .snapshots
        .iter()
        .filter_map(|(id, entry)| {
            entry.steps.front().map(|status| snapshot_view(id, entry, *status))
        })
        .collect();
    Json(ListResponse::new(items))
}

async fn get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiErr> {
    let mut inner = state.inner.lock();
    let entry = inner.snapshots.get_mut(&id).ok_or_else(|| not_found("Snapshot", &id))?;
    let status = advance(&mut entry.steps).unwrap_or(SnapshotStatus::Created);
    Ok(Json(snapshot_view(&id, entry, status)))
}

async fn download_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Vec<u8>, ApiErr> {
    state.inner.lock().archives.get(&id).cloned().ok_or_else(|| not_found("Snapshot", &id))
}

#[derive(Deserialize)]
struct DeploymentFilter {
    deployment_id: Option<String>,
}

async fn list_executions(
    State(state): State<AppState>,
    Query(filter): Query<DeploymentFilter>,
) -> Json<ListResponse<Execution>> {
    let inner = state.inner.lock();
    let items = inner
        .executions
        .values()
        .map(|e| e.execution.clone())
        .filter(|e| filter.deployment_id.is_none() || e.deployment_id == filter.deployment_id)
        .collect();
    Json(ListResponse::new(items))
}

async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Execution>, ApiErr> {
    let mut inner = state.inner.lock();
    let entry = inner.executions.get_mut(&id).ok_or_else(|| not_found("Execution", &id))?;
    if let Some(status) = advance(&mut entry.steps) {
        entry.execution.status = status;
        if status.is_terminal() && !status.is_success() {
            entry.execution.error = entry.error.clone();
        }
    }
    Ok(Json(entry.execution.clone()))
}

#[derive(Deserialize)]
struct EventFilter {
    execution_id: String,
}

async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Json<ListResponse<Event>> {
    let events = state.inner.lock().events.get(&filter.execution_id).cloned().unwrap_or_default();
    Json(ListResponse::new(events))
}

async fn list_node_instances(
    State(state): State<AppState>,
    Query(filter): Query<DeploymentFilter>,
) -> Json<ListResponse<NodeInstance>> {
    let inner = state.inner.lock();
    let items = inner
        .node_instances
        .values()
        .filter(|n| filter.deployment_id.as_ref().is_none_or(|d| *d == n.deployment_id))
        .cloned()
        .collect();
    Json(ListResponse::new(items))
}

async fn get_node_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NodeInstance>, ApiErr> {
    let inner = state.inner.lock();
    inner.node_instances.get(&id).cloned().map(Json).ok_or_else(|| not_found("NodeInstance", &id))
}

// -- write handlers --

async fn create_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(_request): Json<SnapshotCreateRequest>,
) -> Result<Json<Execution>, ApiErr> {
    let mut inner = state.inner.lock();
    if inner.snapshots.contains_key(&id) {
        return Err(api_error(
            StatusCode::CONFLICT,
            Some("conflict_error"),
            format!("Snapshot `{id}` already exists (conflict)"),
        ));
    }
    let (steps, error) = inner.snapshot_script.clone();
    if steps.last() != Some(&SnapshotStatus::Failed) {
        inner.archives.insert(id.clone(), format!("snapshot:{id}").into_bytes());
    }
    inner.snapshots.insert(id.clone(), SnapshotEntry { steps: steps.into(), error });
    Ok(Json(inner.start_execution("create_snapshot", None)))
}

async fn delete_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiErr> {
    let mut inner = state.inner.lock();
    inner.snapshots.remove(&id).ok_or_else(|| not_found("Snapshot", &id))?;
    inner.archives.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(_request): Json<SnapshotRestoreRequest>,
) -> Result<Json<Execution>, ApiErr> {
    let mut inner = state.inner.lock();
    if !inner.snapshots.contains_key(&id) {
        return Err(not_found("Snapshot", &id));
    }
    Ok(Json(inner.start_execution("restore_snapshot", None)))
}

async fn upload_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Json<Snapshot> {
    let mut inner = state.inner.lock();
    inner.archives.insert(id.clone(), body.to_vec());
    let entry = SnapshotEntry {
        steps: VecDeque::from([SnapshotStatus::Uploading, SnapshotStatus::Uploaded]),
        error: String::new(),
    };
    let view = snapshot_view(&id, &entry, SnapshotStatus::Uploading);
    inner.snapshots.insert(id, entry);
    Json(view)
}

async fn start_execution(
    State(state): State<AppState>,
    Json(request): Json<ExecutionStartRequest>,
) -> Json<Execution> {
    let mut inner = state.inner.lock();
    Json(inner.start_execution(&request.workflow_id, Some(request.deployment_id)))
}

async fn update_node_instance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<NodeInstanceUpdate>,
) -> Result<Json<NodeInstance>, ApiErr> {
    let mut inner = state.inner.lock();
    let instance =
        inner.node_instances.get_mut(&id).ok_or_else(|| not_found("NodeInstance", &id))?;
    if update.version != instance.version {
        return Err(api_error(
            StatusCode::CONFLICT,
            Some("conflict_error"),
            format!(
                "Node instance update conflict: version {} is stale (current {})",
                update.version, instance.version
            ),
        ));
    }
    if let Some(new_state) = update.state {
        instance.state = new_state;
    }
    if let Some(props) = update.runtime_properties {
        instance.runtime_properties = props;
    }
    instance.version += 1;
    Ok(Json(instance.clone()))
}

#[derive(Deserialize)]
struct BlueprintParams {
    application_file_name: Option<String>,
}

async fn upload_blueprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<BlueprintParams>,
    body: Bytes,
) -> Result<Json<Blueprint>, ApiErr> {
    if body.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            Some("invalid_blueprint_error"),
            "empty archive",
        ));
    }
    let file = params.application_file_name.unwrap_or_else(|| "blueprint.yaml".to_owned());
    if !file.ends_with(".yaml") && !file.ends_with(".yml") {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            Some("invalid_blueprint_error"),
            format!("{file} is not a YAML file"),
        ));
    }
    let blueprint = Blueprint { id: id.clone(), state: Some("uploaded".to_owned()) };
    state.inner.lock().blueprints.insert(id, blueprint.clone());
    Ok(Json(blueprint))
}

async fn create_deployment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeploymentCreateRequest>,
) -> Result<Json<Deployment>, ApiErr> {
    let mut inner = state.inner.lock();
    if !inner.blueprints.contains_key(&request.blueprint_id) {
        return Err(not_found("Blueprint", &request.blueprint_id));
    }
    if inner.deployments.contains_key(&id) {
        return Err(api_error(
            StatusCode::CONFLICT,
            Some("conflict_error"),
            format!("Deployment `{id}` already exists (conflict)"),
        ));
    }
    let deployment = Deployment { id: id.clone(), blueprint_id: request.blueprint_id };
    inner.deployments.insert(id, deployment.clone());
    Ok(Json(deployment))
}
