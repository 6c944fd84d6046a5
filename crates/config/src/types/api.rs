use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::{ExecutionStatus, SnapshotStatus};

/// Paginated list envelope used by every manager collection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub metadata: Option<ListMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMetadata {
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub total: usize,
    pub size: usize,
    pub offset: usize,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self {
            items,
            metadata: Some(ListMetadata {
                pagination: Pagination { total, size: total, offset: 0 },
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub workflow_id: String,
    #[serde(default)]
    pub deployment_id: Option<String>,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub status: SnapshotStatus,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,
    pub node_id: String,
    pub deployment_id: String,
    pub state: String,
    pub version: u64,
    #[serde(default)]
    pub runtime_properties: BTreeMap<String, Value>,
}

/// Manager health (`GET /status`). `status` is `OK` or `Fail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceStatus>,
}

impl ManagerStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "OK"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub edition: String,
    #[serde(default)]
    pub build: Option<String>,
}

/// A member of the manager HA cluster (`GET /cluster/nodes`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterNode {
    pub name: String,
    pub host_ip: String,
    #[serde(default)]
    pub master: bool,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manager {
    pub hostname: String,
    pub private_ip: String,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Broker {
    pub name: String,
    pub host: String,
    #[serde(default)]
    pub management_host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub blueprint_id: String,
}

/// Error body returned by the manager for any non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotCreateRequest {
    #[serde(default)]
    pub include_credentials: bool,
    #[serde(default)]
    pub include_logs: bool,
    #[serde(default)]
    pub include_events: bool,
    #[serde(default)]
    pub queue: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotRestoreRequest {
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub restore_certificates: bool,
    #[serde(default)]
    pub no_reboot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStartRequest {
    pub deployment_id: String,
    pub workflow_id: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstanceUpdate {
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_properties: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentCreateRequest {
    pub blueprint_id: String,
    #[serde(default)]
    pub inputs: Value,
}
