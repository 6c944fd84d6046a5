mod api;
mod settings;
mod status;

pub use api::{
    Blueprint, Broker, ClusterNode, Deployment, DeploymentCreateRequest, ErrorResponse, Event,
    Execution, ExecutionStartRequest, ListMetadata, ListResponse, Manager, ManagerStatus,
    NodeInstance, NodeInstanceUpdate, Pagination, ServiceStatus, Snapshot, SnapshotCreateRequest,
    SnapshotRestoreRequest, VersionInfo,
};
pub use settings::{
    CLEANUP_ENV, CONFIG_PATH_ENV, Credentials, DatabaseSettings, HANDLER_CONFIG_ENV, HostSpec,
    RawCredentials, RawDatabase, RawHost, RawServices, RawSettings, RawSsh, RawTimeouts,
    ServiceUnits, Settings, SshSettings, Timeouts,
};
pub use status::{ExecutionStatus, SnapshotStatus, SyncState};
