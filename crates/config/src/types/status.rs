use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow execution, as reported by the manager.
///
/// The serialized names are the manager's literal status strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Started,
    Queued,
    Scheduled,
    Cancelling,
    ForceCancelling,
    KillCancelling,
    Terminated,
    Failed,
    Cancelled,
    /// A status this harness does not know; treated as in-progress.
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    /// The execution will not change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Terminated | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    /// The only terminal success state.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Started => "started",
            ExecutionStatus::Queued => "queued",
            ExecutionStatus::Scheduled => "scheduled",
            ExecutionStatus::Cancelling => "cancelling",
            ExecutionStatus::ForceCancelling => "force_cancelling",
            ExecutionStatus::KillCancelling => "kill_cancelling",
            ExecutionStatus::Terminated => "terminated",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Unknown => "unknown",
        }
    }
}

/// Status of a snapshot archive on the manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Creating,
    Created,
    Failed,
    Uploading,
    Uploaded,
    #[serde(other)]
    Unknown,
}

impl SnapshotStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SnapshotStatus::Created | SnapshotStatus::Uploaded | SnapshotStatus::Failed)
    }

    /// Created locally or uploaded from an archive; usable for restore.
    pub fn is_success(&self) -> bool {
        matches!(self, SnapshotStatus::Created | SnapshotStatus::Uploaded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Creating => "creating",
            SnapshotStatus::Created => "created",
            SnapshotStatus::Failed => "failed",
            SnapshotStatus::Uploading => "uploading",
            SnapshotStatus::Uploaded => "uploaded",
            SnapshotStatus::Unknown => "unknown",
        }
    }
}

/// Replication role of a database standby relative to the primary
/// (`pg_stat_replication.sync_state`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Sync,
    Async,
    Potential,
    Quorum,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Sync => "sync",
            SyncState::Async => "async",
            SyncState::Potential => "potential",
            SyncState::Quorum => "quorum",
        }
    }
}

impl FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sync" => Ok(SyncState::Sync),
            "async" => Ok(SyncState::Async),
            "potential" => Ok(SyncState::Potential),
            "quorum" => Ok(SyncState::Quorum),
            other => Err(format!("unknown sync state '{other}'")),
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
