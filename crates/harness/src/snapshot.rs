//! Snapshot create, restore, download and upload.

use std::path::Path;

use vigil_config::{Execution, Snapshot, SnapshotCreateRequest, SnapshotRestoreRequest};

use crate::client::Api;
use crate::error::{ApiError, HarnessError, Result};
use crate::execution::wait_for_execution;
use crate::poll::{PollOptions, poll_until};

/// Create snapshot `id` and wait until the manager reports it `created`.
pub async fn create_snapshot(
    api: &Api,
    id: &str,
    request: &SnapshotCreateRequest,
    opts: PollOptions,
) -> Result<Snapshot> {
    let execution = api.snapshots_create(id, request).await?;
    tracing::info!(snapshot = id, execution = %execution.id, "snapshot creation started");
    wait_for_snapshot(api, id, opts).await
}

/// Poll snapshot `id` until its status is terminal.
pub async fn wait_for_snapshot(api: &Api, id: &str, opts: PollOptions) -> Result<Snapshot> {
    let hit = poll_until(
        &format!("snapshot {id}"),
        || api.snapshots_get(id),
        |snapshot| snapshot.status.is_terminal(),
        opts,
    )
    .await?;
    let snapshot = hit.value;
    if snapshot.status.is_success() {
        Ok(snapshot)
    } else {
        Err(HarnessError::SnapshotFailed { id: snapshot.id, error: snapshot.error })
    }
}

/// Restore snapshot `id` and wait for the restore execution.
pub async fn restore_snapshot(
    api: &Api,
    id: &str,
    request: &SnapshotRestoreRequest,
    opts: PollOptions,
) -> Result<Execution> {
    let execution = api.snapshots_restore(id, request).await?;
    tracing::info!(snapshot = id, execution = %execution.id, "restore started");
    wait_for_execution(api, &execution.id, opts).await
}

/// Save the archive of snapshot `id` to `path`. Returns the byte count.
pub async fn download_snapshot(api: &Api, id: &str, path: &Path) -> Result<u64> {
    let archive = api.snapshots_download(id).await?;
    tokio::fs::write(path, &archive).await?;
    Ok(archive.len() as u64)
}

/// Upload the archive at `path` as snapshot `id` and wait until it is usable.
pub async fn upload_snapshot(
    api: &Api,
    id: &str,
    path: &Path,
    opts: PollOptions,
) -> Result<Snapshot> {
    let archive = tokio::fs::read(path).await?;
    api.snapshots_upload(id, archive).await?;
    wait_for_snapshot(api, id, opts).await
}

/// Delete snapshot `id`. A snapshot that is already gone counts as deleted,
/// so this is safe to register as cleanup before the snapshot exists.
pub async fn delete_snapshot(api: &Api, id: &str) -> Result<()> {
    match api.snapshots_delete(id).await {
        Ok(()) => {}
        Err(ApiError::Status { status: 404, .. }) => {
            tracing::debug!(snapshot = id, "snapshot already gone");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
