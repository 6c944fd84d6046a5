use serde::Serialize;
use vigil_config::{SnapshotCreateRequest, SnapshotRestoreRequest};
use vigil_harness::PollOptions;
use vigil_harness::snapshot::{
    create_snapshot, download_snapshot, restore_snapshot, upload_snapshot,
};

use crate::args::SnapshotAction;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{self, table};

#[derive(Serialize)]
struct Started {
    id: String,
    execution_id: String,
}

#[derive(Serialize)]
struct Downloaded {
    id: String,
    path: String,
    bytes: u64,
}

pub async fn snapshot(ctx: &Context, action: SnapshotAction) -> Result<(), CliError> {
    let api = ctx.api()?;
    let opts = PollOptions::snapshot(&ctx.settings);
    match action {
        SnapshotAction::List => {
            let snapshots = api.snapshots_list().await?;
            output::print(ctx.mode, snapshots.as_slice(), table::print_snapshots);
        }
        SnapshotAction::Create { id, wait } => {
            let request = SnapshotCreateRequest::default();
            if wait {
                let snapshot = create_snapshot(&api, &id, &request, opts).await?;
                output::print(ctx.mode, &snapshot, |s| println!("snapshot {} {}", s.id, s.status));
            } else {
                let execution = api.snapshots_create(&id, &request).await?;
                print_started(ctx, id, execution.id);
            }
        }
        SnapshotAction::Restore { id, wait, force } => {
            let request = SnapshotRestoreRequest { force, ..Default::default() };
            if wait {
                let opts = PollOptions::execution(&ctx.settings);
                let execution = restore_snapshot(&api, &id, &request, opts).await?;
                output::print(ctx.mode, &execution, |e| {
                    println!("restored {id} (execution {} {})", e.id, e.status);
                });
            } else {
                let execution = api.snapshots_restore(&id, &request).await?;
                print_started(ctx, id, execution.id);
            }
        }
        SnapshotAction::Download { id, output: path } => {
            let bytes = download_snapshot(&api, &id, &path).await?;
            let out = Downloaded { id, path: path.display().to_string(), bytes };
            output::print(ctx.mode, &out, |d| println!("wrote {} bytes to {}", d.bytes, d.path));
        }
        SnapshotAction::Upload { id, archive } => {
            let snapshot = upload_snapshot(&api, &id, &archive, opts).await?;
            output::print(ctx.mode, &snapshot, |s| println!("snapshot {} {}", s.id, s.status));
        }
    }
    Ok(())
}

fn print_started(ctx: &Context, id: String, execution_id: String) {
    let out = Started { id, execution_id };
    output::print(ctx.mode, &out, |s| println!("snapshot {}: execution {}", s.id, s.execution_id));
}
