use std::net::IpAddr;

use vigil_harness::replication::{check_topology, replication_state};
use vigil_net::{FaultInjector, Partition};

use crate::args::PartitionArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{self, table};

pub async fn replication(
    ctx: &Context,
    host: IpAddr,
    ssh_user: Option<&str>,
    replicas: Option<usize>,
) -> Result<(), CliError> {
    let remote = ctx.remote(host, ssh_user);
    let state = replication_state(remote.as_ref(), &ctx.settings.database).await?;
    output::print(ctx.mode, &state, |s| table::print_replication(s));
    if let Some(replicas) = replicas {
        check_topology(&state, replicas)?;
    }
    Ok(())
}

pub async fn partition(ctx: &Context, args: PartitionArgs) -> Result<(), CliError> {
    let remote = ctx.remote(args.host, args.ssh_user.as_deref());
    let partition = Partition::between(args.host, args.peers);
    FaultInjector::new(remote.as_ref()).partition(&partition).await?;
    eprintln!("{} isolated from {} peer(s)", args.host, partition.peers().count());
    Ok(())
}

pub async fn heal(ctx: &Context, args: PartitionArgs) -> Result<(), CliError> {
    let remote = ctx.remote(args.host, args.ssh_user.as_deref());
    let partition = Partition::between(args.host, args.peers);
    FaultInjector::new(remote.as_ref()).heal(&partition).await?;
    eprintln!("{} reconnected to {} peer(s)", args.host, partition.peers().count());
    Ok(())
}
