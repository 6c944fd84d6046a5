use std::time::Duration;

use serde::Serialize;
use vigil_harness::{Api, ClusterProbe, PollOptions, count_active};

use crate::args::ClusterAction;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{self, table};

#[derive(Serialize)]
struct ActiveOutput {
    endpoint: String,
    active: usize,
    rounds: usize,
}

pub async fn cluster(ctx: &Context, action: ClusterAction) -> Result<(), CliError> {
    match action {
        ClusterAction::WaitActive { expect, endpoints, timeout_ms } => {
            wait_active(ctx, expect, endpoints, timeout_ms).await
        }
        ClusterAction::Leader => {
            let apis = [ctx.api()?];
            let leader = ClusterProbe::new(&apis).current_leader(health(ctx)).await?;
            output::print(ctx.mode, &leader, |l| println!("{} ({})", l.name, l.host_ip));
            Ok(())
        }
        ClusterAction::Nodes => {
            let nodes = ctx.api()?.cluster_nodes().await?;
            output::print(ctx.mode, nodes.as_slice(), table::print_nodes);
            Ok(())
        }
    }
}

async fn wait_active(
    ctx: &Context,
    expect: usize,
    endpoints: Vec<String>,
    timeout_ms: Option<u64>,
) -> Result<(), CliError> {
    let apis = endpoint_apis(ctx, endpoints)?;
    let mut opts = health(ctx);
    if let Some(ms) = timeout_ms {
        opts.timeout = Duration::from_millis(ms);
    }

    let hit = ClusterProbe::new(&apis).wait_for_active(expect, opts).await?;
    let out = ActiveOutput {
        endpoint: apis[hit.index].base_url().to_owned(),
        active: count_active(&hit.value).count,
        rounds: hit.rounds,
    };
    output::print(ctx.mode, &out, |o| {
        let (active, endpoint, rounds) = (o.active, &o.endpoint, o.rounds);
        println!("{active} active members reported by {endpoint} after {rounds} round(s)");
    });
    Ok(())
}

/// `--endpoint` values, else `--manager`, else every configured manager.
fn endpoint_apis(ctx: &Context, endpoints: Vec<String>) -> Result<Vec<Api>, CliError> {
    if !endpoints.is_empty() {
        return Ok(endpoints.iter().map(|e| ctx.api_for(e)).collect());
    }
    if ctx.explicit_manager().is_none() && ctx.settings.managers.len() > 1 {
        let apis = ctx.settings.managers.iter().map(|m| ctx.api_for(&m.public_ip.to_string()));
        return Ok(apis.collect());
    }
    Ok(vec![ctx.api()?])
}

fn health(ctx: &Context) -> PollOptions {
    PollOptions::health(&ctx.settings)
}
