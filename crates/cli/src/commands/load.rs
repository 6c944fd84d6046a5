use std::path::Path;
use std::time::Duration;

use vigil_harness::PollOptions;
use vigil_harness::execution::run_workflow;
use vigil_harness::load::run_until_stopped;

use crate::commands::Context;
use crate::error::CliError;
use crate::output;

/// Child side of `LoadGenerator`: run the workflow back to back until the
/// parent creates the stop file. Failed runs are counted, not fatal.
pub async fn load(
    ctx: &Context,
    deployment: &str,
    workflow: &str,
    stop_file: &Path,
    interval_ms: u64,
) -> Result<(), CliError> {
    let api = ctx.api()?;
    let api = &api;
    let opts = PollOptions::execution(&ctx.settings);
    let interval = Duration::from_millis(interval_ms);

    let stats = run_until_stopped(stop_file, interval, move || async move {
        run_workflow(api, deployment, workflow, serde_json::Value::Null, opts).await.map(drop)
    })
    .await;

    output::print(ctx.mode, &stats, |s| {
        println!("{} iterations, {} failed", s.iterations, s.failures);
    });
    Ok(())
}
