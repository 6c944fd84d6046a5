use vigil_harness::PollOptions;
use vigil_harness::execution::wait_for_execution;

use crate::args::ExecutionAction;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{self, table};

pub async fn execution(ctx: &Context, action: ExecutionAction) -> Result<(), CliError> {
    let api = ctx.api()?;
    match action {
        ExecutionAction::Wait { id } => {
            let opts = PollOptions::execution(&ctx.settings);
            let execution = wait_for_execution(&api, &id, opts).await?;
            output::print(ctx.mode, &execution, |e| {
                println!("execution {} ({}) {}", e.id, e.workflow_id, e.status);
            });
        }
        ExecutionAction::List { deployment } => {
            let executions = api.executions_list(deployment.as_deref()).await?;
            output::print(ctx.mode, executions.as_slice(), table::print_executions);
        }
    }
    Ok(())
}
