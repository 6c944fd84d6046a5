//! Waiting on workflow executions.

use serde_json::Value;
use vigil_config::{Execution, ExecutionStartRequest};

use crate::client::Api;
use crate::error::{HarnessError, Result};
use crate::poll::{PollOptions, poll_until};

/// Poll execution `id` until it is terminal.
///
/// `terminated` is success. Any other terminal status logs the execution's
/// events and returns `HarnessError::ExecutionFailed`.
pub async fn wait_for_execution(api: &Api, id: &str, opts: PollOptions) -> Result<Execution> {
    let hit = poll_until(
        &format!("execution {id} to finish"),
        || api.executions_get(id),
        |execution| execution.status.is_terminal(),
        opts,
    )
    .await?;
    let execution = hit.value;
    if execution.status.is_success() {
        tracing::info!(execution = id, workflow = %execution.workflow_id, "execution terminated");
        return Ok(execution);
    }
    log_events(api, &execution).await;
    Err(HarnessError::ExecutionFailed {
        id: execution.id,
        workflow_id: execution.workflow_id,
        status: execution.status,
        error: execution.error,
    })
}

async fn log_events(api: &Api, execution: &Execution) {
    match api.events(&execution.id).await {
        Ok(events) => {
            for event in events {
                let level = event.level.as_deref().unwrap_or("info");
                tracing::warn!(execution = %execution.id, level, "{}", event.message);
            }
        }
        Err(e) => tracing::warn!(execution = %execution.id, "could not fetch events: {e}"),
    }
}

/// Start `workflow_id` on `deployment_id` and wait for it.
pub async fn run_workflow(
    api: &Api,
    deployment_id: &str,
    workflow_id: &str,
    parameters: Value,
    opts: PollOptions,
) -> Result<Execution> {
    let request = ExecutionStartRequest {
        deployment_id: deployment_id.to_owned(),
        workflow_id: workflow_id.to_owned(),
        parameters,
        force: false,
    };
    let execution = api.executions_start(&request).await?;
    tracing::info!(
        deployment = deployment_id,
        workflow = workflow_id,
        execution = %execution.id,
        "workflow started"
    );
    wait_for_execution(api, &execution.id, opts).await
}
