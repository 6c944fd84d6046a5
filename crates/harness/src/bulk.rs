//! Bounded-concurrency bulk operations.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use vigil_config::{Blueprint, Deployment, DeploymentCreateRequest};

use crate::client::Api;
use crate::error::{HarnessError, Result};

/// Run `task` over `items` with at most `concurrency` in flight.
///
/// Results come back in input order. A failure does not cancel the others.
pub async fn run_bounded<I, R, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    task: F,
) -> Vec<Result<R>>
where
    I: Send + 'static,
    R: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let task = Arc::new(task);
    let total = items.len();
    let mut set = JoinSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let permits = Arc::clone(&permits);
        let task = Arc::clone(&task);
        set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (index, task(item).await)
        });
    }

    let mut results: Vec<Option<Result<R>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => tracing::error!("bulk worker panicked: {e}"),
        }
    }
    results
        .into_iter()
        .map(|r| r.unwrap_or_else(|| Err(HarnessError::Worker("task panicked".to_owned()))))
        .collect()
}

/// A blueprint archive to upload.
#[derive(Debug, Clone)]
pub struct BlueprintUpload {
    pub id: String,
    pub archive: PathBuf,
    pub application_file_name: String,
}

pub async fn upload_blueprints(
    api: &Api,
    uploads: Vec<BlueprintUpload>,
    concurrency: usize,
) -> Vec<Result<Blueprint>> {
    let api = api.clone();
    run_bounded(uploads, concurrency, move |upload| {
        let api = api.clone();
        async move {
            let archive = tokio::fs::read(&upload.archive).await?;
            let blueprint =
                api.blueprints_upload(&upload.id, archive, &upload.application_file_name).await?;
            tracing::info!(blueprint = %blueprint.id, "uploaded");
            Ok(blueprint)
        }
    })
    .await
}

/// Create one deployment per `(deployment_id, blueprint_id, inputs)`.
pub async fn create_deployments(
    api: &Api,
    deployments: Vec<(String, String, Value)>,
    concurrency: usize,
) -> Vec<Result<Deployment>> {
    let api = api.clone();
    run_bounded(deployments, concurrency, move |(id, blueprint_id, inputs)| {
        let api = api.clone();
        async move {
            let request = DeploymentCreateRequest { blueprint_id, inputs };
            Ok(api.deployments_create(&id, &request).await?)
        }
    })
    .await
}
