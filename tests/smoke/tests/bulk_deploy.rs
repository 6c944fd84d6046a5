//! Smoke test: concurrent blueprint uploads and deployments under load
//!
//! Needs VIGIL_SMOKE_BLUEPRINT, a blueprint archive whose main file is
//! `blueprint.yaml`. The background load generator keeps a workflow running
//! on the first deployment while the rest are created.

use std::path::PathBuf;
use std::time::Duration;

use smoke::{PollOptions, environment, require_harness, vigil_bin};
use vigil_harness::ClusterProbe;
use vigil_harness::bulk::{BlueprintUpload, create_deployments, upload_blueprints};
use vigil_harness::load::LoadGenerator;

const COUNT: usize = 6;
const CONCURRENCY: usize = 3;

#[tokio::test]
async fn uploads_and_deployments_in_parallel() {
    require_harness!();
    let Some(archive) = std::env::var_os("VIGIL_SMOKE_BLUEPRINT").map(PathBuf::from) else {
        eprintln!("skipping: VIGIL_SMOKE_BLUEPRINT not set");
        return;
    };
    let env = environment();
    let settings = env.settings();
    let apis = env.apis();
    let health = PollOptions::health(settings);
    let leader = ClusterProbe::new(&apis).current_leader(health).await.unwrap();
    let manager = env.manager(&leader.name).unwrap();
    let api = manager.api();
    let run = std::process::id();

    let uploads = (0..COUNT)
        .map(|i| BlueprintUpload {
            id: format!("smoke-{run}-bp-{i}"),
            archive: archive.clone(),
            application_file_name: "blueprint.yaml".to_owned(),
        })
        .collect::<Vec<_>>();
    for result in upload_blueprints(api, uploads.clone(), CONCURRENCY).await {
        result.unwrap();
    }

    let (first, rest) = uploads.split_first().unwrap();
    let first_deployment = format!("{}-dep", first.id);
    let spec = (first_deployment.clone(), first.id.clone(), serde_json::json!({}));
    create_deployments(api, vec![spec], 1).await.remove(0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let address = manager.public_ip.to_string();
    let args = ["--manager", &address, "load", "--deployment", &first_deployment]
        .into_iter()
        .chain(["--workflow", "install"])
        .map(str::to_owned)
        .collect::<Vec<_>>();
    let generator = LoadGenerator::spawn(&vigil_bin(), &args, dir.path().join("stop")).unwrap();

    let specs = rest
        .iter()
        .map(|u| (format!("{}-dep", u.id), u.id.clone(), serde_json::json!({})))
        .collect();
    let results = create_deployments(api, specs, CONCURRENCY).await;
    let failed: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert!(failed.is_empty(), "deployment failures: {failed:?}");

    let status = generator.stop(Duration::from_secs(120)).await.unwrap();
    assert!(status.success(), "load generator exited with {status}");
}
