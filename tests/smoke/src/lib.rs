// Smoke tests: HA scenarios against a provisioned manager cluster.
//
// The cluster is described by the YAML file at CLOUDIFY_TEST_CONFIG_PATH
// (plus HANDLER_CONFIGURATION and VIGIL_* overrides). Without it every
// scenario prints a notice and passes, so `cargo test --workspace` stays
// green on a laptop.
// Unwrap/panic are appropriate in test harness code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub use vigil_config::Settings;
pub use vigil_harness::{Environment, PollOptions};

use std::path::PathBuf;

use vigil_config::CONFIG_PATH_ENV;

// ---------------------------------------------------------------------------
// Harness gate
// ---------------------------------------------------------------------------

/// Returns early from the test unless a cluster is configured.
#[macro_export]
macro_rules! require_harness {
    () => {
        if !$crate::is_configured() {
            eprintln!(
                "skipping {}: set CLOUDIFY_TEST_CONFIG_PATH to run smoke scenarios",
                module_path!()
            );
            return;
        }
    };
}

pub fn is_configured() -> bool {
    std::env::var_os(CONFIG_PATH_ENV).is_some()
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Resolved settings plus connected handles for the configured cluster.
///
/// Also installs a log subscriber (`VIGIL_LOG`, default `info`) so poll
/// progress shows up with `--nocapture`.
pub fn environment() -> Environment {
    let filter = tracing_subscriber::EnvFilter::try_from_env("VIGIL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().try_init();

    let settings = Settings::load().expect("load harness settings");
    assert!(!settings.managers.is_empty(), "no managers configured");
    Environment::new(settings)
}

/// Skip the current scenario when the cluster has fewer than `n` managers.
pub fn has_managers(env: &Environment, n: usize) -> bool {
    if env.managers().len() < n {
        eprintln!("skipping: scenario needs {n} managers, {} configured", env.managers().len());
        return false;
    }
    true
}

// ---------------------------------------------------------------------------
// Binary location
// ---------------------------------------------------------------------------

/// Locate the `vigil` binary in the workspace target directory.
pub fn vigil_bin() -> PathBuf {
    let target_dir = std::env::var("CARGO_TARGET_DIR").map(PathBuf::from).unwrap_or_else(|_| {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        manifest.parent().unwrap().parent().unwrap().join("target")
    });
    for profile in ["debug", "release"] {
        let bin = target_dir.join(profile).join("vigil");
        if bin.exists() {
            return bin;
        }
    }
    panic!("vigil binary not found in {target_dir:?}. Run `cargo build -p vigil` first.");
}
