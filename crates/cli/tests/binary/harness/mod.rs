use assert_cmd::Command;
use vigil_support::{FakeManager, TestCluster};

const BIN: &str = env!("CARGO_BIN_EXE_vigil");

/// Variables the binary reads that must not leak in from the developer's
/// shell.
const SCRUBBED: &[&str] = &[
    "VIGIL_MANAGER",
    "VIGIL_MANAGER_USERNAME",
    "VIGIL_MANAGER_PASSWORD",
    "VIGIL_MANAGER_TENANT",
    "VIGIL_LOG",
    "CLOUDIFY_TEST_CONFIG_PATH",
    "HANDLER_CONFIGURATION",
];

const SHORT_BUDGETS: &[(&str, &str)] = &[
    ("VIGIL_POLL_INTERVAL_MS", "20"),
    ("VIGIL_HEALTH_TIMEOUT_MS", "2000"),
    ("VIGIL_EXECUTION_TIMEOUT_MS", "5000"),
    ("VIGIL_SNAPSHOT_TIMEOUT_MS", "5000"),
];

/// Pre-configured `assert_cmd::Command` for the `vigil` binary.
pub fn vigil_cmd() -> Command {
    let mut cmd = Command::new(BIN);
    for var in SCRUBBED {
        cmd.env_remove(var);
    }
    cmd.envs(SHORT_BUDGETS.iter().copied());
    cmd
}

fn manager_args(fake: &FakeManager) -> Vec<String> {
    let creds = fake.credentials();
    [
        "--manager",
        &fake.url(),
        "--username",
        &creds.username,
        "--password",
        &creds.password,
        "--tenant",
        &creds.tenant,
    ]
    .map(str::to_owned)
    .to_vec()
}

/// `vigil` pointed at `fake` with its credentials.
pub fn vigil_for(fake: &FakeManager) -> Command {
    let mut cmd = vigil_cmd();
    cmd.args(manager_args(fake));
    cmd
}

/// Same as `vigil_for`, for tests that need to spawn the process.
pub fn vigil_process(fake: &FakeManager) -> std::process::Command {
    let mut cmd = std::process::Command::new(BIN);
    for var in SCRUBBED {
        cmd.env_remove(var);
    }
    cmd.envs(SHORT_BUDGETS.iter().copied());
    cmd.args(manager_args(fake));
    cmd
}

/// `vigil --json` pointed at the first manager of `cluster`.
pub fn vigil_json(cluster: &TestCluster) -> Command {
    let mut cmd = vigil_for(&cluster.managers[0]);
    cmd.arg("--json");
    cmd
}

pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}
