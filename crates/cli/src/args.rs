use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Vigil: inspect, wait on and disturb an HA manager cluster.
#[derive(Debug, Parser)]
#[command(name = "vigil", version, about)]
pub struct Cli {
    /// Manager REST endpoint (defaults to the first configured manager).
    #[arg(long, global = true, env = "VIGIL_MANAGER")]
    pub manager: Option<String>,

    /// Manager username (overrides configuration).
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Manager password (overrides configuration).
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Tenant sent with every request.
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Output as JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log more (-v info, -vv debug). `VIGIL_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manager health and version.
    Status,

    /// Cluster membership and leadership.
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },

    /// Manage snapshots.
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },

    /// Inspect workflow executions.
    Execution {
        #[command(subcommand)]
        action: ExecutionAction,
    },

    /// Show the database replication view of a node.
    Replication {
        /// Database node to query over SSH.
        #[arg(long)]
        host: IpAddr,
        /// SSH user (overrides configuration).
        #[arg(long)]
        ssh_user: Option<String>,
        /// Fail unless exactly this many replicas with one sync are listed.
        #[arg(long)]
        replicas: Option<usize>,
    },

    /// Cut a host off from its peers with firewall rules.
    Partition {
        #[command(flatten)]
        target: PartitionArgs,
    },

    /// Remove rules installed by `partition`.
    Heal {
        #[command(flatten)]
        target: PartitionArgs,
    },

    /// Run a workflow in a loop until the stop file appears.
    Load {
        #[arg(long)]
        deployment: String,
        #[arg(long)]
        workflow: String,
        /// Created by the parent process to request a stop.
        #[arg(long)]
        stop_file: PathBuf,
        /// Pause between iterations.
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[derive(Debug, clap::Args)]
pub struct PartitionArgs {
    /// Host whose firewall is changed.
    #[arg(long)]
    pub host: IpAddr,
    /// Peer to block, repeatable.
    #[arg(long = "peer", required = true)]
    pub peers: Vec<IpAddr>,
    /// SSH user (overrides configuration).
    #[arg(long)]
    pub ssh_user: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ClusterAction {
    /// Wait until a manager reports N active members.
    WaitActive {
        /// Number of active members to wait for.
        #[arg(long)]
        expect: usize,
        /// Endpoint to poll, repeatable (defaults to every configured manager).
        #[arg(long = "endpoint")]
        endpoints: Vec<String>,
        /// Give up after this long (defaults to the health timeout).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Show the current leader.
    Leader,
    /// List cluster members.
    Nodes,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotAction {
    /// List snapshots.
    List,
    /// Create a snapshot.
    Create {
        id: String,
        /// Wait until the snapshot is created.
        #[arg(long)]
        wait: bool,
    },
    /// Restore a snapshot.
    Restore {
        id: String,
        /// Wait for the restore execution to finish.
        #[arg(long)]
        wait: bool,
        /// Restore even if the manager is not empty.
        #[arg(long)]
        force: bool,
    },
    /// Save a snapshot archive locally.
    Download {
        id: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Upload a snapshot archive and wait until it is usable.
    Upload { id: String, archive: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum ExecutionAction {
    /// Wait for an execution to finish.
    Wait { id: String },
    /// List executions.
    List {
        #[arg(long)]
        deployment: Option<String>,
    },
}
