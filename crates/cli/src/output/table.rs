use comfy_table::{ContentArrangement, Table};

use vigil_config::{ClusterNode, Execution, ServiceStatus, Snapshot, SyncState};

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("--")
}

pub fn print_nodes(nodes: &[ClusterNode]) {
    let mut table = new_table();
    table.set_header(vec!["NAME", "HOST", "STATUS", "LEADER"]);

    for n in nodes {
        let status = match (&n.status, n.online) {
            (Some(status), _) => status.as_str(),
            (None, true) => "online",
            (None, false) => "offline",
        };
        let leader = if n.master { "*" } else { "" };
        table.add_row(vec![n.name.as_str(), n.host_ip.as_str(), status, leader]);
    }

    println!("{table}");
}

pub fn print_services<'a>(services: impl IntoIterator<Item = (&'a String, &'a ServiceStatus)>) {
    let mut table = new_table();
    table.set_header(vec!["SERVICE", "STATUS"]);

    for (name, s) in services {
        table.add_row(vec![name, &s.status]);
    }

    println!("{table}");
}

pub fn print_snapshots(snapshots: &[Snapshot]) {
    let mut table = new_table();
    table.set_header(vec!["ID", "STATUS", "CREATED", "ERROR"]);

    for s in snapshots {
        table.add_row(vec![
            s.id.as_str(),
            s.status.as_str(),
            or_dash(s.created_at.as_deref()),
            or_dash(Some(s.error.as_str())),
        ]);
    }

    println!("{table}");
}

pub fn print_executions(executions: &[Execution]) {
    let mut table = new_table();
    table.set_header(vec!["ID", "WORKFLOW", "DEPLOYMENT", "STATUS", "ERROR"]);

    for e in executions {
        table.add_row(vec![
            e.id.as_str(),
            e.workflow_id.as_str(),
            or_dash(e.deployment_id.as_deref()),
            e.status.as_str(),
            or_dash(Some(e.error.as_str())),
        ]);
    }

    println!("{table}");
}

pub fn print_replication<'a>(rows: impl IntoIterator<Item = (&'a String, &'a SyncState)>) {
    let mut table = new_table();
    table.set_header(vec!["REPLICA", "SYNC STATE"]);

    for (addr, state) in rows {
        table.add_row(vec![addr.as_str(), state.as_str()]);
    }

    println!("{table}");
}
