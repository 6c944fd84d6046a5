use serde::Serialize;
use vigil_config::{ManagerStatus, VersionInfo};

use crate::commands::Context;
use crate::error::CliError;
use crate::output::{self, table};

#[derive(Serialize)]
struct StatusOutput {
    manager: String,
    status: ManagerStatus,
    version: VersionInfo,
}

pub async fn status(ctx: &Context) -> Result<(), CliError> {
    let api = ctx.api()?;
    let status = api.status().await?;
    let version = api.version().await?;
    let out = StatusOutput { manager: api.base_url().to_owned(), status, version };

    output::print(ctx.mode, &out, |out| {
        let health = if out.status.is_healthy() { "healthy" } else { "degraded" };
        println!("MANAGER: {} ({health})", out.manager);
        println!("VERSION: {} {}", out.version.version, out.version.edition);
        if !out.status.services.is_empty() {
            println!();
            table::print_services(&out.status.services);
        }
    });
    Ok(())
}
