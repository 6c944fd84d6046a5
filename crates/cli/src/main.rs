#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod args;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vigil_config::Settings;

use crate::args::Cli;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::OutputMode;

/// Overrides the `-v` level when set.
const LOG_ENV: &str = "VIGIL_LOG";

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let result = context(&cli).and_then(|ctx| rt.block_on(commands::dispatch(cli.command, &ctx)));

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Settings from the usual sources, with command-line credentials on top.
fn context(cli: &Cli) -> Result<Context, CliError> {
    let mut settings = Settings::load()?;
    if let Some(username) = &cli.username {
        settings.credentials.username = username.clone();
    }
    if let Some(password) = &cli.password {
        settings.credentials.password = password.clone();
    }
    if let Some(tenant) = &cli.tenant {
        settings.credentials.tenant = tenant.clone();
    }
    let mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    Ok(Context::new(settings, cli.manager.clone(), mode))
}
