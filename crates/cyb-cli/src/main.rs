//! Admin CLI entrypoint. Opens the same storage the daemon uses (spec §6
//! environment variables) and dispatches one subcommand.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use cyb_config::Settings;
use cyb_daemon::bootstrap;

#[tokio::main]
async fn main() -> Result<()> {
    cyb_telemetry::setup_default_logging().ok();

    let cli = Cli::parse();
    let settings = Settings::load_from_env().context("invalid configuration")?;
    let services = bootstrap(settings).await.context("failed to connect to services")?;

    match cli.command {
        Command::User { action } => commands::user::run(action, &services.auth, &services.password_hasher).await,
        Command::Tenant { action } => commands::tenant::run(action, &services.tenants).await,
        Command::ApiKey { action } => commands::api_key::run(action, &services.auth).await,
        Command::Audit { action } => commands::audit::run(action, &services.audit).await,
        Command::Inspect { target } => {
            commands::inspect::run(target, &services.cache, &services.breaker, &services.ratelimiter)
        }
    }
}
