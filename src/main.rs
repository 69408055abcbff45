//! Site registration entry point.
//!
//! Approves pending node registrations of a site until the requested
//! cluster size is active, or marks a site for decommissioning.

use std::convert::Infallible;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use log::{error, info};

mod api;
mod approval;
mod config;
mod error;
mod site;
mod types;

use api::{Credentials, HttpRegistrationApi};
use approval::{register_nodes, RegisterNodes, RegistrationOutcome};
use config::Config;
use site::decommission_site;
use types::TunnelType;

/// Performs node registration approvals and site delete actions.
#[derive(Parser)]
#[command(name = "site-registration", version, about)]
struct Cli {
    /// Action to perform
    #[arg(long, value_enum)]
    action: Action,

    /// Site name
    #[arg(long)]
    site: String,

    /// Tenant owning the site
    #[arg(long)]
    tenant: String,

    /// API token
    #[arg(long, env = "SITEREG_TOKEN", hide_env_values = true)]
    token: String,

    /// Allow SSL tunnels
    #[arg(
        long,
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_flag
    )]
    ssl: bool,

    /// Allow IPsec tunnels
    #[arg(
        long,
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_flag
    )]
    ipsec: bool,

    /// Node(s) in cluster to register
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    size: u32,

    /// Seconds to delay before processing
    #[arg(long, default_value_t = 0)]
    delay: u64,

    /// Seconds to wait for the cluster to register (overrides config)
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds between registration polls (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: Option<u64>,
}

/// Only an explicit true literal turns a flag on; any other value turns it off.
fn parse_flag(value: &str) -> Result<bool, Infallible> {
    let value = value.trim().to_ascii_lowercase();
    Ok(matches!(value.as_str(), "true" | "yes" | "on" | "1"))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Action {
    #[value(name = "registernodes")]
    RegisterNodes,
    #[value(name = "sitedelete")]
    SiteDelete,
}

#[derive(Debug, PartialEq, Eq)]
enum ActionOutcome {
    Nodes(RegistrationOutcome),
    SiteDecommissioned,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config.with_overrides(cli.timeout, cli.poll_interval),
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(1);
        }
    };
    info!(
        "Running {:?} for site {} with config: {:?}",
        cli.action, cli.site, config
    );

    let result = run(&cli, &config).await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }
    ExitCode::from(exit_status(&result, config.fail_on_timeout))
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<ActionOutcome> {
    let api = HttpRegistrationApi::new(config, Credentials::new(&cli.tenant, &cli.token))
        .context("Failed to create API client")?;

    match cli.action {
        Action::RegisterNodes => {
            let params = RegisterNodes {
                site: cli.site.clone(),
                tenant: cli.tenant.clone(),
                size: cli.size,
                tunnel_type: TunnelType::select(cli.ssl, cli.ipsec),
                delay: Duration::from_secs(cli.delay),
                timeout: config.timeout(),
                poll_interval: config.poll_interval(),
            };
            let outcome = register_nodes(&api, &params)
                .await
                .with_context(|| format!("Can not fetch registrations for site {}", cli.site))?;
            Ok(ActionOutcome::Nodes(outcome))
        }
        Action::SiteDelete => {
            decommission_site(&api, &cli.site)
                .await
                .with_context(|| format!("Can not delete site {}", cli.site))?;
            Ok(ActionOutcome::SiteDecommissioned)
        }
    }
}

/// A timed out registration run still exits 0 unless `fail_on_timeout` is set.
fn exit_status(result: &anyhow::Result<ActionOutcome>, fail_on_timeout: bool) -> u8 {
    match result {
        Ok(ActionOutcome::Nodes(RegistrationOutcome::TimedOut { .. })) if fail_on_timeout => 2,
        Ok(_) => 0,
        Err(_) => 1,
    }
}
