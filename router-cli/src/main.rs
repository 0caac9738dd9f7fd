mod cli;
mod scenario;

use std::fs;

use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::Parser;
use router_common::models::SwapRoute;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use scenario::{simulate, Scenario};

fn main() -> Result<(), anyhow::Error> {
    let cli: Cli = Cli::parse();
    create_tracing_subscriber(cli.args().verbose);
    match cli.command() {
        Command::Encode(args) => {
            let route = read_route(&args.route)?;
            println!("0x{}", hex::encode(route.encode()?));
        }
        Command::Decode(args) => {
            let data = args
                .data
                .trim()
                .trim_start_matches("0x");
            let bytes = hex::decode(data).context("Route is not valid hex")?;
            let route = SwapRoute::decode(&bytes)?;
            print!("{}", serde_yaml::to_string(&route)?);
        }
        Command::Validate(args) => {
            let route = read_route(&args.route)?;
            let now = match args.now {
                Some(now) => now,
                None => current_timestamp()?,
            };
            route
                .validate(now)
                .map_err(|e| anyhow!("Invalid route: {e}"))?;
            info!(steps = route.steps.len(), now, "Route is valid");
            println!("valid");
        }
        Command::Simulate(args) => {
            let scenario = Scenario::from_yaml(&args.scenario)?;
            let report = simulate(&scenario, current_timestamp()?)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn read_route(path: &str) -> anyhow::Result<SwapRoute> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
    let route: SwapRoute =
        serde_yaml::from_str(&contents).with_context(|| format!("Invalid route {path}"))?;
    debug!(path, steps = route.steps.len(), "Loaded route");
    Ok(route)
}

fn current_timestamp() -> anyhow::Result<u64> {
    u64::try_from(Utc::now().timestamp()).context("System clock is before the unix epoch")
}

fn create_tracing_subscriber(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    let format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_target(false)
        .compact();
    tracing_subscriber::fmt()
        .event_format(format)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
