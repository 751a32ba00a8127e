// src/bin/run_market.rs

//! Headless market runner.
//!
//! Prints one report line per trader when the run ends: CSV by default,
//! JSON lines with `--json`. Logs go to stderr; filter them with `RUST_LOG`.

use clap::Parser;
use cloud_market::{Market, REPORT_HEADER, SimulationConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "run_market")]
#[command(about = "Run a continuous double-auction compute market", long_about = None)]
struct Cli {
    /// JSON configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of ticks to run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Override the random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Emit reports as JSON lines instead of CSV
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match SimulationConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), error = %e, "bad configuration");
                return ExitCode::FAILURE;
            }
        },
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let ticks = cli.ticks.unwrap_or(config.ticks);

    let mut market = match Market::new(config) {
        Ok(market) => market,
        Err(e) => {
            error!(error = %e, "could not build market");
            return ExitCode::FAILURE;
        }
    };

    market.run(ticks);
    info!(ticks, trades = market.trades().len(), "run finished");
    for commodity in market.exchange().commodities() {
        match market.equilibrium(commodity) {
            Some(eq) => info!(%commodity, price = eq.price, volume = eq.volume, "open-assignment equilibrium"),
            None => info!(%commodity, "no equilibrium among open assignments"),
        }
    }

    if cli.json {
        for report in market.reports() {
            match serde_json::to_string(&report) {
                Ok(line) => println!("{}", line),
                Err(e) => error!(error = %e, "could not serialise report"),
            }
        }
    } else {
        println!("{}", REPORT_HEADER);
        for report in market.reports() {
            println!("{}", report);
        }
    }
    ExitCode::SUCCESS
}
