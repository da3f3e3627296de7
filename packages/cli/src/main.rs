#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the LEEA monitoring agent.
//!
//! `leea run` (the default) fetches hazards through the fallback tiers,
//! measures portfolio exposure and writes a Markdown briefing, either once
//! or on a fixed interval until Ctrl-C.

mod config;
mod pipeline;
mod schedule;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::RunConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "leea", about = "Hazard exposure monitoring agent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run monitoring cycles (default)
    Run(RunArgs),
    /// Print the magnitude-to-radius buffer table in effect
    Tiers {
        /// TOML file with `base_radius_km` and `[[tiers]]` (overrides `BUFFER_TIERS`)
        #[arg(long)]
        buffer_tiers: Option<PathBuf>,
    },
}

/// Overrides for the environment configuration.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Portfolio CSV (overrides `PORTFOLIO_CSV`)
    #[arg(long)]
    pub portfolio: Option<PathBuf>,
    /// Output directory (overrides `OUTPUT_DIR`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Monitored region, e.g. "Florida" or "FL" (overrides `MONITOR_REGION`)
    #[arg(long)]
    pub region: Option<String>,
    /// Run a single cycle and exit
    #[arg(long, conflicts_with = "watch")]
    pub once: bool,
    /// Keep running on the interval until Ctrl-C
    #[arg(long)]
    pub watch: bool,
    /// Minutes between cycles (overrides `RUN_INTERVAL_MINUTES`)
    #[arg(long)]
    pub interval_minutes: Option<u64>,
    /// Minimum earthquake magnitude (overrides `MIN_MAGNITUDE`)
    #[arg(long)]
    pub min_magnitude: Option<f64>,
    /// Earthquake feed window: hour, day, week or month
    #[arg(long)]
    pub window: Option<String>,
    /// Number of exposed assets to list (overrides `TOP_N`)
    #[arg(long)]
    pub top_n: Option<usize>,
    /// Buffer tier TOML file (overrides `BUFFER_TIERS`)
    #[arg(long)]
    pub buffer_tiers: Option<PathBuf>,
    /// Skip the LLM assessment
    #[arg(long)]
    pub no_narrative: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let mut config = RunConfig::from_env()?;
            config.apply(&args)?;
            run(config).await?;
        }
        Commands::Tiers { buffer_tiers } => {
            let mut config = RunConfig::from_env()?;
            config.apply(&RunArgs {
                buffer_tiers,
                ..RunArgs::default()
            })?;
            let tiers = &config.buffer_tiers;
            println!("{:>10}  {:>10}", "magnitude", "radius_km");
            println!("{:>10}  {:>10.1}", "base", tiers.base_radius_km());
            for tier in tiers.tiers() {
                println!("{:>10.1}  {:>10.1}", tier.min_magnitude, tier.radius_km);
            }
        }
    }

    Ok(())
}

async fn run(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    log::info!(
        "Monitoring '{}' with portfolio {} (output {})",
        config.monitor_region,
        config.portfolio_csv.display(),
        config.output_dir.display()
    );

    let run_once = config.run_once;
    let interval = config.run_interval;
    let pipeline = Pipeline::from_config(config)?;

    if run_once {
        let summary = pipeline.run_cycle().await?;
        println!(
            "{} ({}): {}/{} assets exposed",
            summary.briefing_path.display(),
            summary.status,
            summary.report.exposed_assets,
            summary.report.total_assets
        );
        return Ok(());
    }

    log::info!("Running every {} minutes; Ctrl-C to stop", interval.as_secs() / 60);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let pipeline = &pipeline;
    let cycles = schedule::run_schedule(interval, shutdown, move || async move {
        pipeline.run_cycle().await.map(|summary| {
            log::info!(
                "Cycle finished: {} ({})",
                summary.briefing_path.display(),
                summary.status
            );
        })
    })
    .await;
    log::info!("Stopped after {cycles} cycles");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "leea",
            "run",
            "--window",
            "week",
            "--region",
            "FL",
            "--watch",
            "--top-n",
            "5",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.window.as_deref(), Some("week"));
        assert_eq!(args.region.as_deref(), Some("FL"));
        assert!(args.watch);
        assert_eq!(args.top_n, Some(5));

        let mut config = RunConfig::default();
        config.apply(&args).unwrap();
        assert_eq!(
            config.quake_window,
            leea_source::sources::usgs::FeedWindow::Week
        );
        assert!(!config.run_once);
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["leea"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn once_and_watch_conflict() {
        assert!(Cli::try_parse_from(["leea", "run", "--once", "--watch"]).is_err());
    }
}
