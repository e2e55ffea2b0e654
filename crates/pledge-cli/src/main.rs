//! Consensus Pledge simulator CLI
//!
//! Command-line interface for running and comparing pledge simulations.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pledge_model::{run, Scenario, SimulationConfig, Snapshot};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pledge")]
#[command(version)]
#[command(about = "Consensus Pledge economics simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation
    Run {
        /// Configuration file path (defaults to the reference scenario)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of ticks, overriding the configuration
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Scenario preset: reference, no-consensus-pledge, baseline-deactivated
        #[arg(short, long, default_value = "reference")]
        scenario: Scenario,

        /// Write every snapshot to this file as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every N-th snapshot
        #[arg(short, long, default_value = "30")]
        every: u64,
    },

    /// Run every scenario preset and compare final states
    Compare {
        /// Configuration file path (defaults to the reference scenario)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of ticks, overriding the configuration
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Write the default configuration
    Init {
        /// Output file
        #[arg(short, long, default_value = "pledge.toml")]
        output: PathBuf,
    },

    /// Version information
    Version,
}

fn init_logging(verbose: bool, default_level: &str) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false),
        )
        .init();
}

fn load_config(path: Option<&Path>, ticks: Option<u64>) -> anyhow::Result<SimulationConfig> {
    let mut config = match path {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load config {:?}", path))?,
        None => SimulationConfig::default(),
    };
    if let Some(ticks) = ticks {
        config.run.ticks = ticks;
    }
    Ok(config)
}

fn print_header() {
    println!(
        "{:>6} {:>6} {:>12} {:>12} {:>12} {:>14} {:>14} {:>14} {:>10} {:>10}",
        "tick",
        "day",
        "RB PiB",
        "QA PiB",
        "reward",
        "circulating",
        "locked",
        "minted",
        "CP/QA",
        "SP/QA"
    );
}

fn print_row(snapshot: &Snapshot) {
    println!(
        "{:>6} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>14.0} {:>14.0} {:>14.0} {:>10.2} {:>10.2}",
        snapshot.tick,
        snapshot.days_passed,
        snapshot.power_rb,
        snapshot.power_qa,
        snapshot.block_reward,
        snapshot.distribution.circulating,
        snapshot.distribution.locked,
        snapshot.distribution.minted,
        snapshot.consensus_pledge_per_qa_power,
        snapshot.storage_pledge_per_qa_power,
    );
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            scenario,
            output,
            every,
        } => {
            let base = load_config(config.as_deref(), ticks)?;
            init_logging(cli.verbose, &base.logging.level);

            let config = scenario.configure(&base);
            let (params, initial) = config.build()?;
            tracing::info!("Scenario: {}", scenario);

            let result = run(initial, &params, config.run.ticks)?;

            let every = every.max(1);
            print_header();
            for snapshot in &result.snapshots {
                if snapshot.tick % every == 0 || snapshot.tick == config.run.ticks {
                    print_row(snapshot);
                }
            }

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&result.snapshots)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {:?}", path))?;
                println!();
                println!("Snapshots written to {:?}", path);
            }
        }

        Commands::Compare { config, ticks } => {
            let base = load_config(config.as_deref(), ticks)?;
            init_logging(cli.verbose, &base.logging.level);

            print_header();
            for scenario in Scenario::ALL {
                let config = scenario.configure(&base);
                let (params, initial) = config.build()?;
                let result = run(initial, &params, config.run.ticks)?;

                println!("{scenario}");
                if let Some(last) = result.last() {
                    print_row(last);
                }
            }
        }

        Commands::Init { output } => {
            init_logging(cli.verbose, "info");

            let content = SimulationConfig::default().to_toml_string()?;
            std::fs::write(&output, content)
                .with_context(|| format!("failed to write {:?}", output))?;

            println!("Default configuration written to {:?}", output);
        }

        Commands::Version => {
            println!("pledge v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Model:");
            println!("  - Simple and baseline minting");
            println!("  - Storage and consensus pledge per sector cohort");
            println!("  - Linear reward vesting with immediate release");
        }
    }

    Ok(())
}
