//! Headless runner for the Ebb & Bloom simulation.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "eb",
    about = "Ebb & Bloom: a conservation-enforced multi-scale world simulation",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log at debug level (otherwise RUST_LOG, or info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a world, run the standard law pipeline, and print statistics
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "100")]
        ticks: u64,

        /// RNG seed for genesis and the laws [default: 42, or the config file's]
        #[arg(short, long)]
        seed: Option<u64>,

        /// Seconds per tick [default: 1.0, or the config file's]
        #[arg(long)]
        dt: Option<f64>,

        /// JSON file with `sim` and `laws` overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print statistics as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// List the standard pipeline in execution order
    Systems,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            ticks,
            seed,
            dt,
            config,
            json,
        } => commands::run::run(&commands::run::RunArgs {
            ticks,
            seed,
            dt,
            config,
            json,
        }),
        Commands::Systems => commands::systems::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
