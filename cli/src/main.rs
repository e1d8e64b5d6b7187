//! CLI for vramwatch
//!
//! Commands:
//! - run: repeat a fixed-shape matmul and log GPU memory after each iteration
//! - probe: print the current used-VRAM counter once
//! - capacity: print per-device memory capacity from the GPU runtime

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod settings;
mod output;

#[derive(Parser)]
#[command(name = "vramwatch")]
#[command(about = "Watch GPU memory across repeated matmul launches", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the matmul loop and sample memory around each iteration
    Run(commands::run::RunArgs),

    /// Read the used-VRAM counter once
    Probe(commands::probe::ProbeArgs),

    /// Query per-device memory capacity from the GPU runtime
    Capacity(commands::capacity::CapacityArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Probe(args) => commands::probe::run(args),
        Commands::Capacity(args) => commands::capacity::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the measurement lines; diagnostics go to stderr
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
