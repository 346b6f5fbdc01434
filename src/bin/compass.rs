//! COMPASS CLI - Simulation-based power analysis for RL parameter recovery
//!
//! This CLI provides a unified interface for:
//! - Running a single power analysis from command-line flags
//! - Running batches of analyses driven by an input file
//! - Combining persisted run artifacts into a power surface

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "compass")]
#[command(version, about = "Simulation-based power analysis for RL parameter recovery", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single power analysis
    Run(Box<compass::cli::commands::run::RunArgs>),

    /// Run one power analysis per input-file row
    Batch(compass::cli::commands::batch::BatchArgs),

    /// Combine per-run artifacts into a power surface
    Combine(compass::cli::commands::combine::CombineArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => compass::cli::commands::run::execute(*args),
        Commands::Batch(args) => compass::cli::commands::batch::execute(args),
        Commands::Combine(args) => compass::cli::commands::combine::execute(args),
    }
}
