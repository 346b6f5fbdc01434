//! Combine command - Aggregate persisted run artifacts into a power surface

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::export::{GridSpec, combine_grid, write_surface};
use crate::power::Criterion;

#[derive(Parser, Debug)]
#[command(about = "Combine per-run artifacts into a power surface")]
pub struct CombineArgs {
    /// Directory holding the per-run CSV artifacts
    #[arg(long, short = 'd', default_value = ".")]
    pub directory: PathBuf,

    /// Criterion the runs were scored against
    #[arg(long, short = 'c', default_value = "correlation")]
    pub criterion: String,

    /// Learning-rate standard deviation encoded in the artifact names
    #[arg(long, default_value_t = 0.1)]
    pub std: f64,

    /// Reversal count encoded in the artifact names
    #[arg(long, short = 'r', default_value_t = 12)]
    pub reversals: usize,

    /// Repetition count encoded in the artifact names
    #[arg(long, default_value_t = 250)]
    pub repetitions: usize,

    /// Success cutoff applied when re-scoring the records
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Trial counts of the grid, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub trials: Vec<usize>,

    /// Participant counts of the grid, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub participants: Vec<usize>,

    /// Output file for the combined power surface
    #[arg(long, short = 'O', default_value = "power_surface.csv")]
    pub output: PathBuf,
}

pub fn execute(args: CombineArgs) -> Result<()> {
    let criterion: Criterion = args.criterion.parse()?;
    let cutoff = args.cutoff.unwrap_or(match criterion {
        Criterion::Correlation => 0.7,
        Criterion::GroupDifference => 0.05,
    });

    let grid = GridSpec {
        criterion,
        std: args.std,
        nreversals: args.reversals,
        nreps: args.repetitions,
        cutoff,
        trial_counts: args.trials,
        participant_counts: args.participants,
    };

    let rows = combine_grid(&args.directory, &grid)
        .with_context(|| format!("combining artifacts in '{}'", args.directory.display()))?;

    for row in &rows {
        println!(
            "{} trials, {} participants: power {:.3}, mean failed {:.3}",
            row.ntrials, row.npp, row.power, row.mean_proportion_failed
        );
    }

    write_surface(&args.output, &rows)
        .with_context(|| format!("writing power surface to '{}'", args.output.display()))?;
    println!("Power surface written to {}", args.output.display());
    Ok(())
}
