//! Run command - Estimate power for a single design

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::to_writer_pretty;

use crate::cli::config::RunConfig;
use crate::export::write_records;
use crate::power::Criterion;
use crate::stats::analytic_t_test_power;

#[derive(Debug, Serialize)]
struct RunSummaryFile {
    criterion: String,
    ntrials: usize,
    nreversals: usize,
    npp: usize,
    nreps: usize,
    cutoff: f64,
    seed: Option<u64>,
    power: f64,
    mean_proportion_failed: f64,
    undefined_statistics: usize,
}

#[derive(Parser, Debug)]
#[command(about = "Estimate power for a single design", allow_negative_numbers = true)]
pub struct RunArgs {
    /// Success criterion: correlation or group-difference
    #[arg(long, short = 'c', default_value = "correlation")]
    pub criterion: String,

    /// Number of trials in the simulated experiment
    #[arg(long, short = 't', default_value_t = 480)]
    pub trials: usize,

    /// Number of rule reversals
    #[arg(long, short = 'r', default_value_t = 12)]
    pub reversals: usize,

    /// Participants per repetition (per group for the group criterion)
    #[arg(long, short = 'n', default_value_t = 30)]
    pub participants: usize,

    /// Number of Monte Carlo repetitions
    #[arg(long, default_value_t = 250)]
    pub repetitions: usize,

    /// Probability of rule-congruent feedback
    #[arg(long, default_value_t = 0.8)]
    pub reward_probability: f64,

    /// Success cutoff: minimum correlation or maximum p-value
    #[arg(long)]
    pub cutoff: Option<f64>,

    /// Learning-rate population mean
    #[arg(long, default_value_t = 0.5)]
    pub mean_learning_rate: f64,

    /// Learning-rate population standard deviation
    #[arg(long, default_value_t = 0.1)]
    pub std_learning_rate: f64,

    /// Inverse-temperature population mean
    #[arg(long, default_value_t = 2.0)]
    pub mean_inverse_temperature: f64,

    /// Inverse-temperature population standard deviation
    #[arg(long, default_value_t = 1.0)]
    pub std_inverse_temperature: f64,

    /// True effect size (group-difference criterion only)
    #[arg(long)]
    pub cohens_d: Option<f64>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run repetitions on the worker pool
    #[arg(long)]
    pub parallel: bool,

    /// Directory repetition records are written to; must already exist
    #[arg(long, short = 'O', default_value = ".")]
    pub output_dir: PathBuf,

    /// Optional JSON summary file
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> Result<RunConfig> {
        let criterion: Criterion = self.criterion.parse()?;
        let cutoff = self.cutoff.unwrap_or(match criterion {
            Criterion::Correlation => 0.7,
            Criterion::GroupDifference => 0.05,
        });
        Ok(RunConfig {
            criterion,
            ntrials: self.trials,
            nreversals: self.reversals,
            npp: self.participants,
            nreps: self.repetitions,
            reward_probability: self.reward_probability,
            cutoff,
            mean_learning_rate: self.mean_learning_rate,
            std_learning_rate: self.std_learning_rate,
            mean_inverse_temperature: self.mean_inverse_temperature,
            std_inverse_temperature: self.std_inverse_temperature,
            cohens_d: self.cohens_d,
            seed: self.seed,
            parallel: self.parallel,
            output_dir: self.output_dir,
        })
    }
}

pub fn execute(mut args: RunArgs) -> Result<()> {
    let summary = args.summary.take();
    let config = args.into_config()?;
    config.validate()?;
    execute_config(&config, summary.as_deref())
}

/// Run one validated configuration, persist its records, and print a summary.
pub(crate) fn execute_config(config: &RunConfig, summary: Option<&Path>) -> Result<()> {
    if config.criterion == Criterion::GroupDifference {
        if let Some(d) = config.cohens_d {
            if let Some(ideal) = analytic_t_test_power(d, config.npp, config.cutoff) {
                println!(
                    "Power under perfect recovery (normal approximation): {:.1}%",
                    ideal * 100.0
                );
            }
        }
    }

    let analysis = config.analysis()?;
    let estimate = analysis.run()?;

    match config.criterion {
        Criterion::Correlation => println!(
            "Power to obtain r(true, recovered) >= {} with {} trials and {} participants: {:.1}%",
            config.cutoff,
            config.ntrials,
            config.npp,
            estimate.power * 100.0
        ),
        Criterion::GroupDifference => println!(
            "Power to obtain p <= {} with {} trials and {} participants per group: {:.1}%",
            config.cutoff,
            config.ntrials,
            config.npp,
            estimate.power * 100.0
        ),
    }
    println!(
        "Mean proportion of failed estimates per repetition: {:.3}",
        estimate.mean_proportion_failed
    );
    if estimate.undefined_statistics > 0 {
        println!(
            "Warning: {} repetition(s) had an undefined statistic and did not count toward power",
            estimate.undefined_statistics
        );
    }

    let path = config.artifact_key().csv_path(&config.output_dir);
    write_records(&path, &estimate.records)
        .with_context(|| format!("writing repetition records to '{}'", path.display()))?;
    println!("Repetition records written to {}", path.display());

    if let Some(summary_path) = summary {
        let file = File::create(summary_path)
            .with_context(|| format!("creating summary file '{}'", summary_path.display()))?;
        let summary = RunSummaryFile {
            criterion: config.criterion.to_string(),
            ntrials: config.ntrials,
            nreversals: config.nreversals,
            npp: config.npp,
            nreps: config.nreps,
            cutoff: config.cutoff,
            seed: config.seed,
            power: estimate.power,
            mean_proportion_failed: estimate.mean_proportion_failed,
            undefined_statistics: estimate.undefined_statistics,
        };
        to_writer_pretty(file, &summary)
            .with_context(|| format!("writing summary to '{}'", summary_path.display()))?;
        println!("Summary written to {}", summary_path.display());
    }

    Ok(())
}
