//! Batch command - Run one power analysis per input-file row

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::cli::commands::run::execute_config;
use crate::cli::config::RunConfig;

#[derive(Parser, Debug)]
#[command(about = "Run a batch of power analyses from an input file")]
pub struct BatchArgs {
    /// Semicolon-delimited input file, one analysis per row
    pub input: PathBuf,
}

pub fn execute(args: BatchArgs) -> Result<()> {
    let configs = RunConfig::from_batch_file(&args.input)
        .with_context(|| format!("reading batch input '{}'", args.input.display()))?;

    // Rows run in file order; the first invalid row stops the batch.
    for (index, config) in configs.iter().enumerate() {
        config
            .validate()
            .with_context(|| format!("row {index} of '{}'", args.input.display()))?;
        println!(
            "Row {index}: {} criterion, {} trials, {} participants, {} repetitions",
            config.criterion, config.ntrials, config.npp, config.nreps
        );
        execute_config(config, None).with_context(|| format!("row {index} failed"))?;
    }
    Ok(())
}
