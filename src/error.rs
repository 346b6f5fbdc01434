//! Error types for the compass crate

use thiserror::Error;

/// Main error type for the compass crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("trial count {ntrials} is too small (minimum {minimum})")]
    TrialCountTooSmall { ntrials: usize, minimum: usize },

    #[error("reversal count {nreversals} must be smaller than trial count {ntrials}")]
    ReversalsExceedTrials { nreversals: usize, ntrials: usize },

    #[error("participant count {npp} is too small (minimum {minimum})")]
    ParticipantCountTooSmall { npp: usize, minimum: usize },

    #[error("{name} = {value} is outside [0, 1]")]
    ProbabilityOutOfRange { name: String, value: f64 },

    #[error("effect size {value} must be > 0 for the group-difference criterion")]
    NonPositiveEffectSize { value: f64 },

    #[error("repetition count must be at least 1, got {nreps}")]
    NonPositiveRepetitions { nreps: usize },

    #[error("distribution standard deviation {value} must be finite and > 0")]
    NonPositiveStandardDeviation { value: f64 },

    #[error("distribution mean {value} must be finite")]
    NonFiniteMean { value: f64 },

    #[error("output directory '{path}' does not exist")]
    OutputDirMissing { path: String },

    #[error("invalid criterion '{input}'. Expected one of: {expected}")]
    ParseCriterion { input: String, expected: String },

    #[error("optimizer failed: {message}")]
    Optimization { message: String },

    #[error("artifact '{path}' is missing or malformed: {message}")]
    Artifact { path: String, message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
