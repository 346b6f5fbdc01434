//! COMPASS - Simulation-based power analysis for RL parameter recovery
//!
//! This crate provides:
//! - Reversal-learning trial-design generation with controlled rule schedules
//! - Rescorla-Wagner behavior simulation with softmax choice
//! - Maximum-likelihood parameter recovery via Nelder-Mead
//! - Monte Carlo power estimation under correlation and group-difference criteria
//! - Artifact persistence and grid aggregation for design sweeps

pub mod cli;
pub mod design;
pub mod error;
pub mod export;
pub mod likelihood;
pub mod model;
pub mod power;
pub mod recovery;
pub mod sampler;
pub mod stats;

pub use design::{DesignSpec, Trial, TrialDesign};
pub use error::{Error, Result};
pub use power::{
    CorrelationStudy, Criterion, GroupDifferenceStudy, PowerAnalysis, PowerEstimate,
    RepetitionRecord, Study,
};
pub use recovery::{ParameterSet, RecoveryOutcome, recover};
pub use sampler::ParameterDistribution;
