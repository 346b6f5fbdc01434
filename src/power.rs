//! Power estimation over repeated simulated experiments
//!
//! One repetition simulates a full experiment (design, participants,
//! recovery) and reduces it to a single success statistic. The aggregator
//! runs many independent repetitions, each driven by its own seed so the
//! result does not depend on execution order, and reports the proportion of
//! repetitions whose statistic meets the criterion.

use std::fmt;
use std::str::FromStr;

use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::design::{DesignSpec, TrialDesign};
use crate::error::{Error, Result};
use crate::model::simulate_responses;
use crate::recovery::{RecoveryOutcome, recover};
use crate::sampler::ParameterDistribution;
use crate::stats::{one_sided_t_test, pearson_correlation};

/// Success criterion a repetition is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    /// Pearson r between true and recovered learning rates must reach the cutoff
    Correlation,
    /// One-sided t-test p-value between two groups must fall below the cutoff
    GroupDifference,
}

impl Criterion {
    /// Whether a repetition statistic satisfies the criterion at `cutoff`.
    /// NaN statistics never satisfy either criterion.
    pub fn is_met(self, statistic: f64, cutoff: f64) -> bool {
        match self {
            Criterion::Correlation => statistic >= cutoff,
            Criterion::GroupDifference => statistic <= cutoff,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Correlation => write!(f, "correlation"),
            Criterion::GroupDifference => write!(f, "group-difference"),
        }
    }
}

impl FromStr for Criterion {
    type Err = Error;

    /// Accepted spellings: `correlation`, `group-difference`, and the batch
    /// input file's `group_difference`; case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "correlation" => Ok(Criterion::Correlation),
            "group-difference" | "group_difference" => Ok(Criterion::GroupDifference),
            _ => Err(Error::ParseCriterion {
                input: s.to_string(),
                expected: "correlation, group-difference".to_string(),
            }),
        }
    }
}

/// Population setup for the correlation criterion: one group of `npp`
/// participants drawn from a single pair of distributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationStudy {
    pub design: DesignSpec,
    pub npp: usize,
    pub learning_rate: ParameterDistribution,
    pub inverse_temperature: ParameterDistribution,
}

/// Population setup for the group-difference criterion: two groups of
/// `npp_per_group` participants whose learning-rate distributions differ;
/// the inverse-temperature distribution is shared.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupDifferenceStudy {
    pub design: DesignSpec,
    pub npp_per_group: usize,
    pub learning_rate_low: ParameterDistribution,
    pub learning_rate_high: ParameterDistribution,
    pub inverse_temperature: ParameterDistribution,
}

/// One of the two study layouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Study {
    Correlation(CorrelationStudy),
    GroupDifference(GroupDifferenceStudy),
}

impl Study {
    pub fn criterion(&self) -> Criterion {
        match self {
            Study::Correlation(_) => Criterion::Correlation,
            Study::GroupDifference(_) => Criterion::GroupDifference,
        }
    }

    pub fn design(&self) -> &DesignSpec {
        match self {
            Study::Correlation(s) => &s.design,
            Study::GroupDifference(s) => &s.design,
        }
    }

    /// Total number of simulated participants per repetition
    pub fn total_participants(&self) -> usize {
        match self {
            Study::Correlation(s) => s.npp,
            Study::GroupDifference(s) => 2 * s.npp_per_group,
        }
    }
}

/// Result of a single repetition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRecord {
    pub repetition: usize,
    /// Pearson r or t-test p-value; NaN when undefined for this repetition
    pub statistic: f64,
    /// Proportion of participants whose recovery was degenerate
    pub proportion_failed: f64,
}

/// Aggregated output of a power analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerEstimate {
    pub power: f64,
    pub mean_proportion_failed: f64,
    /// Repetitions whose statistic was undefined (excluded from power)
    pub undefined_statistics: usize,
    pub records: Vec<RepetitionRecord>,
}

/// Configuration and driver for a full power analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerAnalysis {
    pub study: Study,
    pub nreps: usize,
    pub cutoff: f64,
    /// Master seed; absent means draw one from the OS entropy source
    pub seed: Option<u64>,
    /// Run repetitions on the rayon worker pool
    pub parallel: bool,
}

impl PowerAnalysis {
    /// Run all repetitions and aggregate them into a power estimate.
    ///
    /// Each repetition derives its own seed from the master seed, so results
    /// are identical whether repetitions run serially or on the worker pool.
    pub fn run(&self) -> Result<PowerEstimate> {
        let master_seed = match self.seed {
            Some(seed) => seed,
            None => rand::rng().random(),
        };

        let pb = ProgressBar::new(self.nreps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} repetitions")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );

        let run_one = |repetition: usize| -> Result<RepetitionRecord> {
            let mut rng = StdRng::seed_from_u64(master_seed.wrapping_add(repetition as u64));
            let record = self.repetition(repetition, &mut rng)?;
            pb.inc(1);
            Ok(record)
        };

        let mut records: Vec<RepetitionRecord> = if self.parallel {
            (0..self.nreps)
                .into_par_iter()
                .map(run_one)
                .collect::<Result<_>>()?
        } else {
            (0..self.nreps).map(run_one).collect::<Result<_>>()?
        };
        pb.finish_and_clear();

        records.sort_by_key(|r| r.repetition);
        Ok(self.aggregate(records))
    }

    /// Score already-collected repetition records.
    pub fn aggregate(&self, records: Vec<RepetitionRecord>) -> PowerEstimate {
        let criterion = self.study.criterion();
        let successes = records
            .iter()
            .filter(|r| criterion.is_met(r.statistic, self.cutoff))
            .count();
        let undefined_statistics = records.iter().filter(|r| r.statistic.is_nan()).count();
        let mean_proportion_failed = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| r.proportion_failed).sum::<f64>() / records.len() as f64
        };
        let power = if records.is_empty() {
            0.0
        } else {
            successes as f64 / records.len() as f64
        };

        PowerEstimate {
            power,
            mean_proportion_failed,
            undefined_statistics,
            records,
        }
    }

    fn repetition<R: Rng + ?Sized>(
        &self,
        repetition: usize,
        rng: &mut R,
    ) -> Result<RepetitionRecord> {
        match &self.study {
            Study::Correlation(study) => correlation_repetition(repetition, study, rng),
            Study::GroupDifference(study) => group_difference_repetition(repetition, study, rng),
        }
    }
}

/// Simulate one correlation-criterion experiment.
///
/// One design is generated and shared by every participant; each participant
/// draws true parameters, produces its own response vector, and is fit
/// independently. Degenerate recoveries are excluded from the correlation
/// and counted into `proportion_failed`.
pub fn correlation_repetition<R: Rng + ?Sized>(
    repetition: usize,
    study: &CorrelationStudy,
    rng: &mut R,
) -> Result<RepetitionRecord> {
    let design = TrialDesign::generate(&study.design, rng);

    let mut true_rates = Vec::with_capacity(study.npp);
    let mut recovered_rates = Vec::with_capacity(study.npp);
    let mut failed = 0usize;

    for _ in 0..study.npp {
        let true_lr = study.learning_rate.sample(rng);
        let true_beta = study.inverse_temperature.sample(rng);
        let responses = simulate_responses(true_lr, true_beta, &design, rng);
        match recover(&design, &responses, rng)? {
            RecoveryOutcome::Recovered(estimate) => {
                true_rates.push(true_lr);
                recovered_rates.push(estimate.learning_rate);
            }
            RecoveryOutcome::Degenerate(_) => failed += 1,
        }
    }

    let statistic = pearson_correlation(&true_rates, &recovered_rates).unwrap_or(f64::NAN);
    Ok(RepetitionRecord {
        repetition,
        statistic,
        proportion_failed: failed as f64 / study.npp as f64,
    })
}

/// Simulate one group-difference experiment.
///
/// Both groups share the design and the inverse-temperature distribution but
/// draw learning rates from their own distributions. The statistic is the
/// one-sided p-value for the low group's recovered rates sitting below the
/// high group's.
pub fn group_difference_repetition<R: Rng + ?Sized>(
    repetition: usize,
    study: &GroupDifferenceStudy,
    rng: &mut R,
) -> Result<RepetitionRecord> {
    let design = TrialDesign::generate(&study.design, rng);

    let mut failed = 0usize;
    let mut recover_group = |distribution: &ParameterDistribution,
                             rng: &mut R|
     -> Result<Vec<f64>> {
        let mut recovered = Vec::with_capacity(study.npp_per_group);
        for _ in 0..study.npp_per_group {
            let true_lr = distribution.sample(rng);
            let true_beta = study.inverse_temperature.sample(rng);
            let responses = simulate_responses(true_lr, true_beta, &design, rng);
            match recover(&design, &responses, rng)? {
                RecoveryOutcome::Recovered(estimate) => recovered.push(estimate.learning_rate),
                RecoveryOutcome::Degenerate(_) => failed += 1,
            }
        }
        Ok(recovered)
    };

    let group_low = recover_group(&study.learning_rate_low, rng)?;
    let group_high = recover_group(&study.learning_rate_high, rng)?;

    let statistic = one_sided_t_test(&group_low, &group_high)
        .map(|t| t.p_value)
        .unwrap_or(f64::NAN);
    Ok(RepetitionRecord {
        repetition,
        statistic,
        proportion_failed: failed as f64 / (2 * study.npp_per_group) as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlation_analysis(cutoff: f64) -> PowerAnalysis {
        PowerAnalysis {
            study: Study::Correlation(CorrelationStudy {
                design: DesignSpec::default(),
                npp: 10,
                learning_rate: ParameterDistribution { mean: 0.5, std: 0.1 },
                inverse_temperature: ParameterDistribution { mean: 2.0, std: 1.0 },
            }),
            nreps: 4,
            cutoff,
            seed: Some(1),
            parallel: false,
        }
    }

    fn record(repetition: usize, statistic: f64, proportion_failed: f64) -> RepetitionRecord {
        RepetitionRecord {
            repetition,
            statistic,
            proportion_failed,
        }
    }

    #[test]
    fn criterion_parses_documented_spellings_only() {
        assert_eq!("correlation".parse::<Criterion>().unwrap(), Criterion::Correlation);
        assert_eq!("Correlation".parse::<Criterion>().unwrap(), Criterion::Correlation);
        assert_eq!(
            "group-difference".parse::<Criterion>().unwrap(),
            Criterion::GroupDifference
        );
        assert_eq!(
            "group_difference".parse::<Criterion>().unwrap(),
            Criterion::GroupDifference
        );
        for bad in ["anova", "ic", "gd"] {
            assert!(matches!(
                bad.parse::<Criterion>(),
                Err(Error::ParseCriterion { .. })
            ));
        }
    }

    #[test]
    fn nan_statistics_never_meet_either_criterion() {
        assert!(!Criterion::Correlation.is_met(f64::NAN, 0.0));
        assert!(!Criterion::GroupDifference.is_met(f64::NAN, 1.0));
    }

    #[test]
    fn correlation_power_counts_statistics_at_or_above_cutoff() {
        let analysis = correlation_analysis(0.8);
        let estimate = analysis.aggregate(vec![
            record(0, 0.95, 0.0),
            record(1, 0.80, 0.1),
            record(2, 0.50, 0.0),
            record(3, f64::NAN, 1.0),
        ]);
        assert!((estimate.power - 0.5).abs() < 1e-12);
        assert_eq!(estimate.undefined_statistics, 1);
        assert!((estimate.mean_proportion_failed - 0.275).abs() < 1e-12);
    }

    #[test]
    fn group_difference_power_counts_p_values_at_or_below_cutoff() {
        let mut analysis = correlation_analysis(0.05);
        analysis.study = Study::GroupDifference(GroupDifferenceStudy {
            design: DesignSpec::default(),
            npp_per_group: 10,
            learning_rate_low: ParameterDistribution { mean: 0.4, std: 0.1 },
            learning_rate_high: ParameterDistribution { mean: 0.6, std: 0.1 },
            inverse_temperature: ParameterDistribution { mean: 2.0, std: 1.0 },
        });
        let estimate = analysis.aggregate(vec![
            record(0, 0.01, 0.0),
            record(1, 0.05, 0.0),
            record(2, 0.20, 0.0),
            record(3, f64::NAN, 0.5),
        ]);
        assert!((estimate.power - 0.5).abs() < 1e-12);
        assert_eq!(estimate.undefined_statistics, 1);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let analysis = correlation_analysis(0.8);
        let forward = analysis.aggregate(vec![
            record(0, 0.9, 0.0),
            record(1, 0.7, 0.2),
            record(2, 0.85, 0.1),
        ]);
        let reversed = analysis.aggregate(vec![
            record(2, 0.85, 0.1),
            record(1, 0.7, 0.2),
            record(0, 0.9, 0.0),
        ]);
        assert_eq!(forward.power, reversed.power);
        assert_eq!(forward.mean_proportion_failed, reversed.mean_proportion_failed);
    }

    #[test]
    fn repetition_record_fields_are_well_formed() {
        let study = CorrelationStudy {
            design: DesignSpec {
                ntrials: 40,
                nreversals: 1,
                reward_probability: 0.8,
            },
            npp: 5,
            learning_rate: ParameterDistribution { mean: 0.5, std: 0.1 },
            inverse_temperature: ParameterDistribution { mean: 2.0, std: 1.0 },
        };
        let mut rng = StdRng::seed_from_u64(2);
        let record = correlation_repetition(7, &study, &mut rng).unwrap();
        assert_eq!(record.repetition, 7);
        assert!((0.0..=1.0).contains(&record.proportion_failed));
        assert!(record.statistic.is_nan() || (-1.0..=1.0).contains(&record.statistic));
    }
}
