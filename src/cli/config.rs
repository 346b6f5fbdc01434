//! Shared configuration types for CLI commands

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::design::DesignSpec;
use crate::error::{Error, Result};
use crate::export::ArtifactKey;
use crate::power::{
    CorrelationStudy, Criterion, GroupDifferenceStudy, PowerAnalysis, Study,
};
use crate::sampler::ParameterDistribution;

/// Fewest trials a design may have
pub const MIN_TRIALS: usize = 5;
/// Fewest participants a repetition may have (per group for the group criterion)
pub const MIN_PARTICIPANTS: usize = 5;
/// Pooled standard deviation used to translate Cohen's d into group means
pub const POOLED_STD: f64 = 0.1;
/// Center of the two group learning-rate means
const GROUP_CENTER: f64 = 0.5;

/// Full configuration of one power analysis.
///
/// For the group-difference criterion the learning-rate distribution fields
/// are ignored: both group distributions are derived from `cohens_d` around
/// a center of 0.5 with the pooled standard deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub criterion: Criterion,

    /// Number of trials in the simulated experiment
    pub ntrials: usize,

    /// Number of rule reversals
    pub nreversals: usize,

    /// Participants per repetition (per group for the group criterion)
    pub npp: usize,

    /// Number of Monte Carlo repetitions
    pub nreps: usize,

    /// Probability that feedback is congruent with the active rule
    pub reward_probability: f64,

    /// Success cutoff: minimum correlation, or maximum p-value
    pub cutoff: f64,

    /// Learning-rate population mean (correlation criterion)
    pub mean_learning_rate: f64,

    /// Learning-rate population standard deviation (correlation criterion)
    pub std_learning_rate: f64,

    /// Inverse-temperature population mean
    pub mean_inverse_temperature: f64,

    /// Inverse-temperature population standard deviation
    pub std_inverse_temperature: f64,

    /// True effect size (group-difference criterion only)
    pub cohens_d: Option<f64>,

    /// Random seed for reproducibility
    pub seed: Option<u64>,

    /// Run repetitions on the worker pool
    pub parallel: bool,

    /// Directory repetition records are written to; must already exist
    pub output_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::Correlation,
            ntrials: 480,
            nreversals: 12,
            npp: 30,
            nreps: 250,
            reward_probability: 0.8,
            cutoff: 0.7,
            mean_learning_rate: 0.5,
            std_learning_rate: 0.1,
            mean_inverse_temperature: 2.0,
            std_inverse_temperature: 1.0,
            cohens_d: None,
            seed: None,
            parallel: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl RunConfig {
    /// Validate every field before any simulation starts.
    ///
    /// # Errors
    ///
    /// Returns the specific [`Error`] variant for the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.ntrials < MIN_TRIALS {
            return Err(Error::TrialCountTooSmall {
                ntrials: self.ntrials,
                minimum: MIN_TRIALS,
            });
        }
        if self.nreversals >= self.ntrials {
            return Err(Error::ReversalsExceedTrials {
                nreversals: self.nreversals,
                ntrials: self.ntrials,
            });
        }
        if self.npp < MIN_PARTICIPANTS {
            return Err(Error::ParticipantCountTooSmall {
                npp: self.npp,
                minimum: MIN_PARTICIPANTS,
            });
        }
        if !(0.0..=1.0).contains(&self.reward_probability) {
            return Err(Error::ProbabilityOutOfRange {
                name: "reward probability".to_string(),
                value: self.reward_probability,
            });
        }
        if !(0.0..=1.0).contains(&self.cutoff) {
            return Err(Error::ProbabilityOutOfRange {
                name: "cutoff".to_string(),
                value: self.cutoff,
            });
        }
        if !(self.std_learning_rate.is_finite() && self.std_learning_rate > 0.0) {
            return Err(Error::NonPositiveStandardDeviation {
                value: self.std_learning_rate,
            });
        }
        if !(self.std_inverse_temperature.is_finite() && self.std_inverse_temperature > 0.0) {
            return Err(Error::NonPositiveStandardDeviation {
                value: self.std_inverse_temperature,
            });
        }
        if !self.mean_learning_rate.is_finite() {
            return Err(Error::NonFiniteMean {
                value: self.mean_learning_rate,
            });
        }
        if !self.mean_inverse_temperature.is_finite() {
            return Err(Error::NonFiniteMean {
                value: self.mean_inverse_temperature,
            });
        }
        if self.criterion == Criterion::GroupDifference {
            let d = self.cohens_d.unwrap_or(0.0);
            if d <= 0.0 {
                return Err(Error::NonPositiveEffectSize { value: d });
            }
        }
        if self.nreps < 1 {
            return Err(Error::NonPositiveRepetitions { nreps: self.nreps });
        }
        if !self.output_dir.is_dir() {
            return Err(Error::OutputDirMissing {
                path: self.output_dir.display().to_string(),
            });
        }
        Ok(())
    }

    fn design(&self) -> DesignSpec {
        DesignSpec {
            ntrials: self.ntrials,
            nreversals: self.nreversals,
            reward_probability: self.reward_probability,
        }
    }

    /// Build the runnable analysis from this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a population distribution is invalid; call
    /// [`RunConfig::validate`] first for field-level messages.
    pub fn analysis(&self) -> Result<PowerAnalysis> {
        let inverse_temperature = ParameterDistribution::new(
            self.mean_inverse_temperature,
            self.std_inverse_temperature,
        )?;

        let study = match self.criterion {
            Criterion::Correlation => Study::Correlation(CorrelationStudy {
                design: self.design(),
                npp: self.npp,
                learning_rate: ParameterDistribution::new(
                    self.mean_learning_rate,
                    self.std_learning_rate,
                )?,
                inverse_temperature,
            }),
            Criterion::GroupDifference => {
                // cohens_d = (mean_high - mean_low) / s_pooled, so the two
                // means sit d * s_pooled apart around the center.
                let d = match self.cohens_d {
                    Some(d) if d > 0.0 => d,
                    _ => return Err(Error::NonPositiveEffectSize {
                        value: self.cohens_d.unwrap_or(0.0),
                    }),
                };
                let shift = d * POOLED_STD / 2.0;
                Study::GroupDifference(GroupDifferenceStudy {
                    design: self.design(),
                    npp_per_group: self.npp,
                    learning_rate_low: ParameterDistribution::new(
                        GROUP_CENTER - shift,
                        POOLED_STD,
                    )?,
                    learning_rate_high: ParameterDistribution::new(
                        GROUP_CENTER + shift,
                        POOLED_STD,
                    )?,
                    inverse_temperature,
                })
            }
        };

        Ok(PowerAnalysis {
            study,
            nreps: self.nreps,
            cutoff: self.cutoff,
            seed: self.seed,
            parallel: self.parallel,
        })
    }

    /// Artifact identity for this configuration
    pub fn artifact_key(&self) -> ArtifactKey {
        let std = match self.criterion {
            Criterion::Correlation => self.std_learning_rate,
            Criterion::GroupDifference => POOLED_STD,
        };
        ArtifactKey {
            criterion: self.criterion,
            std,
            ntrials: self.ntrials,
            nreversals: self.nreversals,
            npp: self.npp,
            nreps: self.nreps,
        }
    }

    /// Load a batch of configurations from a semicolon-delimited input file.
    ///
    /// Expected header:
    /// `ntrials;nreversals;npp;reward_probability;full_speed;criterion;significance_cutoff;cohens_d;nreps;output_folder`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Artifact`] naming the file when it cannot be opened
    /// or a row does not match the expected layout.
    pub fn from_batch_file(path: &Path) -> Result<Vec<RunConfig>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| Error::Artifact {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut configs = Vec::new();
        for row in reader.deserialize() {
            let row: BatchRow = row.map_err(|e| Error::Artifact {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            configs.push(row.into_config()?);
        }
        Ok(configs)
    }
}

/// One row of the batch input file, in its on-disk column order.
#[derive(Debug, Deserialize)]
struct BatchRow {
    ntrials: usize,
    nreversals: usize,
    npp: usize,
    reward_probability: f64,
    full_speed: u8,
    criterion: String,
    significance_cutoff: f64,
    cohens_d: Option<f64>,
    nreps: usize,
    #[serde(alias = "plot_folder")]
    output_folder: PathBuf,
}

impl BatchRow {
    fn into_config(self) -> Result<RunConfig> {
        Ok(RunConfig {
            criterion: self.criterion.parse()?,
            ntrials: self.ntrials,
            nreversals: self.nreversals,
            npp: self.npp,
            nreps: self.nreps,
            reward_probability: self.reward_probability,
            cutoff: self.significance_cutoff,
            cohens_d: self.cohens_d,
            parallel: self.full_speed != 0,
            output_dir: self.output_folder,
            ..RunConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn valid_config() -> RunConfig {
        RunConfig {
            output_dir: std::env::temp_dir(),
            ..RunConfig::default()
        }
    }

    #[test]
    fn default_configuration_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn each_invalid_field_maps_to_its_own_error() {
        let mut config = valid_config();
        config.ntrials = 4;
        assert!(matches!(
            config.validate(),
            Err(Error::TrialCountTooSmall { ntrials: 4, minimum: 5 })
        ));

        let mut config = valid_config();
        config.nreversals = config.ntrials;
        assert!(matches!(
            config.validate(),
            Err(Error::ReversalsExceedTrials { .. })
        ));

        let mut config = valid_config();
        config.npp = 2;
        assert!(matches!(
            config.validate(),
            Err(Error::ParticipantCountTooSmall { npp: 2, minimum: 5 })
        ));

        let mut config = valid_config();
        config.reward_probability = 1.2;
        assert!(matches!(
            config.validate(),
            Err(Error::ProbabilityOutOfRange { .. })
        ));

        let mut config = valid_config();
        config.cutoff = -0.1;
        assert!(matches!(
            config.validate(),
            Err(Error::ProbabilityOutOfRange { .. })
        ));

        let mut config = valid_config();
        config.std_learning_rate = 0.0;
        assert!(matches!(
            config.validate(),
            Err(Error::NonPositiveStandardDeviation { .. })
        ));

        let mut config = valid_config();
        config.std_learning_rate = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(Error::NonPositiveStandardDeviation { .. })
        ));

        let mut config = valid_config();
        config.mean_inverse_temperature = f64::NAN;
        assert!(matches!(config.validate(), Err(Error::NonFiniteMean { .. })));

        let mut config = valid_config();
        config.nreps = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::NonPositiveRepetitions { nreps: 0 })
        ));

        let mut config = valid_config();
        config.output_dir = PathBuf::from("definitely/not/a/directory");
        assert!(matches!(config.validate(), Err(Error::OutputDirMissing { .. })));
    }

    #[test]
    fn group_criterion_requires_a_positive_effect_size() {
        let mut config = valid_config();
        config.criterion = Criterion::GroupDifference;
        config.cohens_d = None;
        assert!(matches!(
            config.validate(),
            Err(Error::NonPositiveEffectSize { .. })
        ));

        config.cohens_d = Some(0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn group_means_are_centered_and_separated_by_the_effect() {
        let mut config = valid_config();
        config.criterion = Criterion::GroupDifference;
        config.cohens_d = Some(0.8);
        let analysis = config.analysis().unwrap();
        match analysis.study {
            Study::GroupDifference(study) => {
                let separation = study.learning_rate_high.mean - study.learning_rate_low.mean;
                assert!((separation - 0.8 * POOLED_STD).abs() < 1e-12);
                let center = (study.learning_rate_high.mean + study.learning_rate_low.mean) / 2.0;
                assert!((center - 0.5).abs() < 1e-12);
                assert_eq!(study.learning_rate_low.std, POOLED_STD);
            }
            Study::Correlation(_) => panic!("expected a group-difference study"),
        }
    }

    #[test]
    fn batch_file_rows_become_configurations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "ntrials;nreversals;npp;reward_probability;full_speed;criterion;significance_cutoff;cohens_d;nreps;output_folder"
        )
        .unwrap();
        writeln!(file, "480;12;30;0.8;1;correlation;0.7;;250;out").unwrap();
        writeln!(file, "80;3;20;0.9;0;group_difference;0.05;0.5;100;out").unwrap();
        drop(file);

        let configs = RunConfig::from_batch_file(&path).unwrap();
        assert_eq!(configs.len(), 2);

        assert_eq!(configs[0].criterion, Criterion::Correlation);
        assert_eq!(configs[0].ntrials, 480);
        assert!(configs[0].parallel);
        assert_eq!(configs[0].cohens_d, None);

        assert_eq!(configs[1].criterion, Criterion::GroupDifference);
        assert_eq!(configs[1].npp, 20);
        assert!(!configs[1].parallel);
        assert_eq!(configs[1].cohens_d, Some(0.5));
        assert_eq!(configs[1].output_dir, PathBuf::from("out"));
    }

    #[test]
    fn malformed_batch_row_is_rejected_with_the_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        std::fs::write(&path, "ntrials;nreversals\nnot-a-number;1\n").unwrap();
        match RunConfig::from_batch_file(&path) {
            Err(Error::Artifact { path: p, .. }) => assert!(p.contains("input.csv")),
            other => panic!("expected an artifact error, got {other:?}"),
        }
    }
}
