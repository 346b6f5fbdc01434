//! Artifact persistence and grid aggregation
//!
//! Each run writes its per-repetition records to a CSV whose name encodes
//! the run configuration, so independently executed runs (for example one
//! cluster job per grid cell) can later be combined into a single power
//! surface without any shared state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::power::{Criterion, RepetitionRecord};

/// The configuration facets that identify one run's artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub criterion: Criterion,
    /// Standard deviation of the learning-rate distribution(s)
    pub std: f64,
    pub ntrials: usize,
    pub nreversals: usize,
    /// Participants per repetition (per group for the group criterion)
    pub npp: usize,
    pub nreps: usize,
}

impl ArtifactKey {
    /// Configuration-derived file stem, e.g.
    /// `correlation_0.1SD_480T_1R_40N_250reps`.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}SD_{}T_{}R_{}N_{}reps",
            self.criterion, self.std, self.ntrials, self.nreversals, self.npp, self.nreps
        )
    }

    pub fn csv_path(&self, directory: &Path) -> PathBuf {
        directory.join(format!("{}.csv", self.file_stem()))
    }
}

/// Write one run's repetition records.
pub fn write_records(path: &Path, records: &[RepetitionRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::Artifact {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|source| Error::Io {
        operation: format!("flush artifact '{}'", path.display()),
        source,
    })?;
    Ok(())
}

/// Read one run's repetition records back.
pub fn read_records(path: &Path) -> Result<Vec<RepetitionRecord>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| Error::Artifact {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: RepetitionRecord = row.map_err(|e| Error::Artifact {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// One cell of the combined power surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSurfaceRow {
    pub ntrials: usize,
    pub npp: usize,
    pub power: f64,
    pub mean_proportion_failed: f64,
    pub undefined_statistics: usize,
}

/// Score a set of persisted records against a criterion and cutoff.
pub fn score_records(
    records: &[RepetitionRecord],
    criterion: Criterion,
    cutoff: f64,
) -> (f64, f64, usize) {
    if records.is_empty() {
        return (0.0, 0.0, 0);
    }
    let successes = records
        .iter()
        .filter(|r| criterion.is_met(r.statistic, cutoff))
        .count();
    let undefined = records.iter().filter(|r| r.statistic.is_nan()).count();
    let mean_failed =
        records.iter().map(|r| r.proportion_failed).sum::<f64>() / records.len() as f64;
    (successes as f64 / records.len() as f64, mean_failed, undefined)
}

/// Grid facets shared by every cell of a combine pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub criterion: Criterion,
    pub std: f64,
    pub nreversals: usize,
    pub nreps: usize,
    pub cutoff: f64,
    pub trial_counts: Vec<usize>,
    pub participant_counts: Vec<usize>,
}

/// Load every artifact of a (trials × participants) grid from `directory`
/// and reduce each to one power-surface row. A missing or malformed artifact
/// aborts the combine with an [`Error::Artifact`] naming the file.
pub fn combine_grid(directory: &Path, grid: &GridSpec) -> Result<Vec<PowerSurfaceRow>> {
    let mut rows = Vec::with_capacity(grid.trial_counts.len() * grid.participant_counts.len());
    for &ntrials in &grid.trial_counts {
        for &npp in &grid.participant_counts {
            let key = ArtifactKey {
                criterion: grid.criterion,
                std: grid.std,
                ntrials,
                nreversals: grid.nreversals,
                npp,
                nreps: grid.nreps,
            };
            let records = read_records(&key.csv_path(directory))?;
            let (power, mean_proportion_failed, undefined_statistics) =
                score_records(&records, grid.criterion, grid.cutoff);
            rows.push(PowerSurfaceRow {
                ntrials,
                npp,
                power,
                mean_proportion_failed,
                undefined_statistics,
            });
        }
    }
    Ok(rows)
}

/// Write the combined power surface as CSV.
pub fn write_surface(path: &Path, rows: &[PowerSurfaceRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::Artifact {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| Error::Io {
        operation: format!("flush power surface '{}'", path.display()),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_encodes_every_facet() {
        let key = ArtifactKey {
            criterion: Criterion::Correlation,
            std: 0.1,
            ntrials: 480,
            nreversals: 1,
            npp: 40,
            nreps: 250,
        };
        assert_eq!(key.file_stem(), "correlation_0.1SD_480T_1R_40N_250reps");

        let key = ArtifactKey {
            criterion: Criterion::GroupDifference,
            std: 0.05,
            ntrials: 80,
            nreversals: 3,
            npp: 20,
            nreps: 100,
        };
        assert_eq!(key.file_stem(), "group-difference_0.05SD_80T_3R_20N_100reps");
    }

    #[test]
    fn scoring_skips_nan_and_counts_it() {
        let records = vec![
            RepetitionRecord {
                repetition: 0,
                statistic: 0.9,
                proportion_failed: 0.0,
            },
            RepetitionRecord {
                repetition: 1,
                statistic: f64::NAN,
                proportion_failed: 1.0,
            },
        ];
        let (power, mean_failed, undefined) = score_records(&records, Criterion::Correlation, 0.8);
        assert!((power - 0.5).abs() < 1e-12);
        assert!((mean_failed - 0.5).abs() < 1e-12);
        assert_eq!(undefined, 1);
    }

    #[test]
    fn empty_record_set_scores_to_zero() {
        let (power, mean_failed, undefined) = score_records(&[], Criterion::GroupDifference, 0.05);
        assert_eq!(power, 0.0);
        assert_eq!(mean_failed, 0.0);
        assert_eq!(undefined, 0);
    }
}
