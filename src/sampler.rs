//! Population-level parameter sampling
//!
//! True participant parameters are drawn from normal distributions truncated
//! to positive values; a draw at or below zero is simply redrawn. Both the
//! learning rate and the inverse temperature must stay strictly positive for
//! the generative model to be well defined.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A normal population distribution truncated to strictly positive values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDistribution {
    pub mean: f64,
    pub std: f64,
}

impl ParameterDistribution {
    pub fn new(mean: f64, std: f64) -> Result<Self> {
        // NaN fails both comparisons below, so spell the checks positively.
        if !(std.is_finite() && std > 0.0) {
            return Err(Error::NonPositiveStandardDeviation { value: std });
        }
        if !mean.is_finite() {
            return Err(Error::NonFiniteMean { value: mean });
        }
        Ok(Self { mean, std })
    }

    /// Draw one strictly positive value, redrawing any draw ≤ 0.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let normal = match Normal::new(self.mean, self.std) {
            Ok(normal) => normal,
            // std > 0 is enforced by the constructor
            Err(_) => unreachable!("standard deviation validated at construction"),
        };
        loop {
            let draw = normal.sample(rng);
            if draw > 0.0 {
                return draw;
            }
        }
    }

    /// Draw `count` strictly positive values.
    pub fn sample_many<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<f64> {
        (0..count).map(|_| self.sample(rng)).collect()
    }
}
