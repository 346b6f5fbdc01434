//! Statistical tests over recovered parameters
//!
//! Pearson correlation for the recovery criterion, a one-sided pooled
//! two-sample t-test for the group-difference criterion, and an analytic
//! benchmark for the power the t-test would have under perfect recovery.
//! Undefined results (too few points, zero variance) are `None`; callers
//! surface them as NaN rather than silently coercing.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

const EPS: f64 = 1e-12;

/// Pearson correlation coefficient between two equal-length samples.
///
/// Returns `None` when fewer than two pairs remain or either sample has zero
/// variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len();
    if n < 2 {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x < EPS || var_y < EPS {
        return None;
    }
    Some(covariance / (var_x * var_y).sqrt())
}

/// Result of a two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// One-sided pooled two-sample t-test with alternative `mean(g0) < mean(g1)`.
///
/// The pooled variance assumes equal population variances, matching the
/// generative setup where both groups share a standard deviation. Returns
/// `None` when either group has fewer than two members or the pooled
/// variance is zero.
pub fn one_sided_t_test(g0: &[f64], g1: &[f64]) -> Option<TTest> {
    let n0 = g0.len();
    let n1 = g1.len();
    if n0 < 2 || n1 < 2 {
        return None;
    }

    let mean0 = g0.iter().sum::<f64>() / n0 as f64;
    let mean1 = g1.iter().sum::<f64>() / n1 as f64;
    let ss0 = g0.iter().map(|&v| (v - mean0).powi(2)).sum::<f64>();
    let ss1 = g1.iter().map(|&v| (v - mean1).powi(2)).sum::<f64>();

    let df = (n0 + n1 - 2) as f64;
    let pooled_variance = (ss0 + ss1) / df;
    if pooled_variance < EPS {
        return None;
    }
    let standard_error = (pooled_variance * (1.0 / n0 as f64 + 1.0 / n1 as f64)).sqrt();
    let statistic = (mean0 - mean1) / standard_error;

    // Alternative g0 < g1: small (negative) statistics are evidence, so the
    // p-value is the lower tail.
    let distribution = StudentsT::new(0.0, 1.0, df).ok()?;
    let p_value = distribution.cdf(statistic);

    Some(TTest { statistic, p_value })
}

/// Analytic power of the one-sided two-sample t-test under perfect recovery.
///
/// Normal approximation to the noncentral t: with effect size `cohens_d`,
/// `n` participants per group and significance level `alpha`, power is
/// `Phi(d * sqrt(n / 2) - z_{1 - alpha})`. Accurate to a couple of
/// percentage points for the group sizes this tool targets; reported as a
/// benchmark, never as a substitute for the simulated estimate.
pub fn analytic_t_test_power(cohens_d: f64, n_per_group: usize, alpha: f64) -> Option<f64> {
    if n_per_group < 2 || !(0.0..=1.0).contains(&alpha) {
        return None;
    }
    let standard_normal = Normal::new(0.0, 1.0).ok()?;
    let noncentrality = cohens_d * (n_per_group as f64 / 2.0).sqrt();
    let critical = standard_normal.inverse_cdf(1.0 - alpha);
    Some(standard_normal.cdf(noncentrality - critical))
}
