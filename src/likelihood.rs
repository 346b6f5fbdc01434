//! Likelihood of a response sequence under the Rescorla-Wagner model
//!
//! The quantity minimized during parameter recovery: the negative summed
//! log-likelihood of one participant's responses given the design and a
//! candidate `(learning rate, inverse temperature)` pair.

use crate::design::TrialDesign;
use crate::model::{ValueTable, delta_rule, reward_present};

/// Negative summed log-likelihood of `responses` under the candidate
/// parameters.
///
/// Replays the value-learning loop with the observed responses: each trial
/// contributes `v[x] * beta - ln(sum_b exp(v[b] * beta))` for the chosen
/// response `x`, then the chosen cell is updated with the delta rule. A fresh
/// value table is built on every call, so repeated evaluations of the same
/// data are independent; the optimizer may call this in any order.
///
/// The log-sum-exp term is stabilized by factoring out the row maximum, which
/// keeps large inverse temperatures from overflowing the exponentials.
pub fn negative_log_likelihood(
    learning_rate: f64,
    inverse_temperature: f64,
    design: &TrialDesign,
    responses: &[u8],
) -> f64 {
    debug_assert_eq!(design.len(), responses.len());

    let mut values = ValueTable::new();
    let mut log_likelihood = 0.0;

    for (trial, &response) in design.trials().zip(responses) {
        let row = values.row(trial.stimulus);
        let scaled = [row[0] * inverse_temperature, row[1] * inverse_temperature];
        let max = scaled[0].max(scaled[1]);
        let log_normalizer = max + ((scaled[0] - max).exp() + (scaled[1] - max).exp()).ln();
        log_likelihood += scaled[response as usize] - log_normalizer;

        let reward = if reward_present(trial, response) { 1.0 } else { 0.0 };
        let (_pe, updated) = delta_rule(values.get(trial.stimulus, response), reward, learning_rate);
        values.set(trial.stimulus, response, updated);
    }

    -log_likelihood
}
