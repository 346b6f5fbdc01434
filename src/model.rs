//! Rescorla-Wagner model with softmax choice
//!
//! The generative model behind both simulation and likelihood evaluation: a
//! 2×2 table of action values (one per stimulus-response pair), a delta
//! learning rule, and a softmax mapping values to choice probabilities.

use rand::Rng;

use crate::design::{Trial, TrialDesign};

/// Starting value for every stimulus-response pair
pub const INITIAL_VALUE: f64 = 0.5;

/// Action values for the four stimulus-response pairs.
///
/// Created fresh for each simulation or likelihood pass and discarded
/// afterwards; value state never leaks between participants or between
/// optimizer evaluations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueTable {
    values: [[f64; 2]; 2],
}

impl ValueTable {
    pub fn new() -> Self {
        Self {
            values: [[INITIAL_VALUE; 2]; 2],
        }
    }

    /// Values of both responses for the given stimulus
    pub fn row(&self, stimulus: u8) -> [f64; 2] {
        self.values[stimulus as usize]
    }

    pub fn get(&self, stimulus: u8, response: u8) -> f64 {
        self.values[stimulus as usize][response as usize]
    }

    pub fn set(&mut self, stimulus: u8, response: u8, value: f64) {
        self.values[stimulus as usize][response as usize] = value;
    }
}

impl Default for ValueTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Delta learning rule.
///
/// Returns the prediction error `reward - previous_value` and the updated
/// value `previous_value + learning_rate * prediction_error`. Pure function;
/// callers write the new value back into their table.
pub fn delta_rule(previous_value: f64, reward: f64, learning_rate: f64) -> (f64, f64) {
    let prediction_error = reward - previous_value;
    let updated = previous_value + learning_rate * prediction_error;
    (prediction_error, updated)
}

/// Softmax choice probabilities over the two responses for one stimulus.
///
/// `P(a) = exp(value[a] * beta) / (exp(value[0] * beta) + exp(value[1] * beta))`
pub fn softmax(values: [f64; 2], inverse_temperature: f64) -> [f64; 2] {
    // Subtracting the max keeps the exponentials bounded for large beta.
    let scaled = [values[0] * inverse_temperature, values[1] * inverse_temperature];
    let max = scaled[0].max(scaled[1]);
    let e0 = (scaled[0] - max).exp();
    let e1 = (scaled[1] - max).exp();
    let total = e0 + e1;
    [e0 / total, e1 / total]
}

/// Whether reward is delivered on a trial given the response.
///
/// Reward is present when the response matches the correct response on a
/// congruent trial, or mismatches it on an incongruent trial.
pub fn reward_present(trial: &Trial, response: u8) -> bool {
    (response == trial.correct_response) == trial.feedback_congruent
}

/// Simulate one participant's responses over a design.
///
/// Runs the Rescorla-Wagner model trial by trial: look up the value row for
/// the trial's stimulus, draw a response from the softmax probabilities,
/// determine reward, and apply the delta rule to the chosen cell. The trial
/// loop is inherently sequential; each update feeds the next trial's
/// probabilities.
pub fn simulate_responses<R: Rng + ?Sized>(
    learning_rate: f64,
    inverse_temperature: f64,
    design: &TrialDesign,
    rng: &mut R,
) -> Vec<u8> {
    let mut values = ValueTable::new();
    let mut responses = Vec::with_capacity(design.len());

    for trial in design.trials() {
        let probabilities = softmax(values.row(trial.stimulus), inverse_temperature);
        let draw: f64 = rng.random();
        let response: u8 = if draw <= probabilities[1] { 1 } else { 0 };
        responses.push(response);

        let reward = if reward_present(trial, response) { 1.0 } else { 0.0 };
        let (_pe, updated) = delta_rule(values.get(trial.stimulus, response), reward, learning_rate);
        values.set(trial.stimulus, response, updated);
    }

    responses
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::design::DesignSpec;

    #[test]
    fn delta_rule_zero_prediction_error_leaves_value_unchanged() {
        for &v in &[0.0, 0.3, 0.5, 1.0] {
            for &lr in &[0.0, 0.1, 1.0, 2.0] {
                let (pe, updated) = delta_rule(v, v, lr);
                assert_eq!(pe, 0.0);
                assert_eq!(updated, v);
            }
        }
    }

    #[test]
    fn delta_rule_moves_value_toward_reward() {
        let (pe, updated) = delta_rule(0.5, 1.0, 0.2);
        assert!((pe - 0.5).abs() < 1e-12);
        assert!((updated - 0.6).abs() < 1e-12);

        let (pe, updated) = delta_rule(0.5, 0.0, 0.2);
        assert!((pe + 0.5).abs() < 1e-12);
        assert!((updated - 0.4).abs() < 1e-12);
    }

    #[test]
    fn softmax_is_uniform_for_equal_values() {
        let p = softmax([0.5, 0.5], 3.0);
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn softmax_sharpens_with_inverse_temperature() {
        let soft = softmax([0.2, 0.8], 1.0);
        let sharp = softmax([0.2, 0.8], 20.0);
        assert!(sharp[1] > soft[1]);
        assert!(sharp[1] > 0.99);
        assert!((sharp[0] + sharp[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn softmax_survives_extreme_inverse_temperature() {
        let p = softmax([0.0, 1.0], 1000.0);
        assert!(p[1] > 0.999);
        assert!(p.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn reward_presence_follows_congruence() {
        let congruent = Trial {
            rule: 1,
            stimulus: 0,
            correct_response: 0,
            feedback_congruent: true,
        };
        assert!(reward_present(&congruent, 0));
        assert!(!reward_present(&congruent, 1));

        let incongruent = Trial {
            feedback_congruent: false,
            ..congruent
        };
        assert!(!reward_present(&incongruent, 0));
        assert!(reward_present(&incongruent, 1));
    }

    #[test]
    fn simulation_produces_one_binary_response_per_trial() {
        let mut rng = StdRng::seed_from_u64(5);
        let design = TrialDesign::generate(&DesignSpec::default(), &mut rng);
        let responses = simulate_responses(0.5, 2.0, &design, &mut rng);
        assert_eq!(responses.len(), design.len());
        assert!(responses.iter().all(|&r| r <= 1));
    }

    #[test]
    fn deterministic_chooser_learns_the_rule() {
        // Very high beta makes choice near-deterministic; with fully
        // congruent feedback and no reversals, accuracy in the second half
        // of the experiment should be well above chance.
        let mut rng = StdRng::seed_from_u64(17);
        let spec = DesignSpec {
            ntrials: 200,
            nreversals: 0,
            reward_probability: 1.0,
        };
        let design = TrialDesign::generate(&spec, &mut rng);
        let responses = simulate_responses(0.7, 50.0, &design, &mut rng);

        let late_correct = design
            .trials()
            .zip(&responses)
            .skip(100)
            .filter(|(t, r)| **r == t.correct_response)
            .count();
        assert!(
            late_correct > 80,
            "late accuracy should be high, got {late_correct}/100"
        );
    }
}
