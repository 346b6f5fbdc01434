//! Trial design generation for the reversal-learning task
//!
//! A design fixes everything about the experiment that is not behavior: which
//! stimulus-response mapping rule is active on each trial, which stimulus is
//! shown, which response the rule rewards, and whether feedback follows the
//! rule or is deliberately inverted. The same design is shared by simulation
//! and likelihood evaluation; responses live in a separate per-participant
//! vector so the design itself never mutates.

use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

/// One trial of the two-stimulus, two-response reversal-learning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    /// Active stimulus-response mapping rule (0 or 1)
    pub rule: u8,
    /// Stimulus shown this trial (0 or 1)
    pub stimulus: u8,
    /// Response the active rule rewards: `stimulus` under rule 1,
    /// `1 - stimulus` under rule 0
    pub correct_response: u8,
    /// Whether feedback follows the rule this trial (true) or is inverted
    pub feedback_congruent: bool,
}

/// Shape parameters of a design, kept separate from the generated schedule so
/// they can travel through configs and artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignSpec {
    /// Number of trials in the experiment
    pub ntrials: usize,
    /// Number of rule reversals (must be smaller than `ntrials`)
    pub nreversals: usize,
    /// Probability that feedback is congruent with the active rule
    pub reward_probability: f64,
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self {
            ntrials: 480,
            nreversals: 12,
            reward_probability: 0.8,
        }
    }
}

/// Immutable trial schedule shared by every simulated participant in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDesign {
    trials: Vec<Trial>,
}

impl TrialDesign {
    /// Generate a design from its spec.
    ///
    /// The rule column divides the trials into `nreversals + 1` alternating
    /// blocks, as evenly sized as possible: with `rest = ntrials % blocks`
    /// the first `blocks - rest` blocks have the base size and the remaining
    /// `rest` blocks carry one extra trial each, continuing the alternation.
    /// The stimulus column holds exactly `floor(ntrials / 2)` zeros and
    /// `ceil(ntrials / 2)` ones in random order; the feedback-congruence
    /// column holds exactly `round(ntrials * reward_probability)` congruent
    /// trials in random order.
    ///
    /// Assumes the caller has validated `nreversals < ntrials` (see
    /// `cli::config::RunConfig::validate`); a degenerate reversal count would produce
    /// empty base blocks rather than loop forever, but the schedule would no
    /// longer contain every rule label.
    pub fn generate<R: Rng + ?Sized>(spec: &DesignSpec, rng: &mut R) -> Self {
        let ntrials = spec.ntrials;
        let rules = rule_schedule(ntrials, spec.nreversals);

        let mut stimuli: Vec<u8> = vec![0; ntrials / 2];
        stimuli.extend(std::iter::repeat_n(1u8, ntrials.div_ceil(2)));
        stimuli.shuffle(rng);

        let ncongruent = (ntrials as f64 * spec.reward_probability).round() as usize;
        let mut congruence: Vec<bool> = vec![true; ncongruent];
        congruence.extend(std::iter::repeat_n(false, ntrials - ncongruent));
        congruence.shuffle(rng);

        let trials = (0..ntrials)
            .map(|t| {
                let rule = rules[t];
                let stimulus = stimuli[t];
                let correct_response = if rule == 1 { stimulus } else { 1 - stimulus };
                Trial {
                    rule,
                    stimulus,
                    correct_response,
                    feedback_congruent: congruence[t],
                }
            })
            .collect();

        Self { trials }
    }

    /// Number of trials in the design
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the design has no trials
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Iterate over the trials in schedule order
    pub fn trials(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter()
    }
}

/// Build the alternating rule-block schedule.
///
/// The remainder blocks continue the alternation from wherever the base
/// blocks ended, so consecutive blocks never repeat a rule label.
fn rule_schedule(ntrials: usize, nreversals: usize) -> Vec<u8> {
    let nblocks = nreversals + 1;
    let base = ntrials / nblocks;
    let rest = ntrials % nblocks;

    let mut rules = Vec::with_capacity(ntrials);
    let mut label = 0u8;
    for _ in 0..nblocks - rest {
        rules.extend(std::iter::repeat_n(label, base));
        label = 1 - label;
    }
    // `label` already holds the opposite of the last base block.
    for _ in 0..rest {
        rules.extend(std::iter::repeat_n(label, base + 1));
        label = 1 - label;
    }
    rules
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn spec(ntrials: usize, nreversals: usize, reward_probability: f64) -> DesignSpec {
        DesignSpec {
            ntrials,
            nreversals,
            reward_probability,
        }
    }

    #[test]
    fn rule_column_has_exact_length_and_binary_labels() {
        for &(ntrials, nreversals) in &[(480, 1), (480, 12), (80, 3), (7, 2), (100, 7), (11, 4)] {
            let rules = rule_schedule(ntrials, nreversals);
            assert_eq!(rules.len(), ntrials, "{ntrials} trials, {nreversals} reversals");
            assert!(rules.iter().all(|&r| r <= 1));
        }
    }

    #[test]
    fn rule_schedule_has_expected_reversal_count() {
        for &(ntrials, nreversals) in &[(480, 1), (480, 12), (80, 3), (100, 7), (11, 4)] {
            let rules = rule_schedule(ntrials, nreversals);
            let observed = rules.windows(2).filter(|w| w[0] != w[1]).count();
            assert_eq!(
                observed, nreversals,
                "{ntrials} trials should contain {nreversals} reversals, got {observed}"
            );
        }
    }

    #[test]
    fn stimulus_counts_split_half_and_half() {
        let mut rng = StdRng::seed_from_u64(7);
        for &ntrials in &[7usize, 80, 481] {
            let design = TrialDesign::generate(&spec(ntrials, 1, 0.8), &mut rng);
            let ones = design.trials().filter(|t| t.stimulus == 1).count();
            let zeros = design.trials().filter(|t| t.stimulus == 0).count();
            assert_eq!(zeros, ntrials / 2);
            assert_eq!(ones, ntrials.div_ceil(2));
        }
    }

    #[test]
    fn correct_response_follows_rule_invariant() {
        let mut rng = StdRng::seed_from_u64(11);
        let design = TrialDesign::generate(&spec(480, 12, 0.8), &mut rng);
        for trial in design.trials() {
            if trial.rule == 1 {
                assert_eq!(trial.correct_response, trial.stimulus);
            } else {
                assert_eq!(trial.correct_response, 1 - trial.stimulus);
            }
        }
    }

    #[test]
    fn feedback_congruence_count_matches_reward_probability() {
        let mut rng = StdRng::seed_from_u64(13);
        let design = TrialDesign::generate(&spec(480, 1, 0.8), &mut rng);
        let congruent = design.trials().filter(|t| t.feedback_congruent).count();
        assert_eq!(congruent, 384); // round(480 * 0.8)

        let design = TrialDesign::generate(&spec(81, 1, 0.5), &mut rng);
        let congruent = design.trials().filter(|t| t.feedback_congruent).count();
        assert_eq!(congruent, 41); // round(81 * 0.5) rounds up
    }

    #[test]
    fn generation_is_deterministic_under_a_seed() {
        let a = TrialDesign::generate(&spec(120, 3, 0.8), &mut StdRng::seed_from_u64(99));
        let b = TrialDesign::generate(&spec(120, 3, 0.8), &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
