//! Configuration options for the CFR solver.

use serde::{Deserialize, Serialize};

use crate::cfr::shards::UpdateRule;

/// Which member of the CFR family drives the accumulator updates.
///
/// All variants share the same traversal and differ only in the update rule
/// applied to each touched accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CfrVariant {
    /// Plain CFR: raw accumulation, regret may go negative; regret matching
    /// clamps at read time.
    Vanilla,
    /// CFR+: regrets floored at zero immediately after each update. Faster
    /// empirical convergence.
    CfrPlus,
    /// Linear CFR: regret and strategy deltas weighted by the iteration
    /// index, so recent iterations count more.
    Linear,
    /// Discounted CFR with its three exponents.
    Discounted {
        /// Exponent decaying accumulated positive regret.
        alpha: f64,
        /// Exponent decaying accumulated negative regret.
        beta: f64,
        /// Exponent decaying the accumulated strategy.
        gamma: f64,
    },
}

impl CfrVariant {
    /// Discounted CFR with the published default exponents.
    pub fn discounted_default() -> Self {
        CfrVariant::Discounted {
            alpha: 1.5,
            beta: 0.0,
            gamma: 2.0,
        }
    }

    /// The accumulator update rule for iteration `t` (1-based).
    pub(crate) fn update_rule(&self, t: u64) -> UpdateRule {
        let t = t as f64;
        match *self {
            CfrVariant::Vanilla => UpdateRule::additive(),
            CfrVariant::CfrPlus => UpdateRule {
                clamp_negative: true,
                ..UpdateRule::additive()
            },
            CfrVariant::Linear => UpdateRule {
                weight: t,
                ..UpdateRule::additive()
            },
            CfrVariant::Discounted { alpha, beta, gamma } => {
                let ta = t.powf(alpha);
                let tb = t.powf(beta);
                UpdateRule {
                    weight: 1.0,
                    decay_pos: ta / (ta + 1.0),
                    decay_neg: tb / (tb + 1.0),
                    decay_strategy: (t / (t + 1.0)).powf(gamma),
                    clamp_negative: false,
                }
            }
        }
    }
}

/// How an iteration walks the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Traversal {
    /// Enumerate every branch; updates both players per iteration.
    FullTree,
    /// External sampling: sample chance and opponent branches, enumerate the
    /// updated player's actions. Alternates the updated player.
    ExternalSampling,
    /// Outcome sampling: sample a single trajectory, importance-correct the
    /// payoff. Alternates the updated player.
    OutcomeSampling,
    /// Chance sampling: sample only chance branches, enumerate both players.
    ChanceSampling,
}

/// Configuration for a solving session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// CFR variant controlling the update rule.
    pub variant: CfrVariant,
    /// Traversal scheme for each iteration.
    pub traversal: Traversal,
    /// Thread count for the solving pool. `None` uses the rayon default.
    pub threads: Option<usize>,
    /// Seed for the session's random number generators. Monte Carlo
    /// iterations derive a per-iteration generator from this seed and the
    /// iteration index, so no ambient global generator exists.
    pub seed: u64,
    /// Exploration probability mixed into the updated player's sampling
    /// distribution by outcome sampling. Ignored by other traversals.
    pub exploration: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            variant: CfrVariant::CfrPlus,
            traversal: Traversal::FullTree,
            threads: None,
            seed: 0,
            exploration: 0.6,
        }
    }
}

impl SolverConfig {
    /// Default configuration: CFR+ over full-tree traversals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the CFR variant.
    pub fn with_variant(mut self, variant: CfrVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Builder method: set the traversal scheme.
    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Builder method: set the thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Builder method: set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method: set the outcome-sampling exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(ConfigError::InvalidExploration(self.exploration));
        }
        if let CfrVariant::Discounted { alpha, beta, gamma } = self.variant {
            for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
                if !value.is_finite() {
                    return Err(ConfigError::InvalidExponent(name, value));
                }
            }
            if gamma < 0.0 {
                return Err(ConfigError::InvalidExponent("gamma", gamma));
            }
        }
        if self.threads == Some(0) {
            return Err(ConfigError::InvalidThreads);
        }
        Ok(())
    }
}

/// Errors from validating a [`SolverConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Exploration probability outside `[0, 1]`.
    InvalidExploration(f64),
    /// Non-finite or out-of-range discounting exponent.
    InvalidExponent(&'static str, f64),
    /// Thread count of zero.
    InvalidThreads,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidExploration(value) => {
                write!(f, "exploration probability {} is out of range [0, 1]", value)
            }
            ConfigError::InvalidExponent(name, value) => {
                write!(f, "discounting exponent {} = {} is invalid", name, value)
            }
            ConfigError::InvalidThreads => write!(f, "thread count must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Statistics from a training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    /// Total iterations completed.
    pub iterations: u64,
    /// Number of distinct information sets.
    pub info_sets: usize,
    /// Wall-clock training time in seconds.
    pub elapsed_seconds: f64,
    /// Iterations per second.
    pub iterations_per_second: f64,
}

impl SolveStats {
    /// Recompute the iteration rate from the elapsed time.
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = self.iterations as f64 / self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn exploration_out_of_range_is_rejected() {
        let config = SolverConfig::default().with_exploration(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExploration(_))
        ));
    }

    #[test]
    fn linear_rule_weights_by_iteration() {
        let rule = CfrVariant::Linear.update_rule(7);
        assert_eq!(rule.weight, 7.0);
        assert_eq!(rule.decay_pos, 1.0);
    }

    #[test]
    fn discounted_rule_decays_by_sign() {
        let rule = CfrVariant::discounted_default().update_rule(1);
        // alpha = 1.5: 1 / (1 + 1) = 0.5; beta = 0: also 0.5.
        assert!((rule.decay_pos - 0.5).abs() < 1e-12);
        assert!((rule.decay_neg - 0.5).abs() < 1e-12);
        // gamma = 2: (1/2)^2.
        assert!((rule.decay_strategy - 0.25).abs() < 1e-12);
    }
}
