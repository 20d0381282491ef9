//! Monte Carlo CFR traversals.
//!
//! These walk the same compiled tree and shard table as the full-tree
//! variants but sample rather than enumerate at some nodes, trading
//! traversal cost for variance:
//!
//! - **External sampling** samples chance and opponent branches; the updated
//!   player still explores every action and updates exactly as in the
//!   full-tree walk.
//! - **Outcome sampling** samples a single trajectory; the sampled payoff is
//!   importance-corrected by the probability of having drawn that trajectory
//!   and only the sampled action's accumulator entries are touched.
//! - **Chance sampling** samples only chance branches and enumerates both
//!   players' decisions.
//!
//! Every sampling distribution is paired with its matching correction weight
//! so the expected instantaneous regret equals the full-traversal quantity.

use rand::Rng;

use crate::cfr::game::{Game, Player, MAX_ACTIONS};
use crate::cfr::shards::UpdateRule;
use crate::cfr::solver::CfrSolver;
use crate::cfr::strategy::Strategy;
use crate::cfr::tree::{GameTree, NodeKind, ROOT};

/// Draw an index from the distribution `probs`.
fn sample_index<R: Rng>(rng: &mut R, probs: &[f64]) -> usize {
    let r: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    probs.len() - 1
}

impl<G: Game> CfrSolver<'_, G> {
    /// External-sampling traversal; the return value is the node value from
    /// `update_player`'s perspective.
    pub(crate) fn external_iteration<R: Rng>(
        &self,
        idx: u32,
        update_player: Player,
        pi_update: f64,
        pi_opp: f64,
        rule: &UpdateRule,
        rng: &mut R,
    ) -> f64 {
        let node = self.tree.node(idx);
        match node.kind {
            NodeKind::Terminal(payoff) => payoff * update_player.sign(),
            NodeKind::Chance => {
                let probs = self.tree.probs_of(node);
                let i = sample_index(rng, probs);
                let child = self.tree.children_of(node)[i];
                self.external_iteration(child, update_player, pi_update, pi_opp, rule, rng)
            }
            NodeKind::Decision(player) => {
                let n = node.num_children as usize;
                let shard = self.shards.shard_for_node(idx);
                let mut strategy = [0.0; MAX_ACTIONS];
                shard.current_strategy(&mut strategy);
                let children = self.tree.children_of(node);

                if player == update_player {
                    let mut utils = [0.0; MAX_ACTIONS];
                    let mut value = 0.0;
                    for i in 0..n {
                        utils[i] = self.external_iteration(
                            children[i],
                            update_player,
                            pi_update * strategy[i],
                            pi_opp,
                            rule,
                            rng,
                        );
                        value += strategy[i] * utils[i];
                    }
                    let mut regret_delta = [0.0; MAX_ACTIONS];
                    let mut strategy_delta = [0.0; MAX_ACTIONS];
                    for i in 0..n {
                        regret_delta[i] = pi_opp * (utils[i] - value);
                        strategy_delta[i] = pi_update * strategy[i];
                    }
                    shard.apply(&regret_delta[..n], &strategy_delta[..n], rule);
                    value
                } else {
                    let i = sample_index(rng, &strategy[..n]);
                    self.external_iteration(
                        children[i],
                        update_player,
                        pi_update,
                        pi_opp * strategy[i],
                        rule,
                        rng,
                    )
                }
            }
        }
    }

    /// Outcome-sampling traversal.
    ///
    /// Returns `(utility, corrected)` from `update_player`'s perspective:
    /// the raw sampled payoff, and the payoff divided by the probability of
    /// the sampled trajectory. The corrected value feeds the sampled
    /// action's regret entry; the raw value is an on-policy estimate of the
    /// node value.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn outcome_iteration<R: Rng>(
        &self,
        idx: u32,
        update_player: Player,
        pi_update: f64,
        pi_opp: f64,
        sample_prob: f64,
        rule: &UpdateRule,
        rng: &mut R,
    ) -> (f64, f64) {
        let node = self.tree.node(idx);
        match node.kind {
            NodeKind::Terminal(payoff) => {
                let utility = payoff * update_player.sign();
                (utility, utility / sample_prob)
            }
            NodeKind::Chance => {
                let probs = self.tree.probs_of(node);
                let i = sample_index(rng, probs);
                let child = self.tree.children_of(node)[i];
                self.outcome_iteration(
                    child,
                    update_player,
                    pi_update,
                    pi_opp,
                    sample_prob * probs[i],
                    rule,
                    rng,
                )
            }
            NodeKind::Decision(player) => {
                let n = node.num_children as usize;
                let shard = self.shards.shard_for_node(idx);
                let mut strategy = [0.0; MAX_ACTIONS];
                shard.current_strategy(&mut strategy);
                let children = self.tree.children_of(node);

                if player == update_player {
                    // Sample from an exploration mix so every action keeps a
                    // nonzero sampling probability; the correction below
                    // uses the mixed probability actually sampled from.
                    let eps = self.config.exploration;
                    let mut mixed = [0.0; MAX_ACTIONS];
                    for i in 0..n {
                        mixed[i] = (1.0 - eps) * strategy[i] + eps / n as f64;
                    }
                    let i = sample_index(rng, &mixed[..n]);
                    let (utility, corrected) = self.outcome_iteration(
                        children[i],
                        update_player,
                        pi_update * strategy[i],
                        pi_opp,
                        sample_prob * mixed[i],
                        rule,
                        rng,
                    );
                    let mut regret_delta = [0.0; MAX_ACTIONS];
                    let mut strategy_delta = [0.0; MAX_ACTIONS];
                    regret_delta[i] = pi_opp * corrected;
                    strategy_delta[i] = pi_update;
                    shard.apply(&regret_delta[..n], &strategy_delta[..n], rule);
                    (utility, corrected)
                } else {
                    let i = sample_index(rng, &strategy[..n]);
                    self.outcome_iteration(
                        children[i],
                        update_player,
                        pi_update,
                        pi_opp * strategy[i],
                        sample_prob * strategy[i],
                        rule,
                        rng,
                    )
                }
            }
        }
    }

    /// Chance-sampling traversal: chance nodes draw one outcome, both
    /// players' decisions are fully enumerated and updated as in the
    /// full-tree walk. Values from Player1's perspective.
    pub(crate) fn chance_iteration<R: Rng>(
        &self,
        idx: u32,
        pi1: f64,
        pi2: f64,
        rule: &UpdateRule,
        rng: &mut R,
    ) -> f64 {
        let node = self.tree.node(idx);
        match node.kind {
            NodeKind::Terminal(payoff) => payoff,
            NodeKind::Chance => {
                let probs = self.tree.probs_of(node);
                let i = sample_index(rng, probs);
                let child = self.tree.children_of(node)[i];
                self.chance_iteration(child, pi1, pi2, rule, rng)
            }
            NodeKind::Decision(player) => {
                let n = node.num_children as usize;
                let shard = self.shards.shard_for_node(idx);
                let mut strategy = [0.0; MAX_ACTIONS];
                shard.current_strategy(&mut strategy);
                let children = self.tree.children_of(node);

                let mut utils = [0.0; MAX_ACTIONS];
                let mut value = 0.0;
                for i in 0..n {
                    utils[i] = match player {
                        Player::Player1 => {
                            self.chance_iteration(children[i], strategy[i] * pi1, pi2, rule, rng)
                        }
                        _ => self.chance_iteration(children[i], pi1, strategy[i] * pi2, rule, rng),
                    };
                    value += strategy[i] * utils[i];
                }

                let mut regret_delta = [0.0; MAX_ACTIONS];
                let mut strategy_delta = [0.0; MAX_ACTIONS];
                match player {
                    Player::Player1 => {
                        for i in 0..n {
                            regret_delta[i] = pi2 * (utils[i] - value);
                            strategy_delta[i] = pi1 * strategy[i];
                        }
                    }
                    _ => {
                        for i in 0..n {
                            regret_delta[i] = pi1 * (value - utils[i]);
                            strategy_delta[i] = pi2 * strategy[i];
                        }
                    }
                }
                shard.apply(&regret_delta[..n], &strategy_delta[..n], rule);
                value
            }
        }
    }
}

/// One on-policy playout under a frozen strategy.
///
/// Chance nodes draw from their compiled probabilities and decision nodes
/// from `strategy`; the terminal payoff (Player1 perspective) is returned
/// uncorrected. Averaged over many draws this converges to
/// [`expected_value`](crate::cfr::best_response::expected_value) for the
/// same strategy, which is the unbiasedness hook the tests rely on.
pub fn sampled_value<G: Game, R: Rng>(
    tree: &GameTree<G>,
    strategy: &Strategy<G>,
    rng: &mut R,
) -> f64 {
    let mut idx = ROOT;
    loop {
        let node = tree.node(idx);
        match node.kind {
            NodeKind::Terminal(payoff) => return payoff,
            NodeKind::Chance => {
                let i = sample_index(rng, tree.probs_of(node));
                idx = tree.children_of(node)[i];
            }
            NodeKind::Decision(_) => {
                let info_set = tree
                    .info_set_of(idx)
                    .expect("decision node without an information set");
                let probs = strategy
                    .probs(info_set)
                    .expect("strategy missing an information set");
                let i = sample_index(rng, probs);
                idx = tree.children_of(node)[i];
            }
        }
    }
}
