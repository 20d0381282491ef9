//! Best response and exploitability.
//!
//! A best response answers: against this frozen strategy, how much can an
//! optimal counter-strategy extract? The responder's policy must be a single
//! function of its own information set even though the tree holds many
//! underlying states per information set, so the evaluator collapses member
//! states, weighting each by its chance reach and by the probability of the
//! opponent's committed actions on the path to it. Exploitability — the mean
//! gap over both players between the best-response value and the self-play
//! value — is the convergence proxy the tests drive toward zero.

use rustc_hash::FxHashMap;

use crate::cfr::game::{Game, Player};
use crate::cfr::strategy::{Strategy, StrategyEntry};
use crate::cfr::tree::{GameTree, NodeKind, ROOT};

/// Per-game support the best-response evaluator needs.
///
/// Both methods describe the path to an underlying state, which only the
/// game can reconstruct. They are pure functions of the state and are easy
/// to get subtly wrong for multi-street games, so each game tests them
/// separately.
pub trait BestResponseGame: Game {
    /// Product of the normalized chance probabilities on the path to
    /// `state`.
    fn chance_reach(&self, state: &Self::State) -> f64;

    /// The (information set, action) pairs `player` committed to on the
    /// path to `state`, in path order.
    fn path_commitments(
        &self,
        state: &Self::State,
        player: Player,
    ) -> Vec<(Self::InfoSet, Self::Action)>;
}

/// A computed best response: the one-hot counter-strategy and its value
/// from the responder's perspective.
pub struct BestResponse<G: Game> {
    /// One-hot strategy over the responder's information sets.
    pub strategy: Strategy<G>,
    /// Root value achieved against the frozen opponent.
    pub value: f64,
}

/// Expected root value when both players follow `strategy`, from `player`'s
/// perspective.
///
/// # Panics
///
/// Panics if `strategy` does not cover every decision information set.
pub fn expected_value<G: Game>(
    tree: &GameTree<G>,
    strategy: &Strategy<G>,
    player: Player,
) -> f64 {
    fn walk<G: Game>(tree: &GameTree<G>, strategy: &Strategy<G>, idx: u32) -> f64 {
        let node = tree.node(idx);
        match node.kind {
            NodeKind::Terminal(payoff) => payoff,
            NodeKind::Chance => {
                let children = tree.children_of(node);
                let probs = tree.probs_of(node);
                children
                    .iter()
                    .zip(probs.iter())
                    .map(|(&child, &p)| p * walk(tree, strategy, child))
                    .sum()
            }
            NodeKind::Decision(_) => {
                let info_set = tree
                    .info_set_of(idx)
                    .expect("decision node without an information set");
                let probs = strategy
                    .probs(info_set)
                    .expect("strategy missing an information set");
                tree.children_of(node)
                    .iter()
                    .zip(probs.iter())
                    .map(|(&child, &p)| p * walk(tree, strategy, child))
                    .sum()
            }
        }
    }
    walk(tree, strategy, ROOT) * player.sign()
}

/// Compute the best response for `responder` against `frozen`.
///
/// Traverses the tree with memoization keyed by the responder's information
/// set: on first reach, every (node, state) member of the information set is
/// weighted by `chance_reach` times the frozen opponent's committed action
/// probabilities, per-action values are summed across members, and the
/// argmax action becomes the responder's one-hot choice.
pub fn best_response<G: BestResponseGame>(
    game: &G,
    tree: &GameTree<G>,
    frozen: &Strategy<G>,
    responder: Player,
) -> BestResponse<G> {
    let mut values: FxHashMap<G::InfoSet, f64> = FxHashMap::default();
    let mut strategy = Strategy::empty();
    let value = walk(game, tree, frozen, responder, ROOT, &mut values, &mut strategy);
    BestResponse { strategy, value }
}

fn walk<G: BestResponseGame>(
    game: &G,
    tree: &GameTree<G>,
    frozen: &Strategy<G>,
    responder: Player,
    idx: u32,
    values: &mut FxHashMap<G::InfoSet, f64>,
    out: &mut Strategy<G>,
) -> f64 {
    let node = tree.node(idx);
    match node.kind {
        NodeKind::Terminal(payoff) => payoff * responder.sign(),
        NodeKind::Chance => {
            let children = tree.children_of(node);
            let probs = tree.probs_of(node);
            let mut value = 0.0;
            for (&child, &p) in children.iter().zip(probs.iter()) {
                value += p * walk(game, tree, frozen, responder, child, values, out);
            }
            value
        }
        NodeKind::Decision(player) if player != responder => {
            let info_set = tree
                .info_set_of(idx)
                .expect("decision node without an information set");
            let probs = frozen
                .probs(info_set)
                .expect("frozen strategy missing an information set");
            let children = tree.children_of(node);
            let mut value = 0.0;
            for (&child, &p) in children.iter().zip(probs.iter()) {
                value += p * walk(game, tree, frozen, responder, child, values, out);
            }
            value
        }
        NodeKind::Decision(_) => {
            let info_set = tree
                .info_set_of(idx)
                .expect("decision node without an information set")
                .clone();
            if let Some(&value) = values.get(&info_set) {
                return value;
            }
            let n = node.num_children as usize;
            let members = tree
                .members_of(&info_set)
                .expect("information set without member states");

            let mut utils = vec![0.0; n];
            let mut weight_sum = 0.0;
            for (member_idx, state) in members {
                let mut weight = game.chance_reach(state);
                for (opp_set, opp_action) in game.path_commitments(state, responder.opponent()) {
                    weight *= frozen
                        .action_prob(&opp_set, opp_action)
                        .expect("frozen strategy missing an information set");
                }
                weight_sum += weight;
                let member_children = tree.children_of(tree.node(*member_idx));
                for (i, util) in utils.iter_mut().enumerate() {
                    *util += weight
                        * walk(game, tree, frozen, responder, member_children[i], values, out);
                }
            }

            let mut best = 0;
            for i in 1..n {
                if utils[i] > utils[best] {
                    best = i;
                }
            }
            let mut probs = vec![0.0; n];
            probs[best] = 1.0;
            out.insert_entry(
                info_set.clone(),
                StrategyEntry {
                    actions: tree.actions_of(node).to_vec(),
                    probs,
                },
            );

            let value = if weight_sum == 0.0 {
                0.0
            } else {
                utils[best] / weight_sum
            };
            values.insert(info_set, value);
            value
        }
    }
}

/// Exploitability of `strategy`: the mean over both players of the gap
/// between their best-response value and their self-play value. Zero at a
/// Nash equilibrium.
pub fn exploitability<G: BestResponseGame>(
    game: &G,
    tree: &GameTree<G>,
    strategy: &Strategy<G>,
) -> f64 {
    let mut total = 0.0;
    for player in [Player::Player1, Player::Player2] {
        let br = best_response(game, tree, strategy, player);
        let self_play = expected_value(tree, strategy, player);
        total += br.value - self_play;
    }
    total / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::kuhn::Kuhn;

    #[test]
    fn best_response_never_loses_to_self_play() {
        let mut game = Kuhn::new();
        let tree = GameTree::compile(&mut game).unwrap();
        let uniform = Strategy::uniform(&tree);

        for player in [Player::Player1, Player::Player2] {
            let br = best_response(&game, &tree, &uniform, player);
            let self_play = expected_value(&tree, &uniform, player);
            assert!(
                br.value >= self_play - 1e-9,
                "best response {} below self-play {}",
                br.value,
                self_play
            );
        }
    }

    #[test]
    fn uniform_strategy_is_exploitable() {
        let mut game = Kuhn::new();
        let tree = GameTree::compile(&mut game).unwrap();
        let uniform = Strategy::uniform(&tree);
        let gap = exploitability(&game, &tree, &uniform);
        assert!(gap > 0.05, "uniform exploitability {} suspiciously low", gap);
    }

    #[test]
    fn best_response_strategy_is_one_hot() {
        let mut game = Kuhn::new();
        let tree = GameTree::compile(&mut game).unwrap();
        let uniform = Strategy::uniform(&tree);
        let br = best_response(&game, &tree, &uniform, Player::Player2);

        assert!(!br.strategy.is_empty());
        for (_, entry) in br.strategy.iter() {
            let ones = entry.probs.iter().filter(|&&p| p == 1.0).count();
            let zeros = entry.probs.iter().filter(|&&p| p == 0.0).count();
            assert_eq!(ones, 1);
            assert_eq!(zeros, entry.probs.len() - 1);
        }
    }

    #[test]
    fn uniform_self_play_value_is_exact() {
        // Direct enumeration of Kuhn under uniform play gives +1/8 for
        // Player 1.
        let tree = GameTree::compile(&mut Kuhn::new()).unwrap();
        let uniform = Strategy::uniform(&tree);
        let value = expected_value(&tree, &uniform, Player::Player1);
        assert!((value - 0.125).abs() < 1e-9, "uniform value {}", value);
    }
}
