//! Concurrent per-information-set statistics.
//!
//! A [`Shard`] holds the regret and cumulative-strategy accumulators for one
//! information set behind its own mutex, so contention is limited to threads
//! that revisit the same information set simultaneously. The [`ShardTable`]
//! maps tree nodes to shards and is built by a deterministic single-threaded
//! pass before any solving begins: concurrent threads only ever mutate
//! existing fixed-size accumulators, never insert.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::cfr::game::{Action, Game};
use crate::cfr::tree::{GameTree, NodeKind};

/// Sentinel shard index for chance and terminal nodes.
pub const NO_SHARD: u32 = u32::MAX;

/// Per-iteration accumulator update rule, shared by all CFR variants.
///
/// Applied under the shard lock: each existing regret is first scaled by
/// `decay_pos` or `decay_neg` (by sign), the strategy sum by
/// `decay_strategy`, then the weighted deltas are added and, for CFR+,
/// negative regrets are floored at zero.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRule {
    /// Multiplier applied to both incoming deltas.
    pub weight: f64,
    /// Decay applied to existing positive regret before the add.
    pub decay_pos: f64,
    /// Decay applied to existing negative regret before the add.
    pub decay_neg: f64,
    /// Decay applied to the existing strategy sum before the add.
    pub decay_strategy: f64,
    /// Floor regrets at zero after the add (CFR+).
    pub clamp_negative: bool,
}

impl UpdateRule {
    /// Plain accumulation: add raw deltas, no decay, no clamping.
    pub fn additive() -> Self {
        Self {
            weight: 1.0,
            decay_pos: 1.0,
            decay_neg: 1.0,
            decay_strategy: 1.0,
            clamp_negative: false,
        }
    }
}

struct Accumulators {
    regrets: Vec<f64>,
    strategy: Vec<f64>,
}

/// Regret/strategy accumulator for one information set.
///
/// The vectors have exactly as many entries as the information set has legal
/// actions, fixed for the shard's lifetime.
#[repr(align(64))]
pub struct Shard {
    num_actions: usize,
    inner: Mutex<Accumulators>,
}

impl Shard {
    fn new(num_actions: usize) -> Self {
        Self {
            num_actions,
            inner: Mutex::new(Accumulators {
                regrets: vec![0.0; num_actions],
                strategy: vec![0.0; num_actions],
            }),
        }
    }

    /// Number of legal actions at this information set.
    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Derive the current strategy from regrets via regret matching.
    ///
    /// Each action's weight is `max(regret, 0)` normalized over the action
    /// set, falling back to a uniform distribution when no regret is
    /// positive. The regrets are read under the lock into `out`; the caller
    /// recurses with no lock held.
    pub fn current_strategy(&self, out: &mut [f64]) {
        let n = self.num_actions;
        {
            let acc = self.inner.lock().unwrap();
            for i in 0..n {
                out[i] = acc.regrets[i].max(0.0);
            }
        }
        let sum: f64 = out[..n].iter().sum();
        if sum > 0.0 {
            for v in &mut out[..n] {
                *v /= sum;
            }
        } else {
            let p = 1.0 / n as f64;
            for v in &mut out[..n] {
                *v = p;
            }
        }
    }

    /// Apply one read-modify-write update under the shard lock.
    pub fn apply(&self, regret_delta: &[f64], strategy_delta: &[f64], rule: &UpdateRule) {
        let n = self.num_actions;
        let mut acc = self.inner.lock().unwrap();
        for i in 0..n {
            let decay = if acc.regrets[i] > 0.0 { rule.decay_pos } else { rule.decay_neg };
            let mut r = acc.regrets[i] * decay + rule.weight * regret_delta[i];
            if rule.clamp_negative && r < 0.0 {
                r = 0.0;
            }
            acc.regrets[i] = r;
            acc.strategy[i] = acc.strategy[i] * rule.decay_strategy + rule.weight * strategy_delta[i];
        }
    }

    /// Normalize the cumulative strategy sum into `out`, falling back to a
    /// uniform distribution when the sum is zero.
    pub fn average_strategy(&self, out: &mut [f64]) {
        let n = self.num_actions;
        {
            let acc = self.inner.lock().unwrap();
            out[..n].copy_from_slice(&acc.strategy[..n]);
        }
        let sum: f64 = out[..n].iter().sum();
        if sum > 0.0 {
            for v in &mut out[..n] {
                *v /= sum;
            }
        } else {
            let p = 1.0 / n as f64;
            for v in &mut out[..n] {
                *v = p;
            }
        }
    }

    /// Snapshot of the raw (regrets, strategy sums) vectors.
    pub fn snapshot(&self) -> (Vec<f64>, Vec<f64>) {
        let acc = self.inner.lock().unwrap();
        (acc.regrets.clone(), acc.strategy.clone())
    }
}

/// The statistics store: one shard per distinct information set, plus the
/// node-to-shard index.
///
/// Construction walks the compiled tree once, in node order, creating each
/// shard when its information set is first seen. The same pass verifies the
/// game-contract invariant that every node of an information set exposes the
/// identical ordered action list.
pub struct ShardTable<G: Game> {
    shards: Vec<Shard>,
    node_to_shard: Vec<u32>,
    index: FxHashMap<G::InfoSet, u32>,
}

impl<G: Game> ShardTable<G> {
    /// Build the store from a compiled tree.
    ///
    /// # Panics
    ///
    /// Panics if two tree nodes sharing an information set disagree on their
    /// action count or action labels — a game-contract violation that must
    /// surface immediately rather than corrupt solving.
    pub fn new(tree: &GameTree<G>) -> Self {
        let mut shards: Vec<Shard> = Vec::new();
        let mut node_to_shard = vec![NO_SHARD; tree.num_nodes()];
        let mut index: FxHashMap<G::InfoSet, u32> = FxHashMap::default();
        let mut first_node: Vec<u32> = Vec::new();

        for idx in 0..tree.num_nodes() as u32 {
            let node = tree.node(idx);
            let NodeKind::Decision(_) = node.kind else { continue };
            let info_set = tree
                .info_set_of(idx)
                .expect("decision node without an information set");
            let shard_idx = *index.entry(info_set.clone()).or_insert_with(|| {
                shards.push(Shard::new(node.num_children as usize));
                first_node.push(idx);
                (shards.len() - 1) as u32
            });
            let canonical = tree.node(first_node[shard_idx as usize]);
            assert_eq!(
                node.num_children,
                canonical.num_children,
                "info set {:?} reached with differing action counts",
                info_set
            );
            assert_eq!(
                tree.actions_of(node)
                    .iter()
                    .map(Action::label)
                    .collect::<Vec<_>>(),
                tree.actions_of(canonical)
                    .iter()
                    .map(Action::label)
                    .collect::<Vec<_>>(),
                "info set {:?} reached with differing action labels",
                info_set
            );
            node_to_shard[idx as usize] = shard_idx;
        }

        shards.shrink_to_fit();
        Self {
            shards,
            node_to_shard,
            index,
        }
    }

    /// Shard of the decision node at `idx`.
    pub fn shard_for_node(&self, idx: u32) -> &Shard {
        &self.shards[self.node_to_shard[idx as usize] as usize]
    }

    /// Shard for `info_set`, if it occurs in the tree.
    pub fn get(&self, info_set: &G::InfoSet) -> Option<&Shard> {
        self.index
            .get(info_set)
            .map(|&idx| &self.shards[idx as usize])
    }

    /// Number of distinct information sets.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::kuhn::Kuhn;
    use std::sync::Arc;

    #[test]
    fn regret_matching_prefers_positive_regret() {
        let shard = Shard::new(3);
        shard.apply(&[3.0, -1.0, 0.0], &[0.0; 3], &UpdateRule::additive());

        let mut strategy = [0.0; 3];
        shard.current_strategy(&mut strategy);
        assert_eq!(strategy, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn regret_matching_falls_back_to_uniform() {
        let shard = Shard::new(3);
        shard.apply(&[0.0, -2.0, -5.0], &[0.0; 3], &UpdateRule::additive());

        let mut strategy = [0.0; 3];
        shard.current_strategy(&mut strategy);
        for p in strategy {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn clamp_floors_negative_regret() {
        let shard = Shard::new(2);
        let rule = UpdateRule {
            clamp_negative: true,
            ..UpdateRule::additive()
        };
        shard.apply(&[-4.0, 2.0], &[0.0; 2], &rule);

        let (regrets, _) = shard.snapshot();
        assert_eq!(regrets, vec![0.0, 2.0]);
    }

    #[test]
    fn one_shard_per_info_set() {
        let tree = crate::cfr::tree::GameTree::compile(&mut Kuhn::new()).unwrap();
        let table = ShardTable::new(&tree);
        assert_eq!(table.len(), tree.num_info_sets());

        // All nodes of one info set resolve to the same shard.
        for idx in 0..tree.num_nodes() as u32 {
            let Some(info_set) = tree.info_set_of(idx) else { continue };
            let via_node = table.shard_for_node(idx) as *const Shard;
            let via_key = table.get(info_set).unwrap() as *const Shard;
            assert_eq!(via_node, via_key);
        }
    }

    #[test]
    fn contended_updates_are_not_lost() {
        let shard = Arc::new(Shard::new(2));
        let threads = 8;
        let per_thread = 10_000;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let shard = Arc::clone(&shard);
                std::thread::spawn(move || {
                    for _ in 0..per_thread {
                        shard.apply(&[1.0, -1.0], &[0.5, 0.5], &UpdateRule::additive());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = (threads * per_thread) as f64;
        let (regrets, strategy) = shard.snapshot();
        assert!((regrets[0] - total).abs() < 1e-6);
        assert!((regrets[1] + total).abs() < 1e-6);
        assert!((strategy[0] - 0.5 * total).abs() < 1e-6);
        assert!((strategy[1] - 0.5 * total).abs() < 1e-6);
    }
}
