//! Average-strategy extraction and export.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cfr::game::{Action, Game, InfoSet, MAX_ACTIONS};
use crate::cfr::shards::ShardTable;
use crate::cfr::tree::{GameTree, NodeKind};

/// Probability vector and action labels for one information set.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyEntry<A> {
    /// Ordered legal actions of the information set.
    pub actions: Vec<A>,
    /// Probability per action; non-negative, summing to one.
    pub probs: Vec<f64>,
}

/// A read-only strategy: one probability vector per information set.
///
/// Built once — by [`Strategy::extract`] after solving, by
/// [`Strategy::uniform`] as a baseline, or as a one-hot best response — and
/// immutable thereafter.
pub struct Strategy<G: Game> {
    entries: FxHashMap<G::InfoSet, StrategyEntry<G::Action>>,
}

/// One exported (information set, action, probability) triple.
///
/// The export is loss-tolerant presentation output, not a resumable
/// checkpoint: the accumulators remain the authoritative solver state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRow {
    /// Information-set key.
    pub info_set: String,
    /// Action label.
    pub action: String,
    /// Probability of taking `action` at `info_set`.
    pub probability: f64,
}

impl<G: Game> Strategy<G> {
    /// Extract the average strategy from accumulated strategy weights.
    ///
    /// Walks the tree once in node order and emits each information set
    /// exactly once, regardless of how many nodes share it, normalizing the
    /// shard's cumulative weights with a uniform fallback on zero mass.
    /// Calling this twice on the same solver state yields identical output.
    pub fn extract(tree: &GameTree<G>, shards: &ShardTable<G>) -> Self {
        let mut entries = FxHashMap::default();
        for idx in 0..tree.num_nodes() as u32 {
            let node = tree.node(idx);
            let NodeKind::Decision(_) = node.kind else { continue };
            let info_set = tree
                .info_set_of(idx)
                .expect("decision node without an information set");
            if entries.contains_key(info_set) {
                continue;
            }
            let n = node.num_children as usize;
            let mut probs = [0.0; MAX_ACTIONS];
            shards.shard_for_node(idx).average_strategy(&mut probs);
            entries.insert(
                info_set.clone(),
                StrategyEntry {
                    actions: tree.actions_of(node).to_vec(),
                    probs: probs[..n].to_vec(),
                },
            );
        }
        Self { entries }
    }

    /// The uniform strategy over every information set in the tree.
    pub fn uniform(tree: &GameTree<G>) -> Self {
        let mut entries = FxHashMap::default();
        for idx in 0..tree.num_nodes() as u32 {
            let node = tree.node(idx);
            let NodeKind::Decision(_) = node.kind else { continue };
            let info_set = tree
                .info_set_of(idx)
                .expect("decision node without an information set");
            if entries.contains_key(info_set) {
                continue;
            }
            let n = node.num_children as usize;
            entries.insert(
                info_set.clone(),
                StrategyEntry {
                    actions: tree.actions_of(node).to_vec(),
                    probs: vec![1.0 / n as f64; n],
                },
            );
        }
        Self { entries }
    }

    pub(crate) fn empty() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub(crate) fn insert_entry(
        &mut self,
        info_set: G::InfoSet,
        entry: StrategyEntry<G::Action>,
    ) {
        self.entries.insert(info_set, entry);
    }

    /// Action probabilities for `info_set`.
    pub fn probs(&self, info_set: &G::InfoSet) -> Option<&[f64]> {
        self.entries.get(info_set).map(|e| e.probs.as_slice())
    }

    /// Full entry (actions and probabilities) for `info_set`.
    pub fn entry(&self, info_set: &G::InfoSet) -> Option<&StrategyEntry<G::Action>> {
        self.entries.get(info_set)
    }

    /// Probability of `action` at `info_set`.
    ///
    /// # Panics
    ///
    /// Panics if the action is not legal at the information set — a
    /// game-contract violation.
    pub fn action_prob(&self, info_set: &G::InfoSet, action: G::Action) -> Option<f64> {
        self.entries.get(info_set).map(|entry| {
            let i = entry
                .actions
                .iter()
                .position(|&a| a == action)
                .expect("action not legal at this information set");
            entry.probs[i]
        })
    }

    /// Action probabilities looked up by the info-set string key.
    pub fn probs_by_key(&self, key: &str) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(info_set, _)| info_set.key() == key)
            .map(|(_, entry)| entry.probs.as_slice())
    }

    /// Number of information sets covered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the strategy covers no information sets.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all (information set, entry) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&G::InfoSet, &StrategyEntry<G::Action>)> {
        self.entries.iter()
    }

    /// Flatten into exportable triples, sorted by info-set key then action
    /// order for stable output.
    pub fn export(&self) -> Vec<StrategyRow> {
        let mut rows: Vec<StrategyRow> = Vec::new();
        let mut keyed: Vec<(&G::InfoSet, &StrategyEntry<G::Action>)> = self.entries.iter().collect();
        keyed.sort_by_key(|(info_set, _)| info_set.key());
        for (info_set, entry) in keyed {
            for (action, prob) in entry.actions.iter().zip(entry.probs.iter()) {
                rows.push(StrategyRow {
                    info_set: info_set.key(),
                    action: action.label(),
                    probability: *prob,
                });
            }
        }
        rows
    }
}
