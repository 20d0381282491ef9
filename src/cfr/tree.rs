//! Game tree compilation.
//!
//! A [`GameTree`] is built once per solving session by exhaustively walking a
//! [`Game`] and flattening every reachable state into index-addressed arrays.
//! After compilation nothing is mutated, so the tree can be shared read-only
//! across all solver threads without synchronization.

use rustc_hash::FxHashMap;

use crate::cfr::game::{Game, PlayGuard, Player, MAX_ACTIONS};

/// Index of the root node in every compiled tree.
pub const ROOT: u32 = 0;

/// What a compiled node is: a decision point, a chance event, or a leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// A decision node for `Player1` or `Player2` (never `Chance`).
    Decision(Player),
    /// A chance node, resolved by pre-normalized probabilities.
    Chance,
    /// A leaf carrying the payoff from Player1's perspective.
    Terminal(f64),
}

/// One compiled tree node. Immutable after construction.
///
/// `children_start` indexes into [`GameTree::children`]; for chance nodes,
/// `probs_start` indexes a probability slice of the same length in
/// [`GameTree::chance_probs`]; `actions_start` indexes the co-ordered action
/// labels. Terminal nodes have no children and carry their payoff in `kind`.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    /// Node classification, including the terminal payoff.
    pub kind: NodeKind,
    /// Number of children (and actions) at this node.
    pub num_children: u32,
    /// Offset of this node's child indices.
    pub children_start: u32,
    /// Offset of this node's action labels.
    pub actions_start: u32,
    /// Offset of this node's normalized chance probabilities (chance only).
    pub probs_start: u32,
}

/// Limits enforced during compilation.
///
/// An infinite or overly large game must fail fast with a [`TreeError`]
/// before any solving starts, rather than overflow indices silently.
#[derive(Debug, Clone, Copy)]
pub struct TreeLimits {
    /// Maximum number of tree nodes.
    pub max_nodes: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self { max_nodes: 1 << 26 }
    }
}

/// Errors reported by the tree compiler.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// The reachable state space exceeds `max_nodes`.
    NodeLimitExceeded(usize),
    /// An action list is longer than [`MAX_ACTIONS`].
    TooManyActions {
        /// Number of actions the game produced.
        found: usize,
    },
    /// A non-terminal node produced no legal actions.
    EmptyActionList,
    /// Chance weights were negative, the wrong length, or summed to zero.
    InvalidChanceWeights {
        /// Number of actions at the offending chance node.
        actions: usize,
        /// Number of weights the game produced.
        weights: usize,
    },
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::NodeLimitExceeded(limit) => {
                write!(f, "game tree exceeds the {} node limit", limit)
            }
            TreeError::TooManyActions { found } => {
                write!(f, "{} actions at one node exceeds the maximum of {}", found, MAX_ACTIONS)
            }
            TreeError::EmptyActionList => {
                write!(f, "non-terminal node with no legal actions")
            }
            TreeError::InvalidChanceWeights { actions, weights } => {
                write!(
                    f,
                    "chance node with {} actions has invalid weights ({} entries)",
                    actions, weights
                )
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// Compiled, immutable game tree.
///
/// Distinct states are distinct nodes even when they share an information
/// set; sharing happens only at the statistics layer. The tree additionally
/// records, per information set, the decision nodes and underlying states
/// collapsed into it — the index the best-response evaluator needs.
pub struct GameTree<G: Game> {
    nodes: Vec<Node>,
    children: Vec<u32>,
    chance_probs: Vec<f64>,
    actions: Vec<G::Action>,
    info_sets: Vec<Option<G::InfoSet>>,
    members: FxHashMap<G::InfoSet, Vec<(u32, G::State)>>,
}

impl<G: Game> GameTree<G> {
    /// Compile `game` with default limits.
    pub fn compile(game: &mut G) -> Result<Self, TreeError> {
        Self::compile_with_limits(game, TreeLimits::default())
    }

    /// Compile `game`, failing fast if `limits` are exceeded.
    ///
    /// Performs one exhaustive depth-first enumeration from the reset state,
    /// visiting every reachable state exactly once via `play`/`undo` pairs.
    pub fn compile_with_limits(game: &mut G, limits: TreeLimits) -> Result<Self, TreeError> {
        game.reset();
        let mut tree = Self {
            nodes: Vec::new(),
            children: Vec::new(),
            chance_probs: Vec::new(),
            actions: Vec::new(),
            info_sets: Vec::new(),
            members: FxHashMap::default(),
        };
        tree.build(game, limits)?;
        tree.nodes.shrink_to_fit();
        tree.children.shrink_to_fit();
        tree.chance_probs.shrink_to_fit();
        tree.actions.shrink_to_fit();
        tree.info_sets.shrink_to_fit();
        Ok(tree)
    }

    fn build(&mut self, game: &mut G, limits: TreeLimits) -> Result<u32, TreeError> {
        if self.nodes.len() >= limits.max_nodes {
            return Err(TreeError::NodeLimitExceeded(limits.max_nodes));
        }
        let idx = self.nodes.len() as u32;

        if game.is_terminal() {
            let payoff = game.payoff(Player::Player1);
            debug_assert!(
                (payoff + game.payoff(Player::Player2)).abs() < 1e-9,
                "payoffs are not zero-sum at a terminal state"
            );
            self.nodes.push(Node {
                kind: NodeKind::Terminal(payoff),
                num_children: 0,
                children_start: self.children.len() as u32,
                actions_start: self.actions.len() as u32,
                probs_start: 0,
            });
            self.info_sets.push(None);
            return Ok(idx);
        }

        let player = game.current_player();
        let actions = game.legal_actions();
        let n = actions.len();
        if n == 0 {
            return Err(TreeError::EmptyActionList);
        }
        if n > MAX_ACTIONS {
            return Err(TreeError::TooManyActions { found: n });
        }

        let children_start = self.children.len() as u32;
        let actions_start = self.actions.len() as u32;
        let mut probs_start = 0;

        let kind = match player {
            Player::Chance => {
                let weights = game.chance_weights();
                let total: f64 = weights.iter().sum();
                if weights.len() != n || weights.iter().any(|&w| w < 0.0) || total <= 0.0 {
                    return Err(TreeError::InvalidChanceWeights {
                        actions: n,
                        weights: weights.len(),
                    });
                }
                probs_start = self.chance_probs.len() as u32;
                self.chance_probs.extend(weights.iter().map(|w| w / total));
                NodeKind::Chance
            }
            _ => NodeKind::Decision(player),
        };

        self.nodes.push(Node {
            kind,
            num_children: n as u32,
            children_start,
            actions_start,
            probs_start,
        });
        self.actions.extend(actions.iter().copied());
        self.children.extend(std::iter::repeat(0).take(n));
        if let NodeKind::Decision(_) = kind {
            let info_set = game.info_set(player);
            self.members
                .entry(info_set.clone())
                .or_default()
                .push((idx, game.state()));
            self.info_sets.push(Some(info_set));
        } else {
            self.info_sets.push(None);
        }

        for (i, &action) in actions.iter().enumerate() {
            let mut played = PlayGuard::new(game, action);
            let child = self.build(&mut played, limits)?;
            self.children[children_start as usize + i] = child;
        }
        Ok(idx)
    }

    /// Number of nodes in the tree.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Node at `idx`.
    pub fn node(&self, idx: u32) -> &Node {
        &self.nodes[idx as usize]
    }

    /// All nodes, in compilation (depth-first discovery) order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Child indices of `node`.
    pub fn children_of(&self, node: &Node) -> &[u32] {
        let start = node.children_start as usize;
        &self.children[start..start + node.num_children as usize]
    }

    /// Normalized outcome probabilities of a chance `node`, co-indexed with
    /// its children.
    pub fn probs_of(&self, node: &Node) -> &[f64] {
        debug_assert!(matches!(node.kind, NodeKind::Chance));
        let start = node.probs_start as usize;
        &self.chance_probs[start..start + node.num_children as usize]
    }

    /// Ordered action labels of `node`.
    pub fn actions_of(&self, node: &Node) -> &[G::Action] {
        let start = node.actions_start as usize;
        &self.actions[start..start + node.num_children as usize]
    }

    /// Information set of the decision node at `idx`, if it is one.
    pub fn info_set_of(&self, idx: u32) -> Option<&G::InfoSet> {
        self.info_sets[idx as usize].as_ref()
    }

    /// All (node index, underlying state) pairs collapsed into `info_set`,
    /// in discovery order.
    pub fn members_of(&self, info_set: &G::InfoSet) -> Option<&[(u32, G::State)]> {
        self.members.get(info_set).map(|v| v.as_slice())
    }

    /// Number of distinct information sets across all decision nodes.
    pub fn num_info_sets(&self) -> usize {
        self.members.len()
    }
}
