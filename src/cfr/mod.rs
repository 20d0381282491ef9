//! Counterfactual Regret Minimization solver core.
//!
//! This module computes approximate Nash equilibria of two-player zero-sum
//! extensive-form games with imperfect information. The pipeline:
//!
//! 1. A game implements the [`Game`] trait (`play`/`undo`, payoffs, chance
//!    weights, information sets).
//! 2. [`GameTree::compile`] flattens every reachable state into immutable,
//!    index-addressed arrays.
//! 3. [`CfrSolver`] runs regret-matching iterations over the tree — full
//!    enumeration or Monte Carlo sampling — accumulating statistics in one
//!    lock-guarded [`Shard`](shards::Shard) per information set, so
//!    iterations parallelize without serializing the tree.
//! 4. [`Strategy::extract`] normalizes the accumulated weights into the
//!    time-averaged strategy, whose distance from equilibrium
//!    [`exploitability`] measures via a best-response traversal.
//!
//! # Supported variants
//!
//! - **Vanilla CFR**: raw regret accumulation, full traversal
//! - **CFR+**: negative regrets floored at zero after each update
//! - **Linear CFR**: updates weighted by the iteration index
//! - **Discounted CFR**: sign-dependent regret decay with three exponents
//! - **External / outcome / chance sampling**: Monte Carlo traversals over
//!   the same statistics
//!
//! # Example
//!
//! ```ignore
//! use cfr_solver::cfr::{CfrSolver, GameTree, SolverConfig};
//! use cfr_solver::games::kuhn::Kuhn;
//!
//! let mut game = Kuhn::new();
//! let tree = GameTree::compile(&mut game)?;
//! let mut solver = CfrSolver::new(&tree, SolverConfig::default())?;
//! solver.train(100_000);
//! let strategy = solver.average_strategy();
//! println!("exploitability: {}", solver.exploitability(&game));
//! ```
//!
//! # References
//!
//! - Zinkevich et al., "Regret Minimization in Games with Incomplete
//!   Information" (2007)
//! - Lanctot et al., "Monte Carlo Sampling for Regret Minimization in
//!   Extensive Games" (2009)
//! - Tammelin, "Solving Large Imperfect Information Games Using CFR+" (2014)
//! - Brown & Sandholm, "Solving Imperfect-Information Games via Discounted
//!   Regret Minimization" (2019)

pub mod best_response;
pub mod config;
pub mod game;
pub mod sampling;
pub mod shards;
pub mod solver;
pub mod strategy;
pub mod tree;

pub use best_response::{best_response, expected_value, exploitability, BestResponse, BestResponseGame};
pub use config::{CfrVariant, ConfigError, SolverConfig, SolveStats, Traversal};
pub use game::{Action, Game, InfoSet, PlayGuard, Player, MAX_ACTIONS};
pub use sampling::sampled_value;
pub use shards::{Shard, ShardTable, UpdateRule};
pub use solver::CfrSolver;
pub use strategy::{Strategy, StrategyEntry, StrategyRow};
pub use tree::{GameTree, Node, NodeKind, TreeError, TreeLimits, ROOT};
