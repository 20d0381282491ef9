//! # cfr-solver
//!
//! A parallel Counterfactual Regret Minimization (CFR) solver for two-player
//! zero-sum extensive-form games with imperfect information.
//!
//! ## Features
//!
//! - **Compiled game trees**: one exhaustive enumeration flattens any
//!   [`cfr::Game`] into immutable arrays traversed millions of times
//! - **The CFR family**: vanilla, CFR+, linear, and discounted CFR over full
//!   traversals, plus external-, outcome-, and chance-sampling Monte Carlo
//!   variants
//! - **Sharded statistics**: one lock per information set, so solving
//!   threads run independent iterations with no global lock
//! - **Evaluation**: exact best response and exploitability against any
//!   frozen strategy
//! - **Export**: flat (information set, action, probability) JSON triples
//!
//! ## Quick start
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
//! ```
//!
//! ## Modules
//!
//! - [`cfr`]: the solver core (tree compiler, regret matching, sampling,
//!   best response)
//! - [`games`]: reference games (Kuhn poker, Leduc hold'em)

#![warn(missing_docs)]

/// CFR solver core.
pub mod cfr;

/// Reference game implementations.
pub mod games;

pub use cfr::{CfrSolver, CfrVariant, Game, GameTree, Player, SolverConfig, Strategy, Traversal};
