//! Reference game implementations.
//!
//! These games serve three purposes:
//!
//! 1. **Validation**: both have small trees and well-studied equilibria, so
//!    the solver's output can be checked against known values (Kuhn's game
//!    value is exactly -1/18 for the first player).
//! 2. **Examples**: they show how to implement the
//!    [`Game`](crate::cfr::Game) and
//!    [`BestResponseGame`](crate::cfr::BestResponseGame) contracts for a
//!    single-street and a multi-street game.
//! 3. **Benchmarks**: standardized workloads for the criterion benches.
//!
//! To add a game: define an action enum, a state snapshot, and an
//! information-set type; implement `Game` (and `BestResponseGame` if you
//! want exploitability numbers); and write tests that pin down the rules —
//! in particular that `info_set` collapses exactly the states the acting
//! player cannot tell apart, which the solver cannot verify for you.

pub mod kuhn;
pub mod leduc;
