//! Game trait definition for the CFR solver.
//!
//! Any two-player zero-sum game that implements the `Game` trait can be
//! compiled into a [`crate::cfr::tree::GameTree`] and solved. The trait is
//! the only boundary between the solver core and concrete game rules.

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

/// Upper bound on the number of legal actions at any single node.
///
/// Traversals keep per-node strategy and value buffers on the stack, sized by
/// this constant. The tree compiler rejects games that exceed it.
pub const MAX_ACTIONS: usize = 16;

/// The actor at a node: one of the two players, or nature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    /// The first player. Payoffs are stored from this player's perspective.
    Player1,
    /// The second player.
    Player2,
    /// Nature; resolved by a fixed probability distribution, not a strategy.
    Chance,
}

impl Player {
    /// The other player. `Chance` has no opponent and is returned unchanged.
    pub fn opponent(self) -> Player {
        match self {
            Player::Player1 => Player::Player2,
            Player::Player2 => Player::Player1,
            Player::Chance => Player::Chance,
        }
    }

    /// Sign that converts a Player1-perspective payoff into this player's
    /// perspective. Zero for `Chance`, which has no payoff.
    pub fn sign(self) -> f64 {
        match self {
            Player::Player1 => 1.0,
            Player::Player2 => -1.0,
            Player::Chance => 0.0,
        }
    }
}

/// Trait for actions a player or nature can take.
///
/// Actions are small copyable symbols; a per-node action list is ordered and
/// never longer than [`MAX_ACTIONS`].
pub trait Action: Copy + Eq + Hash + Debug + Send + Sync {
    /// Short label used in exports and reports (e.g. `"b"` for bet).
    fn label(&self) -> String;
}

/// Trait for information sets (what a player knows at a decision point).
///
/// Two game states that look identical to the acting player — same private
/// cards, same public history — must produce equal information sets, and all
/// states producing one information set must offer the identical ordered
/// action list. Getting this wrong silently corrupts solving: the solver can
/// only detect the action-list half of the contract, so game implementations
/// must validate indistinguishability in their own tests.
pub trait InfoSet: Clone + Eq + Hash + Debug + Send + Sync {
    /// Stable string key for this information set, used only by exports.
    fn key(&self) -> String;
}

/// The game contract consumed by the tree compiler and evaluators.
///
/// Implementations mutate a single position in place: `play` applies an
/// action and `undo` reverses it, in strict stack discipline. A
/// `play(a); undo(a)` pair must restore the state bit-identically.
pub trait Game: Clone + Send + Sync {
    /// Opaque value uniquely identifying a position.
    type State: Clone + Eq + Hash + Debug + Send + Sync;

    /// Action symbol type.
    type Action: Action;

    /// Information set type.
    type InfoSet: InfoSet;

    /// Return to the initial position.
    fn reset(&mut self);

    /// Snapshot of the current position.
    fn state(&self) -> Self::State;

    /// Apply `action` to the current position.
    fn play(&mut self, action: Self::Action);

    /// Reverse `action`, which must be the most recently played one.
    fn undo(&mut self, action: Self::Action);

    /// Whether the game is over. Only then is `payoff` defined.
    fn is_terminal(&self) -> bool;

    /// Actor at the current position. Undefined at terminal states.
    fn current_player(&self) -> Player;

    /// Terminal payoff from `player`'s perspective. Zero-sum:
    /// `payoff(Player1) == -payoff(Player2)`.
    fn payoff(&self, player: Player) -> f64;

    /// Ordered list of legal actions at the current position.
    fn legal_actions(&self) -> Vec<Self::Action>;

    /// Chance-node outcome weights, co-indexed with `legal_actions`.
    ///
    /// Weights are non-negative and need not sum to one; the consumer
    /// normalizes them. Only called when `current_player()` is `Chance`.
    fn chance_weights(&self) -> Vec<f64>;

    /// Information set of the current position as seen by `player`.
    fn info_set(&self, player: Player) -> Self::InfoSet;

    /// Draw one chance outcome consistent with `chance_weights`.
    ///
    /// Used only by Monte Carlo traversal and playouts, never by full tree
    /// enumeration.
    fn sample_action<R: rand::Rng>(&self, rng: &mut R) -> Self::Action {
        let actions = self.legal_actions();
        let weights = self.chance_weights();
        let total: f64 = weights.iter().sum();
        let mut r = rng.gen::<f64>() * total;
        for (action, weight) in actions.iter().zip(weights.iter()) {
            r -= weight;
            if r <= 0.0 {
                return *action;
            }
        }
        *actions.last().expect("sample_action on a node without actions")
    }
}

/// Scoped play with guaranteed undo.
///
/// Plays `action` on construction and undoes it on drop, so a traversal that
/// unwinds partway never leaves the game in a played-but-not-undone state.
pub struct PlayGuard<'a, G: Game> {
    game: &'a mut G,
    action: G::Action,
}

impl<'a, G: Game> PlayGuard<'a, G> {
    /// Play `action` and return a guard that undoes it when dropped.
    pub fn new(game: &'a mut G, action: G::Action) -> Self {
        game.play(action);
        Self { game, action }
    }
}

impl<G: Game> Drop for PlayGuard<'_, G> {
    fn drop(&mut self) {
        self.game.undo(self.action);
    }
}

impl<G: Game> Deref for PlayGuard<'_, G> {
    type Target = G;

    fn deref(&self) -> &G {
        self.game
    }
}

impl<G: Game> DerefMut for PlayGuard<'_, G> {
    fn deref_mut(&mut self) -> &mut G {
        self.game
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_swaps_players() {
        assert_eq!(Player::Player1.opponent(), Player::Player2);
        assert_eq!(Player::Player2.opponent(), Player::Player1);
        assert_eq!(Player::Chance.opponent(), Player::Chance);
    }

    #[test]
    fn sign_is_zero_sum() {
        assert_eq!(Player::Player1.sign(), -Player::Player2.sign());
        assert_eq!(Player::Chance.sign(), 0.0);
    }
}
