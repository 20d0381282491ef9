//! Kuhn poker.
//!
//! The classic three-card validation game: both players ante one chip, each
//! is dealt one of {Jack, Queen, King}, and a single betting round with a
//! one-chip bet follows. The dealt cards are explicit chance nodes, so the
//! compiled tree exercises chance probabilities and the best-response
//! collapse over hidden cards.
//!
//! Known equilibrium facts used by the tests: Player 1 bets the Jack with
//! some probability α ≤ 1/3, bets the King with probability 3α, always
//! checks the Queen, and the game value is -1/18 for Player 1.

use crate::cfr::game::{Action, Game, InfoSet, Player};
use crate::cfr::best_response::BestResponseGame;

/// Actions in Kuhn poker: betting symbols plus the dealt cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KuhnAction {
    /// Check (no bet outstanding).
    Check,
    /// Bet one chip.
    Bet,
    /// Call an outstanding bet.
    Call,
    /// Fold to an outstanding bet.
    Fold,
    /// The Jack, lowest card.
    Jack,
    /// The Queen.
    Queen,
    /// The King, highest card.
    King,
}

impl KuhnAction {
    fn rank(self) -> i32 {
        match self {
            KuhnAction::Jack => 0,
            KuhnAction::Queen => 1,
            KuhnAction::King => 2,
            _ => -1,
        }
    }
}

impl Action for KuhnAction {
    fn label(&self) -> String {
        match self {
            KuhnAction::Check => "k",
            KuhnAction::Bet => "b",
            KuhnAction::Call => "c",
            KuhnAction::Fold => "f",
            KuhnAction::Jack => "J",
            KuhnAction::Queen => "Q",
            KuhnAction::King => "K",
        }
        .to_string()
    }
}

/// Snapshot of a Kuhn position: the full action history, cards included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KuhnState(pub Vec<KuhnAction>);

/// What one player can see: their own card and the public betting history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KuhnInfoSet {
    /// The player's own card.
    pub card: KuhnAction,
    /// Betting actions so far, both players' moves visible.
    pub betting: Vec<KuhnAction>,
}

impl InfoSet for KuhnInfoSet {
    fn key(&self) -> String {
        let betting: String = self.betting.iter().map(|a| a.label()).collect();
        format!("{}|{}", self.card.label(), betting)
    }
}

/// Kuhn poker game position, mutated in place via `play`/`undo`.
#[derive(Debug, Clone, Default)]
pub struct Kuhn {
    history: Vec<KuhnAction>,
}

impl Kuhn {
    /// A fresh game at the initial (pre-deal) position.
    pub fn new() -> Self {
        Self::default()
    }

    fn betting(&self) -> &[KuhnAction] {
        if self.history.len() < 2 {
            &[]
        } else {
            &self.history[2..]
        }
    }
}

impl Game for Kuhn {
    type State = KuhnState;
    type Action = KuhnAction;
    type InfoSet = KuhnInfoSet;

    fn reset(&mut self) {
        self.history.clear();
    }

    fn state(&self) -> KuhnState {
        KuhnState(self.history.clone())
    }

    fn play(&mut self, action: KuhnAction) {
        self.history.push(action);
    }

    fn undo(&mut self, action: KuhnAction) {
        let popped = self.history.pop();
        debug_assert_eq!(popped, Some(action), "undo out of play order");
    }

    fn is_terminal(&self) -> bool {
        use KuhnAction::*;
        matches!(
            self.betting(),
            [Check, Check] | [Bet, Fold | Call] | [Check, Bet, Fold | Call]
        )
    }

    fn current_player(&self) -> Player {
        if self.history.len() < 2 {
            Player::Chance
        } else if (self.history.len() - 2) % 2 == 0 {
            Player::Player1
        } else {
            Player::Player2
        }
    }

    fn payoff(&self, player: Player) -> f64 {
        use KuhnAction::*;
        let showdown = if self.history[0].rank() > self.history[1].rank() {
            1.0
        } else {
            -1.0
        };
        let p1 = match self.betting() {
            [Check, Check] => showdown,
            [Bet, Fold] => 1.0,
            [Bet, Call] => 2.0 * showdown,
            [Check, Bet, Fold] => -1.0,
            [Check, Bet, Call] => 2.0 * showdown,
            _ => unreachable!("payoff on a non-terminal state"),
        };
        p1 * player.sign()
    }

    fn legal_actions(&self) -> Vec<KuhnAction> {
        use KuhnAction::*;
        match self.history.len() {
            0 => vec![Jack, Queen, King],
            1 => [Jack, Queen, King]
                .into_iter()
                .filter(|&c| c != self.history[0])
                .collect(),
            _ => match self.betting().last() {
                Some(Bet) => vec![Fold, Call],
                _ => vec![Check, Bet],
            },
        }
    }

    fn chance_weights(&self) -> Vec<f64> {
        vec![1.0; self.legal_actions().len()]
    }

    fn info_set(&self, player: Player) -> KuhnInfoSet {
        let card = match player {
            Player::Player1 => self.history[0],
            _ => self.history[1],
        };
        KuhnInfoSet {
            card,
            betting: self.betting().to_vec(),
        }
    }
}

impl BestResponseGame for Kuhn {
    fn chance_reach(&self, state: &KuhnState) -> f64 {
        let mut game = Kuhn::new();
        let mut reach = 1.0;
        for &action in &state.0 {
            if game.current_player() == Player::Chance {
                let actions = game.legal_actions();
                let weights = game.chance_weights();
                let total: f64 = weights.iter().sum();
                let i = actions
                    .iter()
                    .position(|&a| a == action)
                    .expect("replayed chance action is not legal");
                reach *= weights[i] / total;
            }
            game.play(action);
        }
        reach
    }

    fn path_commitments(
        &self,
        state: &KuhnState,
        player: Player,
    ) -> Vec<(KuhnInfoSet, KuhnAction)> {
        let mut game = Kuhn::new();
        let mut commitments = Vec::new();
        for &action in &state.0 {
            if game.current_player() == player {
                commitments.push((game.info_set(player), action));
            }
            game.play(action);
        }
        commitments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::game::PlayGuard;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use KuhnAction::*;

    fn at(history: &[KuhnAction]) -> Kuhn {
        Kuhn {
            history: history.to_vec(),
        }
    }

    #[test]
    fn deals_then_alternates() {
        assert_eq!(Kuhn::new().current_player(), Player::Chance);
        assert_eq!(at(&[Jack]).current_player(), Player::Chance);
        assert_eq!(at(&[Jack, Queen]).current_player(), Player::Player1);
        assert_eq!(at(&[Jack, Queen, Check]).current_player(), Player::Player2);
        assert_eq!(
            at(&[Jack, Queen, Check, Bet]).current_player(),
            Player::Player1
        );
    }

    #[test]
    fn second_deal_excludes_first_card() {
        let game = at(&[Queen]);
        assert_eq!(game.legal_actions(), vec![Jack, King]);
        assert_eq!(game.chance_weights(), vec![1.0, 1.0]);
    }

    #[test]
    fn terminal_payoffs() {
        // Showdown after two checks: one ante changes hands.
        let game = at(&[King, Jack, Check, Check]);
        assert!(game.is_terminal());
        assert_eq!(game.payoff(Player::Player1), 1.0);
        assert_eq!(game.payoff(Player::Player2), -1.0);

        // Bet folded out: the bettor wins the ante regardless of cards.
        let game = at(&[Jack, King, Bet, Fold]);
        assert!(game.is_terminal());
        assert_eq!(game.payoff(Player::Player1), 1.0);

        // Check, bet, fold: Player 1 surrenders the ante.
        let game = at(&[King, Jack, Check, Bet, Fold]);
        assert_eq!(game.payoff(Player::Player1), -1.0);

        // Called bet: two chips at showdown.
        let game = at(&[Jack, Queen, Bet, Call]);
        assert_eq!(game.payoff(Player::Player1), -2.0);
        assert_eq!(game.payoff(Player::Player2), 2.0);
    }

    #[test]
    fn zero_sum_everywhere() {
        for betting in [
            vec![Check, Check],
            vec![Bet, Fold],
            vec![Bet, Call],
            vec![Check, Bet, Fold],
            vec![Check, Bet, Call],
        ] {
            let mut history = vec![Queen, King];
            history.extend(betting);
            let game = at(&history);
            assert_eq!(
                game.payoff(Player::Player1),
                -game.payoff(Player::Player2)
            );
        }
    }

    #[test]
    fn play_undo_round_trips() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let mut game = Kuhn::new();
            let mut played = Vec::new();
            while !game.is_terminal() {
                let actions = game.legal_actions();
                let action = actions[rng.gen_range(0..actions.len())];
                game.play(action);
                played.push(action);
            }
            for &action in played.iter().rev() {
                game.undo(action);
            }
            assert_eq!(game.state(), Kuhn::new().state());
        }
    }

    #[test]
    fn play_guard_undoes_on_drop() {
        let mut game = at(&[Jack, Queen]);
        let before = game.state();
        {
            let guard = PlayGuard::new(&mut game, Check);
            assert_eq!(guard.current_player(), Player::Player2);
        }
        assert_eq!(game.state(), before);
    }

    #[test]
    fn info_set_hides_opponent_card() {
        let a = at(&[Jack, Queen, Check]).info_set(Player::Player1);
        let b = at(&[Jack, King, Check]).info_set(Player::Player1);
        assert_eq!(a, b);

        let c = at(&[Jack, Queen, Check]).info_set(Player::Player2);
        let d = at(&[King, Queen, Check]).info_set(Player::Player2);
        assert_eq!(c, d);
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn info_set_keys() {
        let game = at(&[Jack, Queen, Check, Bet]);
        assert_eq!(game.info_set(Player::Player1).key(), "J|kb");
        assert_eq!(game.info_set(Player::Player2).key(), "Q|kb");
    }

    #[test]
    fn chance_reach_of_a_deal() {
        let game = Kuhn::new();
        let state = KuhnState(vec![Jack, Queen, Check]);
        assert!((game.chance_reach(&state) - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn path_commitments_by_player() {
        let game = Kuhn::new();
        let state = KuhnState(vec![Jack, Queen, Check, Bet]);

        let p1 = game.path_commitments(&state, Player::Player1);
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].0.key(), "J|");
        assert_eq!(p1[0].1, Check);

        let p2 = game.path_commitments(&state, Player::Player2);
        assert_eq!(p2.len(), 1);
        assert_eq!(p2[0].0.key(), "Q|k");
        assert_eq!(p2[0].1, Bet);
    }
}
