//! Leduc hold'em.
//!
//! A two-street poker game over a six-card deck (two suits of Jack, Queen,
//! King). Both players ante one chip and receive one private card; a betting
//! round follows, then a public board card, then a second betting round.
//! Bets are two chips on the first street and four on the second, with at
//! most one raise per street. At showdown a card pairing the board beats
//! everything else; otherwise the higher rank wins and equal ranks split.
//!
//! Cards are dealt by rank through chance nodes whose weights are the
//! remaining counts in the deck, so the compiled tree exercises non-uniform
//! chance probabilities and a multi-street best-response collapse.

use crate::cfr::best_response::BestResponseGame;
use crate::cfr::game::{Action, Game, InfoSet, Player};

/// Actions in Leduc: betting symbols plus the dealt ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeducAction {
    /// Check (no bet outstanding).
    Check,
    /// Open the betting for the street's bet size.
    Bet,
    /// Raise an outstanding bet by the street's bet size.
    Raise,
    /// Call the outstanding bet or raise.
    Call,
    /// Fold.
    Fold,
    /// A Jack, lowest rank.
    Jack,
    /// A Queen.
    Queen,
    /// A King, highest rank.
    King,
}

impl LeducAction {
    fn rank(self) -> i32 {
        match self {
            LeducAction::Jack => 0,
            LeducAction::Queen => 1,
            LeducAction::King => 2,
            _ => -1,
        }
    }
}

impl Action for LeducAction {
    fn label(&self) -> String {
        match self {
            LeducAction::Check => "k",
            LeducAction::Bet => "b",
            LeducAction::Raise => "r",
            LeducAction::Call => "c",
            LeducAction::Fold => "f",
            LeducAction::Jack => "J",
            LeducAction::Queen => "Q",
            LeducAction::King => "K",
        }
        .to_string()
    }
}

const RANKS: [LeducAction; 3] = [LeducAction::Jack, LeducAction::Queen, LeducAction::King];
const ROUND_BETS: [f64; 2] = [2.0, 4.0];

/// Betting position within one street.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BetState {
    /// No action yet.
    Opening,
    /// One check; a second check ends the street.
    OneCheck,
    /// A bet is outstanding.
    FacingBet,
    /// A raise is outstanding.
    FacingRaise,
}

#[derive(Debug, Clone, Copy)]
struct RoundScan {
    consumed: usize,
    complete: bool,
    folder: Option<usize>,
    state: BetState,
}

/// Parse one street's betting prefix: how many actions it consumed, whether
/// it is over, and who folded. Actor 0 opens each street.
fn scan_round(seq: &[LeducAction]) -> RoundScan {
    use LeducAction::*;
    let mut state = BetState::Opening;
    for (i, &action) in seq.iter().enumerate() {
        match (state, action) {
            (BetState::Opening, Check) => state = BetState::OneCheck,
            (BetState::Opening, Bet) | (BetState::OneCheck, Bet) => state = BetState::FacingBet,
            (BetState::OneCheck, Check) => {
                return RoundScan {
                    consumed: i + 1,
                    complete: true,
                    folder: None,
                    state,
                }
            }
            (BetState::FacingBet, Raise) => state = BetState::FacingRaise,
            (BetState::FacingBet, Fold) | (BetState::FacingRaise, Fold) => {
                return RoundScan {
                    consumed: i + 1,
                    complete: true,
                    folder: Some(i % 2),
                    state,
                }
            }
            (BetState::FacingBet, Call) | (BetState::FacingRaise, Call) => {
                return RoundScan {
                    consumed: i + 1,
                    complete: true,
                    folder: None,
                    state,
                }
            }
            _ => unreachable!("illegal betting sequence"),
        }
    }
    RoundScan {
        consumed: seq.len(),
        complete: false,
        folder: None,
        state,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    DealP1,
    DealP2,
    Round1 { state: BetState, actor: usize },
    DealBoard,
    Round2 { state: BetState, actor: usize },
    Done,
}

/// Snapshot of a Leduc position: the full action history, cards included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeducState(pub Vec<LeducAction>);

/// What one player can see: their card, the board once dealt, and the public
/// betting history of both streets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeducInfoSet {
    /// The player's own card.
    pub card: LeducAction,
    /// The board card, once dealt.
    pub board: Option<LeducAction>,
    /// Betting actions of both streets, in order.
    pub betting: Vec<LeducAction>,
}

impl InfoSet for LeducInfoSet {
    fn key(&self) -> String {
        let betting: String = self.betting.iter().map(|a| a.label()).collect();
        let board = self.board.map(|b| b.label()).unwrap_or_else(|| "-".to_string());
        format!("{}|{}|{}", self.card.label(), board, betting)
    }
}

/// Leduc hold'em game position, mutated in place via `play`/`undo`.
#[derive(Debug, Clone, Default)]
pub struct Leduc {
    history: Vec<LeducAction>,
}

impl Leduc {
    /// A fresh game at the initial (pre-deal) position.
    pub fn new() -> Self {
        Self::default()
    }

    fn phase(&self) -> Phase {
        match self.history.len() {
            0 => return Phase::DealP1,
            1 => return Phase::DealP2,
            _ => {}
        }
        let rest = &self.history[2..];
        let r1 = scan_round(rest);
        if !r1.complete {
            return Phase::Round1 {
                state: r1.state,
                actor: r1.consumed % 2,
            };
        }
        if r1.folder.is_some() {
            return Phase::Done;
        }
        let after = &rest[r1.consumed..];
        if after.is_empty() {
            return Phase::DealBoard;
        }
        let r2 = scan_round(&after[1..]);
        if !r2.complete {
            return Phase::Round2 {
                state: r2.state,
                actor: r2.consumed % 2,
            };
        }
        Phase::Done
    }

    /// Copies of each rank still in the deck.
    fn remaining(&self) -> [u32; 3] {
        let mut counts = [2, 2, 2];
        for &action in &self.history {
            let rank = action.rank();
            if rank >= 0 {
                counts[rank as usize] -= 1;
            }
        }
        counts
    }

    fn betting_actions(state: BetState) -> Vec<LeducAction> {
        use LeducAction::*;
        match state {
            BetState::Opening | BetState::OneCheck => vec![Check, Bet],
            BetState::FacingBet => vec![Fold, Call, Raise],
            BetState::FacingRaise => vec![Fold, Call],
        }
    }
}

/// Per-street chip flow. `Raise` matches the outstanding bet and adds the
/// street's bet on top; `Call` matches.
fn apply_round(seq: &[LeducAction], bet: f64, contrib: &mut [f64; 2]) {
    use LeducAction::*;
    let mut round = [0.0, 0.0];
    for (i, &action) in seq.iter().enumerate() {
        let actor = i % 2;
        match action {
            Bet => round[actor] += bet,
            Raise => round[actor] = round[1 - actor] + bet,
            Call => round[actor] = round[1 - actor],
            _ => {}
        }
    }
    contrib[0] += round[0];
    contrib[1] += round[1];
}

impl Game for Leduc {
    type State = LeducState;
    type Action = LeducAction;
    type InfoSet = LeducInfoSet;

    fn reset(&mut self) {
        self.history.clear();
    }

    fn state(&self) -> LeducState {
        LeducState(self.history.clone())
    }

    fn play(&mut self, action: LeducAction) {
        self.history.push(action);
    }

    fn undo(&mut self, action: LeducAction) {
        let popped = self.history.pop();
        debug_assert_eq!(popped, Some(action), "undo out of play order");
    }

    fn is_terminal(&self) -> bool {
        self.phase() == Phase::Done
    }

    fn current_player(&self) -> Player {
        match self.phase() {
            Phase::DealP1 | Phase::DealP2 | Phase::DealBoard => Player::Chance,
            Phase::Round1 { actor, .. } | Phase::Round2 { actor, .. } => {
                if actor == 0 {
                    Player::Player1
                } else {
                    Player::Player2
                }
            }
            Phase::Done => Player::Chance,
        }
    }

    fn payoff(&self, player: Player) -> f64 {
        let rest = &self.history[2..];
        let r1 = scan_round(rest);
        let mut contrib = [1.0, 1.0];
        apply_round(&rest[..r1.consumed], ROUND_BETS[0], &mut contrib);
        if let Some(folder) = r1.folder {
            let p1 = if folder == 0 { -contrib[0] } else { contrib[1] };
            return p1 * player.sign();
        }

        let board = rest[r1.consumed];
        let round2 = &rest[r1.consumed + 1..];
        let r2 = scan_round(round2);
        apply_round(&round2[..r2.consumed], ROUND_BETS[1], &mut contrib);
        if let Some(folder) = r2.folder {
            let p1 = if folder == 0 { -contrib[0] } else { contrib[1] };
            return p1 * player.sign();
        }

        let score = |card: LeducAction| {
            if card == board {
                100 + card.rank()
            } else {
                card.rank()
            }
        };
        let s1 = score(self.history[0]);
        let s2 = score(self.history[1]);
        let p1 = if s1 > s2 {
            contrib[1]
        } else if s1 < s2 {
            -contrib[0]
        } else {
            0.0
        };
        p1 * player.sign()
    }

    fn legal_actions(&self) -> Vec<LeducAction> {
        match self.phase() {
            Phase::DealP1 | Phase::DealP2 | Phase::DealBoard => {
                let counts = self.remaining();
                RANKS
                    .iter()
                    .copied()
                    .filter(|r| counts[r.rank() as usize] > 0)
                    .collect()
            }
            Phase::Round1 { state, .. } | Phase::Round2 { state, .. } => {
                Self::betting_actions(state)
            }
            Phase::Done => Vec::new(),
        }
    }

    fn chance_weights(&self) -> Vec<f64> {
        let counts = self.remaining();
        RANKS
            .iter()
            .filter(|r| counts[r.rank() as usize] > 0)
            .map(|r| counts[r.rank() as usize] as f64)
            .collect()
    }

    fn info_set(&self, player: Player) -> LeducInfoSet {
        let card = match player {
            Player::Player1 => self.history[0],
            _ => self.history[1],
        };
        let rest = &self.history[2..];
        let r1 = scan_round(rest);
        let (board, betting) = if r1.complete && r1.folder.is_none() && rest.len() > r1.consumed {
            let mut betting = rest[..r1.consumed].to_vec();
            betting.extend_from_slice(&rest[r1.consumed + 1..]);
            (Some(rest[r1.consumed]), betting)
        } else {
            (None, rest.to_vec())
        };
        LeducInfoSet {
            card,
            board,
            betting,
        }
    }
}

impl BestResponseGame for Leduc {
    fn chance_reach(&self, state: &LeducState) -> f64 {
        let mut game = Leduc::new();
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
        state: &LeducState,
        player: Player,
    ) -> Vec<(LeducInfoSet, LeducAction)> {
        let mut game = Leduc::new();
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
    use crate::cfr::config::SolverConfig;
    use crate::cfr::solver::CfrSolver;
    use crate::cfr::tree::GameTree;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use LeducAction::*;

    fn at(history: &[LeducAction]) -> Leduc {
        Leduc {
            history: history.to_vec(),
        }
    }

    #[test]
    fn street_structure() {
        assert_eq!(Leduc::new().current_player(), Player::Chance);
        assert_eq!(at(&[Jack]).current_player(), Player::Chance);
        assert_eq!(at(&[Jack, Queen]).current_player(), Player::Player1);
        assert_eq!(at(&[Jack, Queen, Check]).current_player(), Player::Player2);
        // Both checks close the street; the board comes next.
        assert_eq!(
            at(&[Jack, Queen, Check, Check]).current_player(),
            Player::Chance
        );
        // Player 1 opens the second street.
        assert_eq!(
            at(&[Jack, Queen, Check, Check, King]).current_player(),
            Player::Player1
        );
    }

    #[test]
    fn betting_options_per_state() {
        assert_eq!(at(&[Jack, Queen]).legal_actions(), vec![Check, Bet]);
        assert_eq!(at(&[Jack, Queen, Check]).legal_actions(), vec![Check, Bet]);
        assert_eq!(
            at(&[Jack, Queen, Bet]).legal_actions(),
            vec![Fold, Call, Raise]
        );
        assert_eq!(
            at(&[Jack, Queen, Bet, Raise]).legal_actions(),
            vec![Fold, Call]
        );
    }

    #[test]
    fn board_deal_excludes_exhausted_ranks() {
        // Both Jacks are gone: the board can only be a Queen or King, two
        // copies each.
        let game = at(&[Jack, Jack, Check, Check]);
        assert_eq!(game.legal_actions(), vec![Queen, King]);
        assert_eq!(game.chance_weights(), vec![2.0, 2.0]);

        // One Jack dealt: one copy remains.
        let game = at(&[Jack, Queen, Check, Check]);
        assert_eq!(game.legal_actions(), vec![Jack, Queen, King]);
        assert_eq!(game.chance_weights(), vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn fold_payoffs() {
        // Bet folded out on the first street: one ante.
        let game = at(&[Jack, King, Bet, Fold]);
        assert!(game.is_terminal());
        assert_eq!(game.payoff(Player::Player1), 1.0);

        // Check, bet, raise, fold: the folder loses ante + bet.
        let game = at(&[Jack, King, Check, Bet, Raise, Fold]);
        assert!(game.is_terminal());
        // Actors within the street: P1 check, P2 bet (+2), P1 raise (+4),
        // P2 fold with 3 chips in.
        assert_eq!(game.payoff(Player::Player1), 3.0);

        // Second-street fold after a called bet on the first.
        let game = at(&[Jack, King, Bet, Call, Queen, Bet, Fold]);
        assert!(game.is_terminal());
        assert_eq!(game.payoff(Player::Player1), 3.0);
    }

    #[test]
    fn showdown_payoffs() {
        // Pairing the board beats a higher rank.
        let game = at(&[Jack, King, Check, Check, Jack, Check, Check]);
        assert!(game.is_terminal());
        assert_eq!(game.payoff(Player::Player1), 1.0);
        assert_eq!(game.payoff(Player::Player2), -1.0);

        // Raised first street, checked second: 2 + 4 = 5 chips each way.
        let game = at(&[Jack, Queen, Bet, Raise, Call, King, Check, Check]);
        assert!(game.is_terminal());
        assert_eq!(game.payoff(Player::Player1), -5.0);

        // Equal ranks split the pot.
        let game = at(&[Queen, Queen, Check, Check, King, Check, Check]);
        assert_eq!(game.payoff(Player::Player1), 0.0);
    }

    #[test]
    fn zero_sum_over_random_playouts() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let mut game = Leduc::new();
            while !game.is_terminal() {
                let actions = game.legal_actions();
                let action = if game.current_player() == Player::Chance {
                    game.sample_action(&mut rng)
                } else {
                    actions[rng.gen_range(0..actions.len())]
                };
                game.play(action);
            }
            let p1 = game.payoff(Player::Player1);
            let p2 = game.payoff(Player::Player2);
            assert!((p1 + p2).abs() < 1e-12);
        }
    }

    #[test]
    fn play_undo_round_trips() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let mut game = Leduc::new();
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
            assert_eq!(game.state(), Leduc::new().state());
        }
    }

    #[test]
    fn info_set_hides_opponent_card_only() {
        let a = at(&[Jack, Queen, Bet]).info_set(Player::Player1);
        let b = at(&[Jack, King, Bet]).info_set(Player::Player1);
        assert_eq!(a, b);

        // The board is public: different boards are different info sets.
        let c = at(&[Jack, Queen, Check, Check, King, Check]).info_set(Player::Player1);
        let d = at(&[Jack, Queen, Check, Check, Queen, Check]).info_set(Player::Player1);
        assert_ne!(c, d);
        assert_eq!(c.key(), "J|K|kkk");
    }

    #[test]
    fn chance_reach_counts_the_deck() {
        let game = Leduc::new();
        // Two Jacks: 2/6 then 1/5.
        let state = LeducState(vec![Jack, Jack]);
        assert!((game.chance_reach(&state) - 1.0 / 15.0).abs() < 1e-12);
        // Distinct ranks: 2/6 then 2/5.
        let state = LeducState(vec![Jack, Queen]);
        assert!((game.chance_reach(&state) - 2.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn commitments_span_both_streets() {
        let game = Leduc::new();
        let state = LeducState(vec![Jack, Queen, Check, Bet, Call, King, Bet]);
        let p1 = game.path_commitments(&state, Player::Player1);
        let acts: Vec<LeducAction> = p1.iter().map(|(_, a)| *a).collect();
        assert_eq!(acts, vec![Check, Call, Bet]);
        assert_eq!(p1[2].0.key(), "J|K|kbc");

        let p2 = game.path_commitments(&state, Player::Player2);
        let acts: Vec<LeducAction> = p2.iter().map(|(_, a)| *a).collect();
        assert_eq!(acts, vec![Bet]);
    }

    #[test]
    fn cfr_plus_converges_on_leduc() {
        let mut game = Leduc::new();
        let tree = GameTree::compile(&mut game).unwrap();
        let mut solver =
            CfrSolver::new(&tree, SolverConfig::default().with_threads(1)).unwrap();
        solver.train(2_000);

        let exploitability = solver.exploitability(&game);
        assert!(
            exploitability < 0.1,
            "Leduc exploitability {} not below 0.1",
            exploitability
        );

        // The equilibrium value is a small fraction of an ante.
        let value = crate::cfr::best_response::expected_value(
            &tree,
            &solver.average_strategy(),
            Player::Player1,
        );
        assert!(
            value.abs() < 0.3,
            "Leduc game value {} outside the expected band",
            value
        );
    }
}
