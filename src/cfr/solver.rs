//! The CFR solver family.
//!
//! [`CfrSolver`] walks a compiled [`GameTree`] repeatedly, deriving current
//! strategies from accumulated regrets via regret matching and pushing
//! regret/strategy updates into the [`ShardTable`]. One instance drives all
//! four full-tree variants (vanilla, CFR+, linear, discounted) and the three
//! Monte Carlo traversals; the variants differ only in the update rule and
//! the branch-selection scheme.
//!
//! Iterations are independent and run in parallel on a rayon pool. The tree
//! is read-only; all coordination goes through the per-information-set shard
//! locks and one atomic iteration counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::cfr::best_response::{exploitability, BestResponseGame};
use crate::cfr::config::{ConfigError, SolverConfig, SolveStats, Traversal};
use crate::cfr::game::{Game, Player, MAX_ACTIONS};
use crate::cfr::shards::{ShardTable, UpdateRule};
use crate::cfr::strategy::Strategy;
use crate::cfr::tree::{GameTree, NodeKind, ROOT};

/// The CFR solver for one compiled game tree.
pub struct CfrSolver<'a, G: Game> {
    pub(crate) tree: &'a GameTree<G>,
    pub(crate) shards: ShardTable<G>,
    pub(crate) config: SolverConfig,
    pub(crate) iteration: AtomicU64,
    pool: Option<rayon::ThreadPool>,
    stats: SolveStats,
}

impl<'a, G: Game> CfrSolver<'a, G> {
    /// Create a solver over `tree`.
    ///
    /// Builds the shard table in a deterministic single-threaded pass, so
    /// that solving threads never race on accumulator creation, and spins up
    /// a dedicated thread pool when a thread count is configured.
    pub fn new(tree: &'a GameTree<G>, config: SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .expect("failed to build solving thread pool"),
            ),
            None => None,
        };
        let shards = ShardTable::new(tree);
        let mut stats = SolveStats::default();
        stats.info_sets = shards.len();
        Ok(Self {
            tree,
            shards,
            config,
            iteration: AtomicU64::new(0),
            pool,
            stats,
        })
    }

    /// Run one solving iteration.
    ///
    /// Claims the next iteration index from the shared atomic counter, so
    /// concurrent callers receive monotonically distinct decay weights.
    pub fn run_iteration(&self) {
        let t = self.iteration.fetch_add(1, Ordering::Relaxed) + 1;
        let rule = self.config.variant.update_rule(t);
        match self.config.traversal {
            Traversal::FullTree => {
                self.full_iteration(ROOT, 1.0, 1.0, 1.0, &rule);
            }
            Traversal::ExternalSampling => {
                let player = self.updated_player(t);
                let mut rng = self.iteration_rng(t);
                self.external_iteration(ROOT, player, 1.0, 1.0, &rule, &mut rng);
            }
            Traversal::OutcomeSampling => {
                let player = self.updated_player(t);
                let mut rng = self.iteration_rng(t);
                self.outcome_iteration(ROOT, player, 1.0, 1.0, 1.0, &rule, &mut rng);
            }
            Traversal::ChanceSampling => {
                let mut rng = self.iteration_rng(t);
                self.chance_iteration(ROOT, 1.0, 1.0, &rule, &mut rng);
            }
        }
    }

    /// Train for `iterations` iterations and return the run statistics.
    pub fn train(&mut self, iterations: u64) -> &SolveStats {
        let start = Instant::now();
        self.run_batch(iterations);
        self.finish_stats(start.elapsed().as_secs_f64());
        &self.stats
    }

    /// Train with a progress callback invoked every `interval` iterations.
    pub fn train_with_progress<F>(
        &mut self,
        iterations: u64,
        interval: u64,
        mut callback: F,
    ) -> &SolveStats
    where
        F: FnMut(&SolveStats),
    {
        let start = Instant::now();
        let interval = interval.max(1);
        let mut remaining = iterations;
        while remaining > 0 {
            let batch = remaining.min(interval);
            self.run_batch(batch);
            remaining -= batch;
            self.finish_stats(start.elapsed().as_secs_f64());
            callback(&self.stats);
        }
        &self.stats
    }

    fn run_batch(&self, iterations: u64) {
        let this = &*self;
        let run = move || {
            (0..iterations)
                .into_par_iter()
                .for_each(|_| this.run_iteration());
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn finish_stats(&mut self, elapsed: f64) {
        self.stats.iterations = self.iteration.load(Ordering::Relaxed);
        self.stats.info_sets = self.shards.len();
        self.stats.elapsed_seconds = elapsed;
        self.stats.update_rate();
    }

    /// Full-tree traversal updating both players, values from Player1's
    /// perspective.
    ///
    /// `pi1`/`pi2` are the players' reach probabilities, `pc` the chance
    /// reach. At a decision node the current strategy is copied out under
    /// the shard lock, the lock is released, every action is explored, and
    /// the acting player's instantaneous regret
    /// `reach(opponent) * chance_reach * (action_value - node_value)` and
    /// reach-weighted strategy are accumulated.
    fn full_iteration(&self, idx: u32, pi1: f64, pi2: f64, pc: f64, rule: &UpdateRule) -> f64 {
        let node = self.tree.node(idx);
        match node.kind {
            NodeKind::Terminal(payoff) => payoff,
            NodeKind::Chance => {
                let children = self.tree.children_of(node);
                let probs = self.tree.probs_of(node);
                let mut value = 0.0;
                for (child, &p) in children.iter().zip(probs.iter()) {
                    value += p * self.full_iteration(*child, pi1, pi2, pc * p, rule);
                }
                value
            }
            NodeKind::Decision(player) => {
                if pi1 == 0.0 && pi2 == 0.0 {
                    return 0.0;
                }
                let n = node.num_children as usize;
                let shard = self.shards.shard_for_node(idx);
                let mut strategy = [0.0; MAX_ACTIONS];
                shard.current_strategy(&mut strategy);

                let children = self.tree.children_of(node);
                let mut utils = [0.0; MAX_ACTIONS];
                let mut value = 0.0;
                for i in 0..n {
                    utils[i] = match player {
                        Player::Player1 => {
                            self.full_iteration(children[i], strategy[i] * pi1, pi2, pc, rule)
                        }
                        _ => self.full_iteration(children[i], pi1, strategy[i] * pi2, pc, rule),
                    };
                    value += strategy[i] * utils[i];
                }

                let mut regret_delta = [0.0; MAX_ACTIONS];
                let mut strategy_delta = [0.0; MAX_ACTIONS];
                match player {
                    Player::Player1 => {
                        for i in 0..n {
                            regret_delta[i] = pi2 * pc * (utils[i] - value);
                            strategy_delta[i] = pi1 * strategy[i];
                        }
                    }
                    _ => {
                        for i in 0..n {
                            regret_delta[i] = pi1 * pc * (value - utils[i]);
                            strategy_delta[i] = pi2 * strategy[i];
                        }
                    }
                }
                shard.apply(&regret_delta[..n], &strategy_delta[..n], rule);
                value
            }
        }
    }

    pub(crate) fn updated_player(&self, t: u64) -> Player {
        if t % 2 == 0 {
            Player::Player1
        } else {
            Player::Player2
        }
    }

    pub(crate) fn iteration_rng(&self, t: u64) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ t.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    /// Normalize the accumulated strategy weights into the average strategy.
    pub fn average_strategy(&self) -> Strategy<G> {
        Strategy::extract(self.tree, &self.shards)
    }

    /// Exploitability of the current average strategy, in payoff units.
    pub fn exploitability(&self, game: &G) -> f64
    where
        G: BestResponseGame,
    {
        exploitability(game, self.tree, &self.average_strategy())
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> u64 {
        self.iteration.load(Ordering::Relaxed)
    }

    /// Number of distinct information sets.
    pub fn num_info_sets(&self) -> usize {
        self.shards.len()
    }

    /// Statistics from the most recent training call.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// The statistics store, for inspection.
    pub fn shards(&self) -> &ShardTable<G> {
        &self.shards
    }

    /// Configuration the solver was built with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::config::CfrVariant;
    use crate::games::kuhn::Kuhn;

    fn solve_kuhn(config: SolverConfig, iterations: u64) -> f64 {
        let mut game = Kuhn::new();
        let tree = GameTree::compile(&mut game).unwrap();
        let mut solver = CfrSolver::new(&tree, config).unwrap();
        solver.train(iterations);
        solver.exploitability(&game)
    }

    #[test]
    fn cfr_plus_converges_on_kuhn() {
        let config = SolverConfig::default().with_threads(1);
        let exploitability = solve_kuhn(config, 10_000);
        assert!(
            exploitability < 0.01,
            "CFR+ exploitability {} not below 0.01",
            exploitability
        );
    }

    #[test]
    fn vanilla_cfr_converges_on_kuhn() {
        let config = SolverConfig::default()
            .with_variant(CfrVariant::Vanilla)
            .with_threads(1);
        let exploitability = solve_kuhn(config, 10_000);
        assert!(
            exploitability < 0.05,
            "vanilla exploitability {} not below 0.05",
            exploitability
        );
    }

    #[test]
    fn linear_cfr_converges_on_kuhn() {
        let config = SolverConfig::default()
            .with_variant(CfrVariant::Linear)
            .with_threads(1);
        let exploitability = solve_kuhn(config, 5_000);
        assert!(
            exploitability < 0.05,
            "linear exploitability {} not below 0.05",
            exploitability
        );
    }

    #[test]
    fn discounted_cfr_converges_on_kuhn() {
        let config = SolverConfig::default()
            .with_variant(CfrVariant::discounted_default())
            .with_threads(1);
        let exploitability = solve_kuhn(config, 5_000);
        assert!(
            exploitability < 0.05,
            "discounted exploitability {} not below 0.05",
            exploitability
        );
    }

    #[test]
    fn parallel_solving_converges_on_kuhn() {
        let config = SolverConfig::default().with_threads(4);
        let exploitability = solve_kuhn(config, 20_000);
        assert!(
            exploitability < 0.01,
            "parallel exploitability {} not below 0.01",
            exploitability
        );
    }

    #[test]
    fn kuhn_equilibrium_structure() {
        let mut game = Kuhn::new();
        let tree = GameTree::compile(&mut game).unwrap();
        let mut solver =
            CfrSolver::new(&tree, SolverConfig::default().with_threads(1)).unwrap();
        solver.train(20_000);
        let strategy = solver.average_strategy();

        // Player 1 with the Queen opens with a check; the Jack bluff rate is
        // at most 1/3, and the King bet rate is three times it. These hold
        // across the whole equilibrium family.
        let jack = strategy.probs_by_key("J|").unwrap();
        let queen = strategy.probs_by_key("Q|").unwrap();
        let king = strategy.probs_by_key("K|").unwrap();
        assert!(queen[1] < 0.05, "queen bets {}", queen[1]);
        assert!(jack[1] < 0.45, "jack bluff rate {} above 1/3", jack[1]);
        assert!(king[1] > 3.0 * jack[1] - 0.2, "king bets {}", king[1]);

        // The game value for Player 1 is -1/18.
        let value =
            crate::cfr::best_response::expected_value(&tree, &strategy, Player::Player1);
        assert!(
            (value + 1.0 / 18.0).abs() < 0.01,
            "game value {} far from -1/18",
            value
        );
    }
}
