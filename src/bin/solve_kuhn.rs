//! Kuhn poker solver binary.
//!
//! Usage:
//!   cargo run --release --bin solve_kuhn -- [OPTIONS]
//!
//! Options:
//!   --iterations <N>     Training iterations (default: 100000)
//!   --variant <NAME>     vanilla | plus | linear | discounted (default: plus)
//!   --sampling <NAME>    full | external | outcome | chance (default: full)
//!   --threads <N>        Solving threads (default: rayon default)
//!   --seed <N>           Random seed (default: 0)
//!   --output <FILE>      Strategy JSON output (default: kuhn_strategy.json)

use std::env;
use std::fs::File;
use std::io::Write;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use cfr_solver::cfr::{
    expected_value, CfrSolver, CfrVariant, GameTree, Player, SolverConfig, Traversal,
};
use cfr_solver::games::kuhn::Kuhn;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut iterations: u64 = 100_000;
    let mut variant = CfrVariant::CfrPlus;
    let mut traversal = Traversal::FullTree;
    let mut threads: Option<usize> = None;
    let mut seed: u64 = 0;
    let mut output = "kuhn_strategy.json".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-i" => {
                i += 1;
                if i < args.len() {
                    iterations = args[i].parse().unwrap_or(iterations);
                }
            }
            "--variant" | "-v" => {
                i += 1;
                if i < args.len() {
                    variant = match args[i].as_str() {
                        "vanilla" => CfrVariant::Vanilla,
                        "plus" => CfrVariant::CfrPlus,
                        "linear" => CfrVariant::Linear,
                        "discounted" => CfrVariant::discounted_default(),
                        other => {
                            eprintln!("Unknown variant: {}", other);
                            return;
                        }
                    };
                }
            }
            "--sampling" => {
                i += 1;
                if i < args.len() {
                    traversal = match args[i].as_str() {
                        "full" => Traversal::FullTree,
                        "external" => Traversal::ExternalSampling,
                        "outcome" => Traversal::OutcomeSampling,
                        "chance" => Traversal::ChanceSampling,
                        other => {
                            eprintln!("Unknown sampling scheme: {}", other);
                            return;
                        }
                    };
                }
            }
            "--threads" | "-t" => {
                i += 1;
                if i < args.len() {
                    threads = args[i].parse().ok();
                }
            }
            "--seed" | "-s" => {
                i += 1;
                if i < args.len() {
                    seed = args[i].parse().unwrap_or(seed);
                }
            }
            "--output" | "-o" => {
                i += 1;
                if i < args.len() {
                    output = args[i].clone();
                }
            }
            "--help" | "-h" => {
                println!("See the header of src/bin/solve_kuhn.rs for options.");
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                return;
            }
        }
        i += 1;
    }

    println!("=== Kuhn Poker Solver ===");
    println!();

    let mut game = Kuhn::new();
    let tree = match GameTree::compile(&mut game) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Tree compilation failed: {}", e);
            return;
        }
    };
    println!(
        "Tree: {} nodes, {} information sets",
        tree.num_nodes(),
        tree.num_info_sets()
    );

    let mut config = SolverConfig::default()
        .with_variant(variant)
        .with_traversal(traversal)
        .with_seed(seed);
    if let Some(threads) = threads {
        config = config.with_threads(threads);
    }
    let mut solver = match CfrSolver::new(&tree, config) {
        Ok(solver) => solver,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    let start = Instant::now();
    let bar = ProgressBar::new(iterations);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} ({per_sec}, {elapsed_precise})")
            .unwrap()
            .progress_chars("=>-"),
    );
    let interval = (iterations / 100).max(1);
    solver.train_with_progress(iterations, interval, |stats| {
        bar.set_position(stats.iterations);
    });
    bar.finish_and_clear();

    let stats = solver.stats();
    println!(
        "Trained {} iterations in {:.2}s ({:.0} it/s)",
        stats.iterations, stats.elapsed_seconds, stats.iterations_per_second
    );

    let strategy = solver.average_strategy();
    let value = expected_value(&tree, &strategy, Player::Player1);
    let gap = solver.exploitability(&game);
    println!();
    println!("Game value (Player 1): {:+.5}  (equilibrium: -1/18 = -0.05556)", value);
    println!("Exploitability:        {:.5}", gap);
    println!();

    println!("Average strategy:");
    let rows = strategy.export();
    for row in &rows {
        println!("  {:>6}  {:>2}  {:.4}", row.info_set, row.action, row.probability);
    }

    match serde_json::to_string_pretty(&rows) {
        Ok(json) => match File::create(&output).and_then(|mut f| f.write_all(json.as_bytes())) {
            Ok(()) => println!("\nStrategy written to {}", output),
            Err(e) => eprintln!("Failed to write {}: {}", output, e),
        },
        Err(e) => eprintln!("Failed to serialize strategy: {}", e),
    }

    println!("Total time: {:.2}s", start.elapsed().as_secs_f64());
}
