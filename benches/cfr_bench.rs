//! Benchmarks for the CFR solver.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cfr_solver::cfr::{CfrSolver, GameTree, SolverConfig, Traversal};
use cfr_solver::games::kuhn::Kuhn;
use cfr_solver::games::leduc::Leduc;

fn leduc_compile_benchmark(c: &mut Criterion) {
    c.bench_function("leduc_tree_compile", |b| {
        b.iter(|| {
            let mut game = Leduc::new();
            let tree = GameTree::compile(&mut game).unwrap();
            black_box(tree.num_nodes())
        })
    });
}

fn kuhn_full_iteration_benchmark(c: &mut Criterion) {
    let tree = GameTree::compile(&mut Kuhn::new()).unwrap();
    let config = SolverConfig::default().with_threads(1);
    let solver = CfrSolver::new(&tree, config).unwrap();

    c.bench_function("kuhn_full_iteration", |b| {
        b.iter(|| {
            solver.run_iteration();
            black_box(solver.iteration())
        })
    });
}

fn leduc_full_iteration_benchmark(c: &mut Criterion) {
    let tree = GameTree::compile(&mut Leduc::new()).unwrap();
    let config = SolverConfig::default().with_threads(1);
    let solver = CfrSolver::new(&tree, config).unwrap();

    c.bench_function("leduc_full_iteration", |b| {
        b.iter(|| {
            solver.run_iteration();
            black_box(solver.iteration())
        })
    });
}

fn leduc_external_sampling_benchmark(c: &mut Criterion) {
    let tree = GameTree::compile(&mut Leduc::new()).unwrap();
    let config = SolverConfig::default()
        .with_traversal(Traversal::ExternalSampling)
        .with_threads(1)
        .with_seed(42);
    let solver = CfrSolver::new(&tree, config).unwrap();

    c.bench_function("leduc_external_sampling_iteration", |b| {
        b.iter(|| {
            solver.run_iteration();
            black_box(solver.iteration())
        })
    });
}

criterion_group!(
    benches,
    leduc_compile_benchmark,
    kuhn_full_iteration_benchmark,
    leduc_full_iteration_benchmark,
    leduc_external_sampling_benchmark
);
criterion_main!(benches);
