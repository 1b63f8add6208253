//! Criterion benchmarks for guarded execution and whole-match overhead.

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use duel_bench::{CountingView, SimulatedDuel};
use duel_engine::{DeadlineGuard, InlineScheduler, MatchConfig, MatchRunner};

fn bench_guard_trivial_work(c: &mut Criterion) {
    let guard = DeadlineGuard::new(Duration::from_secs(5));
    c.bench_function("guard_trivial_work", |b| {
        b.iter(|| {
            let report = guard.run(|_| Ok::<_, ()>(black_box(1u64))).unwrap();
            black_box(report.outcome)
        });
    });
}

fn bench_simulated_match(c: &mut Criterion) {
    let runner = MatchRunner::new(
        MatchConfig::default(),
        Arc::new(InlineScheduler::new(CountingView::default())),
    )
    .unwrap();
    let mut seed = 0u64;
    c.bench_function("simulated_match_inline", |b| {
        b.iter(|| {
            seed += 1;
            let report = runner.run(Box::new(SimulatedDuel::new(seed)), 1).unwrap();
            black_box(report.outcome)
        });
    });
}

criterion_group!(benches, bench_guard_trivial_work, bench_simulated_match);
criterion_main!(benches);
