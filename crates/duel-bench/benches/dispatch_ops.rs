//! Criterion micro-benchmarks for notification coalescing and flushing.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use duel_bench::{notification_burst, CountingView};
use duel_core::{CardId, Notification};
use duel_engine::{CoalescingDispatcher, InlineScheduler};
use duel_test_utils::ManualScheduler;

fn bench_notify_same_card(c: &mut Criterion) {
    let scheduler = ManualScheduler::new();
    let dispatcher = CoalescingDispatcher::new(scheduler.clone());
    c.bench_function("notify_same_card", |b| {
        b.iter(|| dispatcher.notify(black_box(Notification::CardChanged { card: CardId(1) })));
    });
}

fn bench_burst_then_flush(c: &mut Criterion) {
    let burst = notification_burst(42, 1_000);
    c.bench_function("burst_1k_then_flush", |b| {
        b.iter_batched(
            || {
                let scheduler = ManualScheduler::new();
                let dispatcher = CoalescingDispatcher::new(scheduler.clone());
                (scheduler, dispatcher, burst.clone())
            },
            |(scheduler, dispatcher, burst)| {
                for n in burst {
                    dispatcher.notify(n);
                }
                let mut view = CountingView::default();
                black_box(scheduler.run_all(&mut view));
                view.items
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_inline_flush_per_notify(c: &mut Criterion) {
    let burst = notification_burst(7, 1_000);
    let inline = Arc::new(InlineScheduler::new(CountingView::default()));
    let dispatcher = CoalescingDispatcher::new(inline.clone());
    c.bench_function("inline_1k", |b| {
        b.iter(|| {
            for n in &burst {
                dispatcher.notify(n.clone());
            }
        });
    });
    black_box(inline.view().batches);
}

fn bench_contended_notify(c: &mut Criterion) {
    let burst = notification_burst(9, 2_000);
    c.bench_function("contended_4x2k", |b| {
        b.iter(|| {
            let scheduler = ManualScheduler::new();
            let dispatcher = CoalescingDispatcher::new(scheduler.clone());
            thread::scope(|s| {
                for _ in 0..4 {
                    let d = dispatcher.clone();
                    let burst = &burst;
                    s.spawn(move || {
                        for n in burst {
                            d.notify(n.clone());
                        }
                    });
                }
            });
            black_box(dispatcher.stats())
        });
    });
}

criterion_group!(
    benches,
    bench_notify_same_card,
    bench_burst_then_flush,
    bench_inline_flush_per_notify,
    bench_contended_notify
);
criterion_main!(benches);
