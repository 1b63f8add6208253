//! Stress test: many producers against one consumer.
//!
//! Eight producer threads hammer a single dispatcher with overlapping card
//! ids while the consumer drains it concurrently. Verifies that:
//!
//! 1. At most one flush is ever outstanding (sampled by a monitor thread).
//! 2. No accepted update is lost: the union of delivered ids equals the
//!    union of notified ids.
//! 3. Once the consumer catches up, every schedule has a matching flush.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use duel_core::{CardId, Notification, PlayerId};
use duel_engine::{CoalescingDispatcher, ViewThread};
use duel_test_utils::{ManualScheduler, RecordingView, ViewCall};

const PRODUCERS: u32 = 8;
const PER_PRODUCER: u32 = 5_000;
const ID_SPACE: u32 = 2_000;

fn delivered_cards(calls: &[ViewCall]) -> HashSet<CardId> {
    calls
        .iter()
        .flat_map(|c| match c {
            ViewCall::Cards(cards) => cards.clone(),
            _ => Vec::new(),
        })
        .collect()
}

#[test]
fn at_most_one_flush_outstanding_on_view_thread() {
    let view = RecordingView::new();
    let vt = ViewThread::spawn(view.clone()).unwrap();
    let dispatcher = CoalescingDispatcher::new(vt.handle());

    let done = Arc::new(AtomicBool::new(false));
    let max_outstanding = Arc::new(AtomicU64::new(0));
    let monitor = {
        let d = dispatcher.clone();
        let done = Arc::clone(&done);
        let max = Arc::clone(&max_outstanding);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                max.fetch_max(d.stats().outstanding(), Ordering::Relaxed);
                thread::yield_now();
            }
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|t| {
            let d = dispatcher.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    d.notify(Notification::CardChanged {
                        card: CardId((t * 7919 + i) % ID_SPACE),
                    });
                    if i % 64 == 0 {
                        d.notify(Notification::PlayerLifeChanged {
                            player: PlayerId(t % 2),
                        });
                    }
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    assert!(vt.sync());
    done.store(true, Ordering::Release);
    monitor.join().unwrap();

    assert!(max_outstanding.load(Ordering::Relaxed) <= 1);
    assert!(!dispatcher.has_pending());

    let stats = dispatcher.stats();
    assert_eq!(stats.notifications, u64::from(PRODUCERS * (PER_PRODUCER + PER_PRODUCER.div_ceil(64))));
    assert_eq!(stats.schedules, stats.flushes);
    assert!(stats.flushes >= 1);

    let expected: HashSet<CardId> = (0..PRODUCERS)
        .flat_map(|t| (0..PER_PRODUCER).map(move |i| CardId((t * 7919 + i) % ID_SPACE)))
        .collect();
    assert_eq!(delivered_cards(&view.calls()), expected);
}

#[test]
fn concurrent_drain_loses_nothing() {
    let scheduler = ManualScheduler::new();
    let dispatcher = CoalescingDispatcher::new(scheduler.clone());
    let producing = Arc::new(AtomicBool::new(true));

    let consumer = {
        let scheduler = Arc::clone(&scheduler);
        let producing = Arc::clone(&producing);
        thread::spawn(move || {
            let mut view = RecordingView::new();
            while producing.load(Ordering::Acquire) {
                scheduler.run_all(&mut view);
                thread::yield_now();
            }
            // Anything scheduled after the last pass.
            scheduler.run_all(&mut view);
            view
        })
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|t| {
            let d = dispatcher.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    d.notify(Notification::CardChanged {
                        card: CardId(t * PER_PRODUCER + i),
                    });
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }
    producing.store(false, Ordering::Release);
    let view = consumer.join().unwrap();

    assert_eq!(scheduler.pending(), 0);
    assert!(!dispatcher.has_pending());
    let delivered = delivered_cards(&view.calls());
    assert_eq!(delivered.len(), (PRODUCERS * PER_PRODUCER) as usize);
    // Each id was notified once, so no batch may repeat one.
    assert_eq!(view.cards_delivered(), delivered.len());
}

#[test]
fn coalescing_collapses_bursts() {
    let scheduler = ManualScheduler::new();
    let dispatcher = CoalescingDispatcher::new(scheduler.clone());
    for _ in 0..10_000 {
        dispatcher.notify(Notification::CardChanged { card: CardId(1) });
    }
    assert_eq!(scheduler.pending(), 1);

    let mut view = RecordingView::new();
    let reports = scheduler.run_all(&mut view);
    assert_eq!(reports.len(), 1);
    assert_eq!(view.calls(), vec![ViewCall::Cards(vec![CardId(1)])]);
}
