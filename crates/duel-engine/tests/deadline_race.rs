//! Integration test: the worker/timer race in `DeadlineGuard`.
//!
//! With a wide margin between work time `T` and budget `B`, the outcome
//! must depend only on the sign of `T - B`. Near the boundary either side
//! may win, but the decision must be internally consistent: a completed
//! run never cancels its token and a timed-out run always does.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use duel_core::CancelToken;
use duel_engine::{DeadlineGuard, Outcome};

const ROUNDS: usize = 20;

#[test]
fn fast_work_always_completes() {
    let guard = DeadlineGuard::new(Duration::from_millis(500));
    for round in 0..ROUNDS {
        let report = guard
            .run(move |_| {
                thread::sleep(Duration::from_millis(2));
                Ok::<_, ()>(round)
            })
            .unwrap();
        assert_eq!(report.outcome, Outcome::Completed(round));
        assert!(report.straggler.is_none());
    }
}

#[test]
fn slow_work_always_times_out() {
    let budget = Duration::from_millis(20);
    let guard = DeadlineGuard::new(budget);
    let mut stragglers = Vec::new();
    for _ in 0..ROUNDS {
        let report = guard
            .run(|cancel| {
                // Cooperative, so the test does not leak sleeping threads.
                while !cancel.is_cancelled() {
                    thread::sleep(Duration::from_millis(1));
                }
                Ok::<_, ()>(())
            })
            .unwrap();
        assert!(report.outcome.is_timed_out());
        assert!(report.elapsed >= budget);
        assert!(report.elapsed < Duration::from_secs(2));
        stragglers.extend(report.straggler);
    }
    assert_eq!(stragglers.len(), ROUNDS);
    for s in stragglers {
        assert!(s.join());
    }
}

#[test]
fn boundary_race_is_decided_consistently() {
    let budget = Duration::from_millis(5);
    let guard = DeadlineGuard::new(budget);
    let late_finishes = Arc::new(AtomicU32::new(0));

    for _ in 0..200 {
        let token = CancelToken::new();
        let late = Arc::clone(&late_finishes);
        let report = guard
            .run_with_token(token.clone(), move |cancel| {
                thread::sleep(Duration::from_millis(5));
                if cancel.is_cancelled() {
                    late.fetch_add(1, Ordering::Relaxed);
                }
                Ok::<_, ()>(42)
            })
            .unwrap();
        match report.outcome {
            Outcome::Completed(v) => {
                assert_eq!(v, 42);
                assert!(!token.is_cancelled());
                assert!(report.straggler.is_none());
            }
            Outcome::TimedOut => {
                assert!(token.is_cancelled());
                if let Some(s) = report.straggler {
                    assert!(s.join());
                }
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}

#[test]
fn uncooperative_worker_does_not_extend_the_wait() {
    let budget = Duration::from_millis(30);
    let guard = DeadlineGuard::new(budget);
    let report = guard
        .run(|_| {
            thread::sleep(Duration::from_millis(600));
            Ok::<_, ()>(())
        })
        .unwrap();
    assert!(report.outcome.is_timed_out());
    assert!(report.elapsed < Duration::from_millis(500));
    let straggler = report.straggler.expect("timed-out worker is returned");
    assert!(!straggler.is_finished());
    assert!(straggler.join());
}
