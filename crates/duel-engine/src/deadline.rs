//! Deadline-bounded execution of a work item.
//!
//! [`DeadlineGuard::run`] executes a closure on a dedicated worker thread
//! and waits at most the configured budget for it. Exactly one of two
//! parties decides the result: the worker (by finishing) or the timer (by
//! expiring). The decision is a single CAS on a shared slot, so a
//! completion racing the deadline is either fully accepted or fully
//! discarded, never half of each.
//!
//! On timeout the worker is asked to stop through its [`CancelToken`] and
//! then detached; it is never forcibly killed. The detached thread is
//! returned as a [`Straggler`] so callers can observe or join it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use duel_core::CancelToken;
use thiserror::Error;

use crate::config::ConfigError;

// ── Outcome types ────────────────────────────────────────────────

/// How a guarded work item failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Failure<E> {
    /// The work returned an error.
    #[error("{0}")]
    Returned(E),
    /// The work panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },
}

/// Final state of a guarded work item.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The work finished within budget.
    Completed(T),
    /// The work failed within budget.
    Failed(Failure<E>),
    /// The budget ran out first. Any later result is discarded.
    TimedOut,
}

impl<T, E> Outcome<T, E> {
    /// Whether the deadline decided the outcome.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }
}

/// A worker thread that outlived its deadline.
pub struct Straggler {
    handle: JoinHandle<()>,
}

impl Straggler {
    /// Whether the worker has since exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker exits. Returns `false` if it panicked
    /// outside the guarded closure.
    pub fn join(self) -> bool {
        self.handle.join().is_ok()
    }
}

impl fmt::Debug for Straggler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Straggler")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// Everything [`DeadlineGuard::run`] learned.
#[derive(Debug)]
pub struct GuardReport<T, E> {
    /// How the work ended.
    pub outcome: Outcome<T, E>,
    /// Wall-clock time from start to decision, measured by the caller.
    pub elapsed: Duration,
    /// The detached worker, present only after a timeout.
    pub straggler: Option<Straggler>,
}

// ── Resolution slot ──────────────────────────────────────────────

const PENDING: u8 = 0;
const BY_WORKER: u8 = 1;
const BY_TIMER: u8 = 2;

/// Decide-once slot shared by the worker and the timer.
#[derive(Debug, Default)]
struct ResolutionSlot(AtomicU8);

impl ResolutionSlot {
    /// Try to decide the outcome. `true` for exactly one caller.
    fn claim(&self, by: u8) -> bool {
        self.0
            .compare_exchange(PENDING, by, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

// ── DeadlineGuard ────────────────────────────────────────────────

/// Runs work with a wall-clock budget.
#[derive(Clone, Debug)]
pub struct DeadlineGuard {
    budget: Duration,
    thread_name: String,
}

impl DeadlineGuard {
    /// A guard with the given budget. Worker threads are named
    /// `duel-worker`.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            thread_name: "duel-worker".into(),
        }
    }

    /// Override the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// The configured budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Run `work` with a fresh cancellation token.
    pub fn run<T, E, F>(&self, work: F) -> Result<GuardReport<T, E>, ConfigError>
    where
        F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.run_with_token(CancelToken::new(), work)
    }

    /// Run `work`, cancelling `cancel` if the budget runs out.
    ///
    /// Blocks the caller for at most the budget (plus scheduling noise).
    /// Only a thread spawn failure is an error; everything the work does
    /// is folded into [`Outcome`].
    pub fn run_with_token<T, E, F>(
        &self,
        cancel: CancelToken,
        work: F,
    ) -> Result<GuardReport<T, E>, ConfigError>
    where
        F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let slot = Arc::new(ResolutionSlot::default());
        let (tx, rx) = crossbeam_channel::bounded::<Result<T, Failure<E>>>(1);

        let worker_slot = Arc::clone(&slot);
        let worker_cancel = cancel.clone();
        let start = Instant::now();
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let result = match panic::catch_unwind(AssertUnwindSafe(|| work(&worker_cancel))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(Failure::Returned(e)),
                    Err(payload) => Err(Failure::Panicked {
                        message: panic_message(payload.as_ref()),
                    }),
                };
                if worker_slot.claim(BY_WORKER) {
                    // The receiver outlives a worker-decided outcome.
                    let _ = tx.send(result);
                } else {
                    tracing::debug!("worker finished after its deadline; result discarded");
                }
            })
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("worker thread: {e}"),
            })?;

        let (outcome, straggler) = match rx.recv_timeout(self.budget) {
            Ok(result) => (into_outcome(result), None),
            Err(RecvTimeoutError::Timeout) => {
                if slot.claim(BY_TIMER) {
                    cancel.cancel();
                    (Outcome::TimedOut, Some(Straggler { handle }))
                } else {
                    // The worker decided first; its send is already under way.
                    tracing::debug!("deadline lost the race to a finishing worker");
                    match rx.recv() {
                        Ok(result) => (into_outcome(result), None),
                        Err(_) => (vanished(), None),
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                slot.claim(BY_TIMER);
                (vanished(), None)
            }
        };
        let elapsed = start.elapsed();

        Ok(GuardReport {
            outcome,
            elapsed,
            straggler,
        })
    }
}

fn into_outcome<T, E>(result: Result<T, Failure<E>>) -> Outcome<T, E> {
    match result {
        Ok(value) => Outcome::Completed(value),
        Err(failure) => Outcome::Failed(failure),
    }
}

fn vanished<T, E>() -> Outcome<T, E> {
    Outcome::Failed(Failure::Panicked {
        message: "worker exited without reporting a result".into(),
    })
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
