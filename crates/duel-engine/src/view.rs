//! Consumer execution contexts.
//!
//! The dispatcher only ever posts [`ViewJob`]s through a
//! [`FlushScheduler`]; these types decide where the jobs run.
//!
//! - [`ViewThread`] owns the view on a dedicated `duel-view` thread and
//!   runs jobs strictly in arrival order. This is the interactive mode.
//! - [`InlineScheduler`] runs each job on the scheduling thread against a
//!   mutex-guarded view. This is the headless mode, where there is no
//!   separate presentation context to hand work to.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use duel_core::MatchView;
use parking_lot::{Mutex, MutexGuard};

use crate::config::ConfigError;
use crate::dispatcher::{FlushScheduler, JobOutcome, ViewJob};

enum ViewMessage {
    Job(ViewJob),
    Barrier(Sender<()>),
    Shutdown,
}

// ── ViewThread ───────────────────────────────────────────────────

/// Result of stopping a [`ViewThread`].
#[derive(Clone, Debug, Default)]
pub struct ViewShutdownReport {
    /// Total time spent draining and joining, in milliseconds.
    pub total_ms: u64,
    /// Jobs the thread ran over its lifetime.
    pub jobs_run: u64,
    /// Whether the thread was joined cleanly (the view did not panic).
    pub joined: bool,
}

/// A dedicated thread that owns a view and runs posted jobs in order.
pub struct ViewThread<V> {
    tx: Option<Sender<ViewMessage>>,
    thread: Option<JoinHandle<(V, u64)>>,
    recovered: Option<V>,
    last_report: Option<ViewShutdownReport>,
}

impl<V: MatchView + Send + 'static> ViewThread<V> {
    /// Move `view` onto a new `duel-view` thread.
    pub fn spawn(view: V) -> Result<Self, ConfigError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("duel-view".into())
            .spawn(move || view_loop(view, rx))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("view thread: {e}"),
            })?;
        tracing::debug!("view thread started");
        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
            recovered: None,
            last_report: None,
        })
    }

    /// A scheduler that posts onto this thread. Cloneable via `Arc`.
    pub fn handle(&self) -> Arc<dyn FlushScheduler> {
        Arc::new(ViewHandle {
            tx: self.tx.clone(),
        })
    }

    /// Block until every job queued before this call has run.
    ///
    /// Returns `false` if the thread is no longer running. Must not be
    /// called from the view thread itself.
    pub fn sync(&self) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        if tx.send(ViewMessage::Barrier(done_tx)).is_err() {
            return false;
        }
        done_rx.recv().is_ok()
    }

    /// Whether the thread has not been shut down.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Run every job already queued, stop the thread and recover the view.
    ///
    /// Jobs posted after this call are dropped. Idempotent: later calls
    /// return the first call's report.
    pub fn shutdown(&mut self) -> ViewShutdownReport {
        if let Some(report) = &self.last_report {
            return report.clone();
        }
        let start = Instant::now();
        if let Some(tx) = self.tx.take() {
            // Fails only if the thread already died; join reports that.
            let _ = tx.send(ViewMessage::Shutdown);
        }
        let (joined, jobs_run) = match self.thread.take().map(JoinHandle::join) {
            Some(Ok((view, jobs))) => {
                self.recovered = Some(view);
                (true, jobs)
            }
            Some(Err(_)) => {
                tracing::error!("view thread panicked; view lost");
                (false, 0)
            }
            None => (true, 0),
        };
        let report = ViewShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            jobs_run,
            joined,
        };
        tracing::debug!(jobs_run, joined, "view thread stopped");
        self.last_report = Some(report.clone());
        report
    }

    /// Shut down (if still running) and return the view.
    ///
    /// `None` if the view panicked on its thread.
    pub fn into_view(mut self) -> Option<V> {
        self.shutdown();
        self.recovered.take()
    }
}

impl<V> Drop for ViewThread<V> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(ViewMessage::Shutdown);
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn view_loop<V: MatchView>(mut view: V, rx: Receiver<ViewMessage>) -> (V, u64) {
    let mut jobs_run = 0u64;
    while let Ok(message) = rx.recv() {
        match message {
            ViewMessage::Job(job) => {
                if let JobOutcome::Flushed(report) = job.run(&mut view) {
                    if !report.is_clean() {
                        tracing::debug!(failures = report.failures.len(), "flush partially applied");
                    }
                }
                jobs_run += 1;
            }
            ViewMessage::Barrier(done) => {
                let _ = done.send(());
            }
            ViewMessage::Shutdown => break,
        }
    }
    (view, jobs_run)
}

struct ViewHandle {
    tx: Option<Sender<ViewMessage>>,
}

impl FlushScheduler for ViewHandle {
    fn schedule(&self, job: ViewJob) {
        let delivered = match &self.tx {
            Some(tx) => tx.send(ViewMessage::Job(job)).is_ok(),
            None => false,
        };
        if !delivered {
            tracing::warn!("view thread is gone; job dropped");
        }
    }
}

// ── InlineScheduler ──────────────────────────────────────────────

/// Runs jobs immediately on the scheduling thread.
///
/// The view sits behind a mutex, so concurrent producers still apply
/// batches one at a time. A view must not emit notifications from inside
/// a batch-apply call: the mutex is not reentrant.
pub struct InlineScheduler<V> {
    view: Mutex<V>,
}

impl<V: MatchView + Send> InlineScheduler<V> {
    /// Wrap `view`.
    pub fn new(view: V) -> Self {
        Self {
            view: Mutex::new(view),
        }
    }

    /// Lock the view for inspection.
    pub fn view(&self) -> MutexGuard<'_, V> {
        self.view.lock()
    }

    /// Unwrap the view.
    pub fn into_inner(self) -> V {
        self.view.into_inner()
    }
}

impl<V: MatchView + Send> FlushScheduler for InlineScheduler<V> {
    fn schedule(&self, job: ViewJob) {
        let mut view = self.view.lock();
        job.run(&mut *view);
    }
}
