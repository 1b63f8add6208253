//! The coalescing dispatcher.
//!
//! Producers call [`CoalescingDispatcher::notify`] from any thread. Each
//! notification is folded into the [`AccumulatorSet`] and, if no flush is
//! outstanding, a single [`ViewJob::Flush`] is handed to the
//! [`FlushScheduler`]. The consumer later runs that job on its own
//! serialized context, which drains every bucket in
//! [`BucketKind::FLUSH_ORDER`] and applies each non-empty batch.
//!
//! # Scheduling protocol
//!
//! ```text
//! producer:  absorb (bucket lock)  ->  CAS scheduled false->true  ->  schedule(job)
//! consumer:  flushes += 1  ->  swap scheduled -> false  ->  drain buckets
//! ```
//!
//! The flag is cleared *before* any bucket is drained. An insert that the
//! drain misses therefore happened after the clear, so the producer's CAS
//! succeeds and schedules a fresh flush. No update is ever stranded, and
//! at most one flush is outstanding at any moment.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use duel_core::{MatchView, Notification, NotificationSink, StackNotice, ViewError, ViewResult};
use smallvec::SmallVec;

use crate::accumulator::{AccumulatorSet, BucketKind, Delivery};
use crate::metrics::{DispatchCounters, DispatchStats};

// ── Scheduler seam ───────────────────────────────────────────────

/// Posts jobs onto the consumer's serialized execution context.
///
/// `schedule` may be called from any producer thread and must not run
/// the job synchronously while holding locks the job itself needs.
pub trait FlushScheduler: Send + Sync {
    /// Queue `job` for later execution on the consumer context.
    fn schedule(&self, job: ViewJob);
}

/// A unit of work for the consumer context.
pub enum ViewJob {
    /// Drain all buckets of one dispatcher into the view.
    Flush(FlushRequest),
    /// Deliver one stack notice immediately, outside coalescing.
    StackNotice(StackNotice),
}

/// What running a [`ViewJob`] produced.
#[derive(Debug)]
pub enum JobOutcome {
    /// A flush ran.
    Flushed(FlushReport),
    /// A stack notice was delivered.
    Notice(ViewResult),
}

impl ViewJob {
    /// Run the job against the consumer's view.
    pub fn run(self, view: &mut dyn MatchView) -> JobOutcome {
        match self {
            ViewJob::Flush(request) => JobOutcome::Flushed(request.run(view)),
            ViewJob::StackNotice(notice) => {
                let result = view.notify_stack(notice);
                if let Err(e) = &result {
                    tracing::warn!(?notice, error = %e, "stack notice rejected by view");
                }
                JobOutcome::Notice(result)
            }
        }
    }
}

impl fmt::Debug for ViewJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewJob::Flush(_) => f.write_str("ViewJob::Flush"),
            ViewJob::StackNotice(n) => f.debug_tuple("ViewJob::StackNotice").field(n).finish(),
        }
    }
}

/// A pending flush of one dispatcher.
pub struct FlushRequest {
    shared: Arc<Shared>,
}

impl FlushRequest {
    /// Drain the dispatcher's buckets into `view`.
    pub fn run(self, view: &mut dyn MatchView) -> FlushReport {
        self.shared.flush(view)
    }
}

// ── FlushReport ──────────────────────────────────────────────────

/// Result of one flush cycle.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Buckets that had data, with batch sizes, in delivery order.
    pub delivered: SmallVec<[(BucketKind, usize); 8]>,
    /// Buckets whose batch the view rejected. Other buckets were still
    /// delivered.
    pub failures: SmallVec<[(BucketKind, ViewError); 2]>,
}

impl FlushReport {
    /// Whether every non-empty bucket was accepted.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether nothing at all was pending.
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failures.is_empty()
    }

    /// Buckets that were applied successfully, in delivery order.
    pub fn delivered_kinds(&self) -> impl Iterator<Item = BucketKind> + '_ {
        self.delivered.iter().map(|(kind, _)| *kind)
    }
}

// ── CoalescingDispatcher ─────────────────────────────────────────

struct Shared {
    buckets: AccumulatorSet,
    scheduled: AtomicBool,
    closed: AtomicBool,
    scheduler: Arc<dyn FlushScheduler>,
    immediate_stack_notices: bool,
    counters: DispatchCounters,
}

impl Shared {
    fn flush(&self, view: &mut dyn MatchView) -> FlushReport {
        self.counters.record_flush();
        // Clear before draining: anything we miss re-arms scheduling.
        self.scheduled.swap(false, Ordering::SeqCst);
        self.drain_into(view)
    }

    fn drain_into(&self, view: &mut dyn MatchView) -> FlushReport {
        let mut report = FlushReport::default();
        for kind in BucketKind::FLUSH_ORDER {
            match self.buckets.deliver(kind, view) {
                Delivery::Empty => {}
                Delivery::Applied { items } => report.delivered.push((kind, items)),
                Delivery::Failed(e) => {
                    tracing::warn!(bucket = %kind, error = %e, "view rejected batch");
                    self.counters.record_failed_batch();
                    report.failures.push((kind, e));
                }
            }
        }
        tracing::trace!(
            delivered = report.delivered.len(),
            failed = report.failures.len(),
            "flush complete"
        );
        report
    }
}

/// Coalesces notifications from many producers into batched view updates.
///
/// Cheap to clone; clones share the same buckets and scheduling state.
#[derive(Clone)]
pub struct CoalescingDispatcher {
    shared: Arc<Shared>,
}

// Compile-time assertion: the dispatcher is shared across producer threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<CoalescingDispatcher>();
    assert::<ViewJob>();
};

impl CoalescingDispatcher {
    /// Create a dispatcher that posts flushes through `scheduler`.
    pub fn new(scheduler: Arc<dyn FlushScheduler>) -> Self {
        Self::with_options(scheduler, false)
    }

    /// Create a dispatcher, optionally forwarding stack additions and
    /// removals to the view immediately as well as coalescing them.
    pub fn with_options(scheduler: Arc<dyn FlushScheduler>, immediate_stack_notices: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                buckets: AccumulatorSet::new(),
                scheduled: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                scheduler,
                immediate_stack_notices,
                counters: DispatchCounters::default(),
            }),
        }
    }

    /// Accept a notification from any thread.
    ///
    /// Never blocks beyond a bucket's critical section and never calls
    /// the view directly. Dropped once the dispatcher is closed.
    pub fn notify(&self, notification: Notification) {
        let shared = &self.shared;
        if shared.closed.load(Ordering::Acquire) {
            shared.counters.record_dropped();
            tracing::trace!(%notification, "dispatcher closed; notification dropped");
            return;
        }
        shared.counters.record_notification();

        if shared.immediate_stack_notices {
            if let Some(notice) = notification.stack_notice() {
                shared.scheduler.schedule(ViewJob::StackNotice(notice));
            }
        }

        if !shared.buckets.absorb(&notification) {
            return;
        }

        if shared
            .scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            shared.counters.record_schedule();
            tracing::trace!("flush scheduled");
            shared.scheduler.schedule(ViewJob::Flush(FlushRequest {
                shared: Arc::clone(shared),
            }));
        }
    }

    /// Drain every bucket into `view` right now.
    ///
    /// Must only be called from the consumer's execution context. Normally
    /// flushes arrive as [`ViewJob::Flush`]; this is for consumers that
    /// want to drain synchronously (for example at teardown). Scheduling
    /// state is left alone: an already queued flush still runs, and finds
    /// only what arrived after this call.
    pub fn flush(&self, view: &mut dyn MatchView) -> FlushReport {
        self.shared.drain_into(view)
    }

    /// Stop accepting notifications.
    ///
    /// Data already absorbed, and a flush already scheduled, are still
    /// delivered. Idempotent.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Whether a flush has been scheduled and not yet started.
    pub fn is_flush_scheduled(&self) -> bool {
        self.shared.scheduled.load(Ordering::SeqCst)
    }

    /// Whether any bucket holds undelivered data.
    pub fn has_pending(&self) -> bool {
        !self.shared.buckets.is_empty()
    }

    /// Current counters.
    pub fn stats(&self) -> DispatchStats {
        self.shared.counters.snapshot()
    }
}

impl NotificationSink for CoalescingDispatcher {
    fn notify(&self, notification: Notification) {
        CoalescingDispatcher::notify(self, notification);
    }
}

impl fmt::Debug for CoalescingDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescingDispatcher")
            .field("scheduled", &self.is_flush_scheduled())
            .field("closed", &self.is_closed())
            .field("immediate_stack_notices", &self.shared.immediate_stack_notices)
            .field("stats", &self.stats())
            .finish()
    }
}
