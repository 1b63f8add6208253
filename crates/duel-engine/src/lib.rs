//! Match coordination engine for Duel.
//!
//! Provides the [`CoalescingDispatcher`] that batches producer
//! notifications into ordered view updates, the [`DeadlineGuard`] that
//! bounds a game's wall-clock time, and the [`MatchRunner`] that composes
//! the two into a match that always ends with exactly one outcome.
//! Supports a dedicated view thread or inline (headless) consumption.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accumulator;
pub mod config;
pub mod deadline;
pub mod dispatcher;
pub mod metrics;
pub mod runner;
pub mod series;
pub mod view;

pub use accumulator::{AccumulatorSet, BucketKind, Delivery, FlagBucket, LatestBucket, SetBucket};
pub use config::{ConfigError, MatchConfig, SeriesConfig, DEFAULT_MAX_GAMES, DEFAULT_TIME_BUDGET};
pub use deadline::{DeadlineGuard, Failure, GuardReport, Outcome, Straggler};
pub use dispatcher::{
    CoalescingDispatcher, FlushReport, FlushRequest, FlushScheduler, JobOutcome, ViewJob,
};
pub use metrics::DispatchStats;
pub use runner::{MatchReport, MatchRunner, MatchState};
pub use series::{MatchSeries, SeriesReport};
pub use view::{InlineScheduler, ViewShutdownReport, ViewThread};
