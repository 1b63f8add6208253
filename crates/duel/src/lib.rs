//! Duel: concurrency coordination for multithreaded match simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Duel sub-crates. For most users, adding `duel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use duel::prelude::*;
//!
//! // A rules engine that taps one card and wins.
//! struct OneTurn;
//! impl Game for OneTurn {
//!     fn name(&self) -> &str { "one-turn" }
//!     fn run(&mut self, ctx: &GameContext) -> Result<(), GameError> {
//!         ctx.notify(Notification::CardTapped { card: CardId(1) });
//!         ctx.conclude(GameOutcome::win(PlayerId(0), "Ai(1)"));
//!         Ok(())
//!     }
//! }
//!
//! // A headless view that ignores every update.
//! struct Headless;
//! impl MatchView for Headless {}
//!
//! let config = MatchConfig {
//!     time_budget: Duration::from_secs(5),
//!     ..MatchConfig::default()
//! };
//! let runner = MatchRunner::new(config, Arc::new(InlineScheduler::new(Headless))).unwrap();
//! let report = runner.run(Box::new(OneTurn), 1).unwrap();
//! assert_eq!(report.state, MatchState::Completed);
//! assert!(report.result_line().ends_with("Ai(1) has won!"));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `duel-core` | IDs, notifications, outcomes, match log, seam traits |
//! | [`engine`] | `duel-engine` | Dispatcher, deadline guard, match runner, view threads |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`duel-core`).
///
/// Contains the closed [`types::Notification`] set, [`types::GameOutcome`],
/// the [`types::GameLog`], and the seam traits ([`types::Game`],
/// [`types::MatchView`], [`types::NotificationSink`]).
pub use duel_core as types;

/// Coordination engine (`duel-engine`).
///
/// [`engine::CoalescingDispatcher`] for batched view updates,
/// [`engine::DeadlineGuard`] for bounded execution, and
/// [`engine::MatchRunner`] / [`engine::MatchSeries`] to run games.
pub use duel_engine as engine;

/// Common imports for typical Duel usage.
///
/// ```rust
/// use duel::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use duel_core::{
        CardId, Game, GameContext, GameOutcome, LogMode, MatchView, Notification,
        NotificationSink, PlayerId, PlayerZone, ViewResult, ZoneKind,
    };

    // Errors
    pub use duel_core::{GameError, ViewError};

    // Engine
    pub use duel_engine::{
        CoalescingDispatcher, ConfigError, DeadlineGuard, FlushScheduler, InlineScheduler,
        MatchConfig, MatchReport, MatchRunner, MatchSeries, MatchState, Outcome, SeriesConfig,
        SeriesReport, ViewThread,
    };
}
