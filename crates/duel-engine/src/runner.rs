//! Running one game to a guaranteed outcome.
//!
//! [`MatchRunner::run`] wires a game to a fresh [`CoalescingDispatcher`],
//! runs it under a [`DeadlineGuard`], and normalizes whatever happened
//! into exactly one [`GameOutcome`]:
//!
//! ```text
//! Created ──► Running ──► Completed   natural end (outcome read from the game)
//!                    ├──► TimedOut    budget exceeded → forced draw
//!                    └──► Failed      error or panic  → forced draw + diagnostic
//! ```
//!
//! Forcing is idempotent: if the game concluded before or in the same
//! instant the deadline fired, the recorded outcome stands and no
//! diagnostic is attached.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use duel_core::{
    CancelToken, EndReason, Game, GameContext, GameLog, GameOutcome, GameStatus, LogCategory,
    LogEntry, MatchId, Notification, NotificationSink,
};

use crate::config::{ConfigError, MatchConfig};
use crate::deadline::{DeadlineGuard, Outcome};
use crate::dispatcher::{CoalescingDispatcher, FlushScheduler};
use crate::metrics::DispatchStats;

// ── MatchState ───────────────────────────────────────────────────

/// Lifecycle of a single match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchState {
    /// Game constructed, not started.
    Created,
    /// Game running under the deadline guard.
    Running,
    /// The game ended on its own within budget.
    Completed,
    /// The budget ran out; the game was stopped as a draw.
    TimedOut,
    /// The game returned an error or panicked; recorded as a draw.
    Failed,
}

impl MatchState {
    /// Whether the match has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }

    fn advance(self, next: MatchState) -> MatchState {
        debug_assert!(
            matches!(
                (self, next),
                (Self::Created, Self::Running)
                    | (Self::Running, Self::Completed | Self::TimedOut | Self::Failed)
            ),
            "invalid match transition {self:?} -> {next:?}"
        );
        next
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::TimedOut => "timed out",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ── MatchReport ──────────────────────────────────────────────────

/// Everything known about one finished match.
#[derive(Clone, Debug)]
pub struct MatchReport {
    /// Identity of the run.
    pub match_id: MatchId,
    /// 1-based position within a series.
    pub game_number: u32,
    /// Name of the game that was played.
    pub game_name: String,
    /// Terminal state.
    pub state: MatchState,
    /// The one outcome of the match.
    pub outcome: GameOutcome,
    /// Wall-clock time measured by the runner. Close to the budget when
    /// the match timed out, regardless of how long the worker lingers.
    pub elapsed: Duration,
    /// Match log, filtered by the configured [`LogMode`](duel_core::LogMode).
    pub log: Vec<LogEntry>,
    /// Why the match was forced to a draw, if it was.
    pub diagnostic: Option<String>,
    /// Dispatcher counters at the moment the outcome was decided.
    pub dispatch: DispatchStats,
}

impl MatchReport {
    /// Elapsed time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// The human-readable result line.
    pub fn result_line(&self) -> String {
        match self.outcome.winner_name() {
            None => format!(
                "Game Result: Game {} ended in a Draw! Took {} ms.",
                self.game_number,
                self.elapsed_ms()
            ),
            Some(name) => format!(
                "Game Result: Game {} ended in {} ms. {} has won!",
                self.game_number,
                self.elapsed_ms(),
                name
            ),
        }
    }
}

// ── Logging sink ─────────────────────────────────────────────────

/// Records each notification in the match log, then forwards it.
struct LoggingSink {
    dispatcher: CoalescingDispatcher,
    log: Arc<GameLog>,
}

impl NotificationSink for LoggingSink {
    fn notify(&self, notification: Notification) {
        if !self.dispatcher.is_closed() {
            self.log
                .push(LogEntry::new(notification.category(), notification.to_string()));
        }
        self.dispatcher.notify(notification);
    }
}

// ── MatchRunner ──────────────────────────────────────────────────

/// Runs games, one at a time, against a shared consumer scheduler.
pub struct MatchRunner {
    config: MatchConfig,
    scheduler: Arc<dyn FlushScheduler>,
}

impl MatchRunner {
    /// Create a runner. Fails if `config` is invalid.
    pub fn new(config: MatchConfig, scheduler: Arc<dyn FlushScheduler>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, scheduler })
    }

    /// The runner's configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Play `game` to exactly one outcome.
    ///
    /// Blocks for at most the configured budget. Game errors, panics and
    /// timeouts all become draws in the report; only a failure to spawn
    /// the worker thread is returned as an error.
    ///
    /// A worker still running past its deadline is detached. Its match
    /// dispatcher is closed once the outcome is decided, so anything the
    /// worker emits afterwards reaches neither the log nor the view.
    pub fn run(&self, game: Box<dyn Game>, game_number: u32) -> Result<MatchReport, ConfigError> {
        let match_id = MatchId::next();
        let game_name = game.name().to_owned();
        let mut state = MatchState::Created;

        let log = Arc::new(GameLog::new());
        let status = Arc::new(GameStatus::new());
        let cancel = CancelToken::new();
        let dispatcher = CoalescingDispatcher::with_options(
            Arc::clone(&self.scheduler),
            self.config.immediate_stack_notices,
        );
        let sink: Arc<dyn NotificationSink> = if self.config.record_notifications {
            Arc::new(LoggingSink {
                dispatcher: dispatcher.clone(),
                log: Arc::clone(&log),
            })
        } else {
            Arc::new(dispatcher.clone())
        };
        let ctx = GameContext::new(match_id, sink, Arc::clone(&log), status, cancel.clone());

        let guard = DeadlineGuard::new(self.config.time_budget)
            .with_thread_name(format!("duel-match-{}", match_id.get()));
        let worker_ctx = ctx.clone();
        state = state.advance(MatchState::Running);
        tracing::trace!(match_id = match_id.get(), game = %game_name, "match started");

        let report = guard.run_with_token(cancel, move |_| {
            let mut game = game;
            game.run(&worker_ctx)
        })?;

        let mut diagnostic = None;
        match report.outcome {
            Outcome::Completed(()) => {
                state = state.advance(MatchState::Completed);
                if ctx.force_draw(EndReason::Draw) {
                    let msg = format!("{game_name} stopped without reaching an outcome");
                    tracing::warn!(match_id = match_id.get(), "{msg}");
                    log.add(LogCategory::Information, msg.as_str());
                    diagnostic = Some(msg);
                }
            }
            Outcome::TimedOut => {
                state = state.advance(MatchState::TimedOut);
                if ctx.force_draw(EndReason::TimedOut) {
                    let msg = "Stopping slow match as draw".to_owned();
                    tracing::warn!(
                        match_id = match_id.get(),
                        budget_ms = self.config.time_budget.as_millis() as u64,
                        "{msg}"
                    );
                    log.add(LogCategory::Information, msg.as_str());
                    diagnostic = Some(msg);
                } else {
                    tracing::debug!(
                        match_id = match_id.get(),
                        "deadline fired after the game had concluded"
                    );
                }
            }
            Outcome::Failed(failure) => {
                state = state.advance(MatchState::Failed);
                let msg = format!("{game_name} failed: {failure}");
                tracing::error!(match_id = match_id.get(), "{msg}");
                log.add(LogCategory::Information, msg.as_str());
                if ctx.force_draw(EndReason::EngineFailure) {
                    diagnostic = Some(msg);
                }
            }
        }
        // The terminal notifications are absorbed; a lingering worker must
        // not reach the view once the next game starts.
        dispatcher.close();
        if let Some(straggler) = report.straggler {
            tracing::debug!(?straggler, "detaching worker past its deadline");
        }

        let outcome = match ctx.status().outcome() {
            Some(outcome) => outcome.clone(),
            // Unreachable: every branch above concludes an open game.
            None => GameOutcome::draw(EndReason::EngineFailure),
        };
        log.add(LogCategory::GameOutcome, outcome.to_string());
        log.add(
            LogCategory::MatchResults,
            match outcome.winner_name() {
                Some(name) => format!("Game {game_number}: {name} won"),
                None => format!("Game {game_number}: draw"),
            },
        );

        tracing::info!(
            match_id = match_id.get(),
            game = game_number,
            elapsed_ms = report.elapsed.as_millis() as u64,
            state = %state,
            outcome = %outcome,
            "match finished"
        );

        Ok(MatchReport {
            match_id,
            game_number,
            game_name,
            state,
            outcome,
            elapsed: report.elapsed,
            log: log.entries(self.config.log_mode),
            diagnostic,
            dispatch: dispatcher.stats(),
        })
    }
}

impl fmt::Debug for MatchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{GameError, LogMode, MatchView, PlayerId};
    use crate::view::InlineScheduler;

    struct Blank;
    impl MatchView for Blank {}

    struct Quick(Option<GameOutcome>);
    impl Game for Quick {
        fn name(&self) -> &str {
            "quick"
        }
        fn run(&mut self, ctx: &GameContext) -> Result<(), GameError> {
            if let Some(outcome) = self.0.take() {
                ctx.conclude(outcome);
            }
            Ok(())
        }
    }

    fn runner(config: MatchConfig) -> MatchRunner {
        MatchRunner::new(config, Arc::new(InlineScheduler::new(Blank))).unwrap()
    }

    #[test]
    fn natural_win_is_reported() {
        let r = runner(MatchConfig::default());
        let report = r
            .run(Box::new(Quick(Some(GameOutcome::win(PlayerId(1), "Ai(2)")))), 1)
            .unwrap();
        assert_eq!(report.state, MatchState::Completed);
        assert_eq!(report.outcome.winner(), Some(PlayerId(1)));
        assert!(report.diagnostic.is_none());
        assert!(report.result_line().starts_with("Game Result: Game 1 ended in "));
        assert!(report.result_line().ends_with("ms. Ai(2) has won!"));
    }

    #[test]
    fn game_without_outcome_becomes_draw() {
        let r = runner(MatchConfig::default());
        let report = r.run(Box::new(Quick(None)), 2).unwrap();
        assert_eq!(report.state, MatchState::Completed);
        assert!(report.outcome.is_draw());
        assert!(report.diagnostic.is_some());
        assert!(report.result_line().starts_with("Game Result: Game 2 ended in a Draw! Took "));
    }

    #[test]
    fn summary_mode_keeps_only_match_results() {
        let r = runner(MatchConfig {
            log_mode: LogMode::Summary,
            ..MatchConfig::default()
        });
        let report = r
            .run(Box::new(Quick(Some(GameOutcome::win(PlayerId(0), "A")))), 1)
            .unwrap();
        assert_eq!(report.log.len(), 1);
        assert_eq!(report.log[0].category, LogCategory::MatchResults);
        assert_eq!(report.log[0].message, "Game 1: A won");
    }

    #[test]
    fn full_mode_records_notifications() {
        let r = runner(MatchConfig::default());
        let report = r
            .run(Box::new(Quick(Some(GameOutcome::win(PlayerId(0), "A")))), 1)
            .unwrap();
        // GameOutcome + GameFinished notifications, then the runner's two entries.
        assert_eq!(report.log.len(), 4);
        assert_eq!(report.log[3].category, LogCategory::MatchResults);
    }

    #[test]
    fn unrecorded_notifications_skip_the_log() {
        let r = runner(MatchConfig {
            record_notifications: false,
            ..MatchConfig::default()
        });
        let report = r
            .run(Box::new(Quick(Some(GameOutcome::win(PlayerId(0), "A")))), 1)
            .unwrap();
        assert_eq!(report.log.len(), 2);
        assert_eq!(report.dispatch.notifications, 2);
    }

    #[test]
    fn logging_sink_stops_recording_once_closed() {
        let dispatcher = CoalescingDispatcher::new(Arc::new(InlineScheduler::new(Blank)));
        let log = Arc::new(GameLog::new());
        let sink = LoggingSink {
            dispatcher: dispatcher.clone(),
            log: Arc::clone(&log),
        };
        sink.notify(Notification::CombatChanged);
        dispatcher.close();
        sink.notify(Notification::CombatChanged);
        assert_eq!(log.len(), 1);
        assert_eq!(dispatcher.stats().dropped, 1);
    }

    #[test]
    fn invalid_config_rejected() {
        let result = MatchRunner::new(
            MatchConfig {
                time_budget: Duration::ZERO,
                ..MatchConfig::default()
            },
            Arc::new(InlineScheduler::new(Blank)),
        );
        assert!(matches!(result, Err(ConfigError::InvalidTimeBudget { .. })));
    }

    #[test]
    fn state_display_and_terminality() {
        assert!(!MatchState::Running.is_terminal());
        assert!(MatchState::TimedOut.is_terminal());
        assert_eq!(MatchState::TimedOut.to_string(), "timed out");
    }
}
