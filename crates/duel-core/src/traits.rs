//! Seam traits between the rules engine, the coordinator and the view.
//!
//! - [`Game`] is implemented by a rules engine (the producer).
//! - [`NotificationSink`] is where a game sends its [`Notification`]s.
//! - [`MatchView`] is implemented by the presentation layer (the
//!   consumer) and is only ever called from its own serialized context.

use std::sync::Arc;

use crate::error::{GameError, ViewError};
use crate::id::{CardId, MatchId, PlayerId, PlayerZone};
use crate::log::GameLog;
use crate::notification::{Notification, StackNotice};
use crate::outcome::{EndReason, GameOutcome};
use crate::status::{CancelToken, GameStatus};

/// Receives notifications from any producer thread.
///
/// Implementations must not block beyond a short critical section.
pub trait NotificationSink: Send + Sync {
    /// Accept one notification. Ownership moves to the sink.
    fn notify(&self, notification: Notification);
}

/// Result of a consumer batch-apply operation.
pub type ViewResult = Result<(), ViewError>;

/// Batch-apply operations of a presentation layer.
///
/// Every method receives the coalesced contents of one bucket for one
/// flush cycle. Defaults are no-ops so that a headless view only
/// implements what it renders.
pub trait MatchView {
    /// Redraw these cards.
    fn update_cards(&mut self, _cards: &[CardId]) -> ViewResult {
        Ok(())
    }

    /// Refresh the detail panes (rules text, stats) of these cards.
    fn refresh_card_details(&mut self, _cards: &[CardId]) -> ViewResult {
        Ok(())
    }

    /// Refresh life, poison and counter summaries of these players.
    fn update_lives(&mut self, _players: &[PlayerId]) -> ViewResult {
        Ok(())
    }

    /// Refresh shard counts of these players.
    fn update_shards(&mut self, _players: &[PlayerId]) -> ViewResult {
        Ok(())
    }

    /// Refresh mana pools of these players.
    fn update_mana_pool(&mut self, _players: &[PlayerId]) -> ViewResult {
        Ok(())
    }

    /// Show `player` as the turn owner.
    fn update_turn(&mut self, _player: PlayerId) -> ViewResult {
        Ok(())
    }

    /// Refresh the phase indicator. `save_state` is false for
    /// developer-driven phase changes that must not be persisted.
    fn update_phase(&mut self, _save_state: bool) -> ViewResult {
        Ok(())
    }

    /// Redraw combat assignments.
    fn show_combat(&mut self) -> ViewResult {
        Ok(())
    }

    /// Redraw the stack.
    fn update_stack(&mut self) -> ViewResult {
        Ok(())
    }

    /// Refresh which seats are controlled by whom.
    fn update_player_control(&mut self) -> ViewResult {
        Ok(())
    }

    /// Redraw these player zones.
    fn update_zones(&mut self, _zones: &[PlayerZone]) -> ViewResult {
        Ok(())
    }

    /// Re-layout every player's battlefield.
    fn refresh_field(&mut self) -> ViewResult {
        Ok(())
    }

    /// Reveal the exile zone to `player`, who just used a card from it.
    fn open_exile(&mut self, _player: PlayerId) -> ViewResult {
        Ok(())
    }

    /// The game has an outcome: release anything waiting for input.
    fn game_over(&mut self) -> ViewResult {
        Ok(())
    }

    /// Drop any pending "waiting for input" state.
    fn cancel_await_input(&mut self) -> ViewResult {
        Ok(())
    }

    /// Tear down the game display.
    fn finish_game(&mut self) -> ViewResult {
        Ok(())
    }

    /// Immediate, non-coalesced stack animation hook.
    fn notify_stack(&mut self, _notice: StackNotice) -> ViewResult {
        Ok(())
    }
}

/// Everything a running game may touch.
///
/// Cheap to clone: every field is shared. The coordinator keeps its own
/// clone so it can force an outcome from another thread.
#[derive(Clone)]
pub struct GameContext {
    match_id: MatchId,
    sink: Arc<dyn NotificationSink>,
    log: Arc<GameLog>,
    status: Arc<GameStatus>,
    cancel: CancelToken,
}

impl GameContext {
    /// Assemble a context from its parts.
    pub fn new(
        match_id: MatchId,
        sink: Arc<dyn NotificationSink>,
        log: Arc<GameLog>,
        status: Arc<GameStatus>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            match_id,
            sink,
            log,
            status,
            cancel,
        }
    }

    /// ID of the match this context belongs to.
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Emit a notification.
    pub fn notify(&self, notification: Notification) {
        self.sink.notify(notification);
    }

    /// The match log.
    pub fn log(&self) -> &GameLog {
        &self.log
    }

    /// The decide-once outcome slot.
    pub fn status(&self) -> &GameStatus {
        &self.status
    }

    /// The cancellation token for this run.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// `Err(GameError::Cancelled)` once the coordinator asked the game to stop.
    pub fn check_cancelled(&self) -> Result<(), GameError> {
        self.cancel.check()
    }

    /// Record `outcome` and, if it decided the game, emit the terminal
    /// [`Notification::GameOutcome`] and [`Notification::GameFinished`].
    ///
    /// Returns `false` (and emits nothing) if the game was already over.
    pub fn conclude(&self, outcome: GameOutcome) -> bool {
        if !self.status.conclude(outcome.clone()) {
            return false;
        }
        self.notify(Notification::GameOutcome { outcome });
        self.notify(Notification::GameFinished);
        true
    }

    /// Force a draw unless the game is already over, emitting the same
    /// terminal notifications as [`conclude`](Self::conclude).
    ///
    /// Returns `true` if the draw was applied.
    pub fn force_draw(&self, reason: EndReason) -> bool {
        if !self.status.force_draw(reason) {
            return false;
        }
        if let Some(outcome) = self.status.outcome() {
            self.notify(Notification::GameOutcome {
                outcome: outcome.clone(),
            });
        }
        self.notify(Notification::GameFinished);
        true
    }
}

impl std::fmt::Debug for GameContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("match_id", &self.match_id)
            .field("log_entries", &self.log.len())
            .field("status", &self.status)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// A rules engine able to play one game to completion.
///
/// `run` executes on a worker thread. It should emit notifications through
/// the context as the game progresses, call [`GameContext::conclude`] when
/// the game reaches a natural end, and poll the cancellation token often
/// enough to stop promptly once asked.
pub trait Game: Send {
    /// Display name used in logs and reports.
    fn name(&self) -> &str;

    /// Play the game.
    fn run(&mut self, ctx: &GameContext) -> Result<(), GameError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct VecSink(Mutex<Vec<Notification>>);

    impl NotificationSink for VecSink {
        fn notify(&self, notification: Notification) {
            self.0.lock().push(notification);
        }
    }

    fn context(sink: Arc<VecSink>) -> GameContext {
        GameContext::new(
            MatchId::next(),
            sink,
            Arc::new(GameLog::new()),
            Arc::new(GameStatus::new()),
            CancelToken::new(),
        )
    }

    #[test]
    fn conclude_emits_terminal_notifications_once() {
        let sink = Arc::new(VecSink::default());
        let ctx = context(Arc::clone(&sink));

        assert!(ctx.conclude(GameOutcome::win(PlayerId(0), "A")));
        assert!(!ctx.conclude(GameOutcome::draw(EndReason::TimedOut)));

        let seen = sink.0.lock();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], Notification::GameOutcome { .. }));
        assert_eq!(seen[1], Notification::GameFinished);
    }

    #[test]
    fn clones_share_status_and_cancellation() {
        let sink = Arc::new(VecSink::default());
        let ctx = context(sink);
        let coordinator = ctx.clone();

        coordinator.cancel_token().cancel();
        assert_eq!(ctx.check_cancelled(), Err(GameError::Cancelled));

        coordinator.status().force_draw(EndReason::TimedOut);
        assert!(ctx.status().is_over());
    }

    #[test]
    fn force_draw_only_applies_to_an_open_game() {
        let sink = Arc::new(VecSink::default());
        let ctx = context(Arc::clone(&sink));

        assert!(ctx.force_draw(EndReason::TimedOut));
        assert!(!ctx.force_draw(EndReason::EngineFailure));
        assert!(!ctx.conclude(GameOutcome::win(PlayerId(1), "B")));

        assert_eq!(
            ctx.status().outcome(),
            Some(&GameOutcome::draw(EndReason::TimedOut))
        );
        let seen = sink.0.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], Notification::GameFinished);
    }

    #[test]
    fn default_view_methods_are_no_ops() {
        struct Blank;
        impl MatchView for Blank {}
        let mut v = Blank;
        assert!(v.update_cards(&[crate::id::CardId(1)]).is_ok());
        assert!(v.finish_game().is_ok());
    }
}
