//! Cross-thread game status and cooperative cancellation.
//!
//! [`GameStatus`] is the producer-side "is the match over" / "force a
//! draw" surface. It is shared between the thread running the game and
//! the coordinator, and its outcome slot is decided exactly once.
//! [`CancelToken`] carries the coordinator's stop request to the game.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::GameError;
use crate::outcome::{EndReason, GameOutcome};

/// Decide-once outcome slot for one game.
#[derive(Debug, Default)]
pub struct GameStatus {
    outcome: OnceLock<GameOutcome>,
}

// Compile-time assertion: GameStatus must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<GameStatus>();
};

impl GameStatus {
    /// A game that has not ended.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the game's outcome.
    ///
    /// Returns `true` if this call decided the outcome, `false` if an
    /// outcome was already recorded (the argument is discarded).
    pub fn conclude(&self, outcome: GameOutcome) -> bool {
        self.outcome.set(outcome).is_ok()
    }

    /// Force a draw unless the game is already over.
    ///
    /// Returns `true` if the draw was applied.
    pub fn force_draw(&self, reason: EndReason) -> bool {
        self.conclude(GameOutcome::draw(reason))
    }

    /// Whether an outcome has been recorded.
    pub fn is_over(&self) -> bool {
        self.outcome.get().is_some()
    }

    /// The recorded outcome, if any.
    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.get()
    }
}

/// Cooperative cancellation flag shared between a coordinator and a game.
///
/// Cancellation is a request: the game is expected to poll
/// [`is_cancelled`](CancelToken::is_cancelled) (or `?` on
/// [`check`](CancelToken::check)) at convenient points, but nothing
/// forces it to stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(GameError::Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), GameError> {
        if self.is_cancelled() {
            Err(GameError::Cancelled)
        } else {
            Ok(())
        }
    }
}
