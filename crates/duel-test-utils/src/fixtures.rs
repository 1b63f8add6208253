//! Reusable game fixtures.
//!
//! - [`ScriptedGame`]: emits a fixed notification script, then concludes.
//! - [`SleepyGame`]: holds the match open, optionally ignoring cancellation.
//! - [`LingeringGame`]: wins at once, then keeps running past its budget.
//! - [`FailingGame`]: returns a rules error immediately.
//! - [`PanickingGame`]: panics immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use duel_core::{CardId, Game, GameContext, GameError, GameOutcome, Notification, PlayerId};

/// Emits `script` in order, then concludes with `outcome` (if any).
pub struct ScriptedGame {
    pub name: String,
    pub script: Vec<Notification>,
    pub outcome: Option<GameOutcome>,
}

impl ScriptedGame {
    pub fn new(name: impl Into<String>, script: Vec<Notification>) -> Self {
        Self {
            name: name.into(),
            script,
            outcome: None,
        }
    }

    /// Conclude with a win for `player` named `winner`.
    pub fn won_by(mut self, player: u32, winner: impl Into<String>) -> Self {
        self.outcome = Some(GameOutcome::win(PlayerId(player), winner));
        self
    }
}

impl Game for ScriptedGame {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &GameContext) -> Result<(), GameError> {
        for notification in self.script.drain(..) {
            ctx.check_cancelled()?;
            ctx.notify(notification);
        }
        if let Some(outcome) = self.outcome.take() {
            ctx.conclude(outcome);
        }
        Ok(())
    }
}

/// Holds the match open for `hold`, then claims a win for player 0.
///
/// A cooperative game polls its cancellation token and stops early; an
/// uncooperative one sleeps the whole time. `finished` flips once the
/// worker is done, so tests can observe a straggler.
pub struct SleepyGame {
    pub hold: Duration,
    pub cooperative: bool,
    pub finished: Arc<AtomicBool>,
}

impl SleepyGame {
    pub fn new(hold: Duration, cooperative: bool) -> Self {
        Self {
            hold,
            cooperative,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Game for SleepyGame {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn run(&mut self, ctx: &GameContext) -> Result<(), GameError> {
        let result = if self.cooperative {
            let until = Instant::now() + self.hold;
            loop {
                if let Err(e) = ctx.check_cancelled() {
                    break Err(e);
                }
                if Instant::now() >= until {
                    break Ok(());
                }
                thread::sleep(Duration::from_millis(1));
            }
        } else {
            thread::sleep(self.hold);
            Ok(())
        };
        if result.is_ok() {
            // Too late if the runner already forced a draw.
            ctx.conclude(GameOutcome::win(PlayerId(0), "sleepy"));
        }
        self.finished.store(true, Ordering::Release);
        result
    }
}

/// Concludes with a win for player 0 straight away, then ignores
/// cancellation: sleeps for `linger`, emits one last
/// [`Notification::CardChanged`] for `late_card`, and flips `finished`.
pub struct LingeringGame {
    pub linger: Duration,
    pub late_card: CardId,
    pub finished: Arc<AtomicBool>,
}

impl LingeringGame {
    pub fn new(linger: Duration) -> Self {
        Self {
            linger,
            late_card: CardId(999),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Game for LingeringGame {
    fn name(&self) -> &str {
        "lingering"
    }

    fn run(&mut self, ctx: &GameContext) -> Result<(), GameError> {
        ctx.conclude(GameOutcome::win(PlayerId(0), "Ai(1)"));
        thread::sleep(self.linger);
        ctx.notify(Notification::CardChanged {
            card: self.late_card,
        });
        self.finished.store(true, Ordering::Release);
        Ok(())
    }
}

/// Fails with a rules error before doing anything.
pub struct FailingGame {
    pub reason: String,
}

impl FailingGame {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Game for FailingGame {
    fn name(&self) -> &str {
        "failing"
    }

    fn run(&mut self, _ctx: &GameContext) -> Result<(), GameError> {
        Err(GameError::rules(self.reason.clone()))
    }
}

/// Panics before doing anything.
pub struct PanickingGame;

impl Game for PanickingGame {
    fn name(&self) -> &str {
        "panicking"
    }

    fn run(&mut self, _ctx: &GameContext) -> Result<(), GameError> {
        panic!("rules engine invariant violated")
    }
}
