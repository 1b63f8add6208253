//! Match and series configuration, validation, and error types.

use std::time::{Duration, Instant};

use duel_core::LogMode;
use thiserror::Error;

/// Default wall-clock budget for one game.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(120);

/// Default safety cap on games played by a best-of series.
pub const DEFAULT_MAX_GAMES: u32 = 16;

// ── MatchConfig ────────────────────────────────────────────────────

/// Configuration for running a single game.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Wall-clock budget after which the game is stopped as a draw.
    /// Default: 120 s.
    pub time_budget: Duration,
    /// Which log entries the report carries. Default: [`LogMode::Full`].
    pub log_mode: LogMode,
    /// Record every notification in the match log. Default: `true`.
    pub record_notifications: bool,
    /// Send stack additions/removals to the view immediately in addition
    /// to the coalesced stack refresh. Default: `false`.
    pub immediate_stack_notices: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_TIME_BUDGET,
            log_mode: LogMode::Full,
            record_notifications: true,
            immediate_stack_notices: false,
        }
    }
}

impl MatchConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_budget.is_zero() || Instant::now().checked_add(self.time_budget).is_none() {
            return Err(ConfigError::InvalidTimeBudget {
                value: self.time_budget,
            });
        }
        Ok(())
    }
}

// ── SeriesConfig ───────────────────────────────────────────────────

/// Configuration for a sequence of games.
#[derive(Clone, Debug)]
pub struct SeriesConfig {
    /// Number of games to play when `games_per_match` is `None`. Default: 1.
    pub games: u32,
    /// Best-of-`k`: keep playing until someone has won `k / 2 + 1` games.
    pub games_per_match: Option<u32>,
    /// Upper bound on games played in best-of mode, since draws do not
    /// advance anyone. Default: 16.
    pub max_games: u32,
    /// Per-game settings.
    pub match_config: MatchConfig,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            games: 1,
            games_per_match: None,
            max_games: DEFAULT_MAX_GAMES,
            match_config: MatchConfig::default(),
        }
    }
}

impl SeriesConfig {
    /// Wins needed to take the series, or `None` for a fixed game count.
    pub fn wins_needed(&self) -> Option<u32> {
        self.games_per_match.map(|k| k / 2 + 1)
    }

    /// Check structural invariants, including the nested match config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.games_per_match {
            Some(0) => return Err(ConfigError::ZeroGamesPerMatch),
            Some(_) => {
                let needed = self.wins_needed().unwrap_or(1);
                if self.max_games < needed {
                    return Err(ConfigError::MaxGamesTooSmall {
                        max_games: self.max_games,
                        needed,
                    });
                }
            }
            None if self.games == 0 => return Err(ConfigError::ZeroGames),
            None => {}
        }
        self.match_config.validate()
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during validation or while setting up threads.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Time budget is zero or too large to schedule a deadline for.
    #[error("time budget must be positive and representable, got {value:?}")]
    InvalidTimeBudget {
        /// The rejected budget.
        value: Duration,
    },
    /// A fixed-count series with no games.
    #[error("games must be at least 1")]
    ZeroGames,
    /// A best-of series of zero games.
    #[error("games_per_match must be at least 1")]
    ZeroGamesPerMatch,
    /// The cap is below the wins needed to decide the series.
    #[error("max_games {max_games} is below the {needed} wins needed to decide the series")]
    MaxGamesTooSmall {
        /// The configured cap.
        max_games: u32,
        /// Wins needed to take the series.
        needed: u32,
    },
    /// A worker or view thread could not be spawned.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// The OS error, stringified.
        reason: String,
    },
}
