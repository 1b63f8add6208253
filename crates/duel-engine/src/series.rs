//! Multi-game series.
//!
//! A [`MatchSeries`] plays games one after another through a
//! [`MatchRunner`], either a fixed number of them or best-of-`k` until
//! someone holds a majority. A game that fails or times out is a draw
//! and the series carries on.

use std::sync::Arc;

use indexmap::IndexMap;

use duel_core::Game;

use crate::config::{ConfigError, SeriesConfig};
use crate::dispatcher::FlushScheduler;
use crate::runner::{MatchReport, MatchRunner};

/// Results of a finished series.
#[derive(Clone, Debug, Default)]
pub struct SeriesReport {
    /// One report per game, in play order.
    pub reports: Vec<MatchReport>,
    /// Wins per player name, in order of first win.
    pub wins: IndexMap<String, u32>,
    /// Games that ended in a draw (including forced draws).
    pub draws: u32,
    /// Wins needed to take the series, for best-of series.
    pub wins_needed: Option<u32>,
}

impl SeriesReport {
    /// Number of games played.
    pub fn games_played(&self) -> usize {
        self.reports.len()
    }

    /// Wins recorded for `name`.
    pub fn wins_for(&self, name: &str) -> u32 {
        self.wins.get(name).copied().unwrap_or(0)
    }

    /// The series winner.
    ///
    /// For a best-of series, the player who reached the majority. For a
    /// fixed count, the player with strictly the most wins.
    pub fn winner(&self) -> Option<&str> {
        match self.wins_needed {
            Some(needed) => self
                .wins
                .iter()
                .find(|&(_, &w)| w >= needed)
                .map(|(name, _)| name.as_str()),
            None => {
                let best = self.wins.values().copied().max()?;
                let mut leaders = self.wins.iter().filter(|&(_, &w)| w == best);
                let (name, _) = leaders.next()?;
                leaders.next().is_none().then_some(name.as_str())
            }
        }
    }

    /// Whether a best-of series ended with a majority winner.
    pub fn is_decided(&self) -> bool {
        self.wins_needed.is_some() && self.winner().is_some()
    }

    fn record(&mut self, report: MatchReport) {
        match report.outcome.winner_name() {
            Some(name) => *self.wins.entry(name.to_owned()).or_insert(0) += 1,
            None => self.draws += 1,
        }
        self.reports.push(report);
    }

    fn leader_wins(&self) -> u32 {
        self.wins.values().copied().max().unwrap_or(0)
    }
}

/// Plays a sequence of games.
#[derive(Debug)]
pub struct MatchSeries {
    config: SeriesConfig,
    runner: MatchRunner,
}

impl MatchSeries {
    /// Create a series whose games post view updates through `scheduler`.
    pub fn new(config: SeriesConfig, scheduler: Arc<dyn FlushScheduler>) -> Result<Self, ConfigError> {
        config.validate()?;
        let runner = MatchRunner::new(config.match_config.clone(), scheduler)?;
        Ok(Self { config, runner })
    }

    /// The series configuration.
    pub fn config(&self) -> &SeriesConfig {
        &self.config
    }

    /// Play the series. `new_game` receives the 1-based game number.
    ///
    /// Stops early only on a thread spawn failure.
    pub fn run<F>(&self, mut new_game: F) -> Result<SeriesReport, ConfigError>
    where
        F: FnMut(u32) -> Box<dyn Game>,
    {
        let wins_needed = self.config.wins_needed();
        let limit = match wins_needed {
            Some(_) => self.config.max_games,
            None => self.config.games,
        };
        let mut series = SeriesReport {
            wins_needed,
            ..SeriesReport::default()
        };

        for game_number in 1..=limit {
            let report = self.runner.run(new_game(game_number), game_number)?;
            series.record(report);
            if wins_needed.is_some_and(|needed| series.leader_wins() >= needed) {
                break;
            }
        }

        tracing::info!(
            games = series.games_played(),
            draws = series.draws,
            winner = series.winner().unwrap_or("none"),
            "series finished"
        );
        Ok(series)
    }
}
