//! Headless best-of-three series example.
//!
//! Demonstrates: view thread → series config → seeded simulated duels →
//! per-game result lines and logs → series winner. One game is
//! deliberately slowed past its budget to show the forced draw.
//!
//! Set `RUST_LOG=duel_engine=debug` for coordinator diagnostics.

use std::time::Duration;

use duel_bench::{CountingView, SimulatedDuel};
use duel_core::{Game, LogMode};
use duel_engine::{MatchConfig, MatchSeries, SeriesConfig, ViewThread};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Duel Headless Series Example ===\n");

    let mut view_thread = ViewThread::spawn(CountingView::default()).unwrap();
    let config = SeriesConfig {
        games_per_match: Some(3),
        max_games: 5,
        match_config: MatchConfig {
            time_budget: Duration::from_millis(250),
            log_mode: LogMode::Full,
            ..MatchConfig::default()
        },
        ..SeriesConfig::default()
    };
    let series = MatchSeries::new(config, view_thread.handle()).unwrap();

    let report = series
        .run(|game_number| -> Box<dyn Game> {
            let duel = SimulatedDuel::new(u64::from(game_number) * 31);
            if game_number == 2 {
                // Thinks too long: stopped as a draw at the budget.
                Box::new(duel.with_step_delay(Duration::from_millis(20)))
            } else {
                Box::new(duel)
            }
        })
        .unwrap();

    for game in &report.reports {
        println!("--- {} ({}) ---", game.game_name, game.state);
        let shown = game.log.len().min(6);
        for entry in &game.log[game.log.len() - shown..] {
            println!("  {entry}");
        }
        println!("{}", game.result_line());
        println!(
            "  dispatch: {} notifications, {} flushes\n",
            game.dispatch.notifications, game.dispatch.flushes
        );
    }

    println!(
        "Series: {} games, {} draws, winner: {}",
        report.games_played(),
        report.draws,
        report.winner().unwrap_or("none")
    );

    view_thread.sync();
    let stopped = view_thread.shutdown();
    if let Some(view) = view_thread.into_view() {
        println!(
            "View: {} batches, {} items, {} jobs",
            view.batches, view.items, stopped.jobs_run
        );
    }
}
