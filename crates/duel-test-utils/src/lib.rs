//! Test utilities and mock consumers for Duel development.
//!
//! Provides a [`RecordingView`] that logs every batch-apply call, a
//! [`ManualScheduler`] that parks jobs until the test runs them, and
//! (in [`fixtures`]) a set of canned [`Game`](duel_core::Game)
//! implementations for exercising the match runner.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashSet;
use std::sync::Arc;

use duel_core::{
    CardId, MatchView, PlayerId, PlayerZone, StackNotice, ViewError, ViewResult,
};
use duel_engine::{FlushReport, FlushScheduler, JobOutcome, ViewJob};
use parking_lot::Mutex;

/// One batch-apply call observed by a [`RecordingView`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewCall {
    Cards(Vec<CardId>),
    CardDetails(Vec<CardId>),
    Lives(Vec<PlayerId>),
    Shards(Vec<PlayerId>),
    ManaPool(Vec<PlayerId>),
    Turn(PlayerId),
    Phase { save_state: bool },
    Combat,
    Stack,
    PlayerControl,
    Zones(Vec<PlayerZone>),
    FieldRefresh,
    Exile(PlayerId),
    GameOver,
    CancelAwaitInput,
    FinishGame,
    Notice(StackNotice),
}

impl ViewCall {
    /// Short tag for order assertions.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cards(_) => "cards",
            Self::CardDetails(_) => "card_details",
            Self::Lives(_) => "lives",
            Self::Shards(_) => "shards",
            Self::ManaPool(_) => "mana_pool",
            Self::Turn(_) => "turn",
            Self::Phase { .. } => "phase",
            Self::Combat => "combat",
            Self::Stack => "stack",
            Self::PlayerControl => "player_control",
            Self::Zones(_) => "zones",
            Self::FieldRefresh => "field_refresh",
            Self::Exile(_) => "exile",
            Self::GameOver => "game_over",
            Self::CancelAwaitInput => "cancel_await_input",
            Self::FinishGame => "finish_game",
            Self::Notice(_) => "notice",
        }
    }
}

/// A view that records every call it receives.
///
/// Clones share the same call log, so a test can keep one clone while
/// another is moved onto a view thread.
#[derive(Clone, Default)]
pub struct RecordingView {
    calls: Arc<Mutex<Vec<ViewCall>>>,
    failing: Arc<Mutex<HashSet<&'static str>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call with this tag fail with [`ViewError::Rejected`].
    /// The call is still recorded.
    pub fn fail_on(&self, tag: &'static str) {
        self.failing.lock().insert(tag);
    }

    /// Copy of the calls so far.
    pub fn calls(&self) -> Vec<ViewCall> {
        self.calls.lock().clone()
    }

    /// Tags of the calls so far.
    pub fn tags(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(ViewCall::tag).collect()
    }

    /// Take and clear the call log.
    pub fn take(&self) -> Vec<ViewCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    /// Total number of card ids delivered through `update_cards`.
    pub fn cards_delivered(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .map(|c| match c {
                ViewCall::Cards(cards) => cards.len(),
                _ => 0,
            })
            .sum()
    }

    fn record(&self, call: ViewCall) -> ViewResult {
        let tag = call.tag();
        self.calls.lock().push(call);
        if self.failing.lock().contains(tag) {
            return Err(ViewError::Rejected {
                bucket: tag,
                reason: "configured to fail".into(),
            });
        }
        Ok(())
    }
}

impl MatchView for RecordingView {
    fn update_cards(&mut self, cards: &[CardId]) -> ViewResult {
        self.record(ViewCall::Cards(cards.to_vec()))
    }
    fn refresh_card_details(&mut self, cards: &[CardId]) -> ViewResult {
        self.record(ViewCall::CardDetails(cards.to_vec()))
    }
    fn update_lives(&mut self, players: &[PlayerId]) -> ViewResult {
        self.record(ViewCall::Lives(players.to_vec()))
    }
    fn update_shards(&mut self, players: &[PlayerId]) -> ViewResult {
        self.record(ViewCall::Shards(players.to_vec()))
    }
    fn update_mana_pool(&mut self, players: &[PlayerId]) -> ViewResult {
        self.record(ViewCall::ManaPool(players.to_vec()))
    }
    fn update_turn(&mut self, player: PlayerId) -> ViewResult {
        self.record(ViewCall::Turn(player))
    }
    fn update_phase(&mut self, save_state: bool) -> ViewResult {
        self.record(ViewCall::Phase { save_state })
    }
    fn show_combat(&mut self) -> ViewResult {
        self.record(ViewCall::Combat)
    }
    fn update_stack(&mut self) -> ViewResult {
        self.record(ViewCall::Stack)
    }
    fn update_player_control(&mut self) -> ViewResult {
        self.record(ViewCall::PlayerControl)
    }
    fn update_zones(&mut self, zones: &[PlayerZone]) -> ViewResult {
        self.record(ViewCall::Zones(zones.to_vec()))
    }
    fn refresh_field(&mut self) -> ViewResult {
        self.record(ViewCall::FieldRefresh)
    }
    fn open_exile(&mut self, player: PlayerId) -> ViewResult {
        self.record(ViewCall::Exile(player))
    }
    fn game_over(&mut self) -> ViewResult {
        self.record(ViewCall::GameOver)
    }
    fn cancel_await_input(&mut self) -> ViewResult {
        self.record(ViewCall::CancelAwaitInput)
    }
    fn finish_game(&mut self) -> ViewResult {
        self.record(ViewCall::FinishGame)
    }
    fn notify_stack(&mut self, notice: StackNotice) -> ViewResult {
        self.record(ViewCall::Notice(notice))
    }
}

/// Parks scheduled jobs until the test runs them.
#[derive(Default)]
pub struct ManualScheduler {
    jobs: Mutex<Vec<ViewJob>>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of parked jobs.
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Run every parked job, in scheduling order, returning flush reports.
    ///
    /// Jobs scheduled while running are left for the next call.
    pub fn run_all(&self, view: &mut dyn MatchView) -> Vec<FlushReport> {
        let jobs = std::mem::take(&mut *self.jobs.lock());
        jobs.into_iter()
            .filter_map(|job| match job.run(view) {
                JobOutcome::Flushed(report) => Some(report),
                JobOutcome::Notice(_) => None,
            })
            .collect()
    }
}

impl FlushScheduler for ManualScheduler {
    fn schedule(&self, job: ViewJob) {
        self.jobs.lock().push(job);
    }
}
