//! Mergeable accumulation buckets for pending view updates.
//!
//! Three bucket shapes cover every category of pending update:
//!
//! - [`SetBucket`]: a deduplicating set (cards to redraw, players to
//!   refresh). Duplicates collapse; first-insertion order is kept so that
//!   consumer calls are deterministic.
//! - [`LatestBucket`]: a single slot that each insert overwrites
//!   (current turn owner, latest phase save-state flag).
//! - [`FlagBucket`]: a "needs update" bit (combat, stack, field refresh).
//!
//! Each bucket has its own lock, so producers touching unrelated
//! categories never contend. Draining swaps the contents for empty inside
//! the same critical section: anything inserted afterwards belongs to the
//! next flush cycle.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use duel_core::{CardId, MatchView, Notification, PlayerId, PlayerZone, ViewError, ZoneKind};
use indexmap::IndexSet;
use parking_lot::Mutex;

// ── Bucket shapes ────────────────────────────────────────────────

/// Deduplicating set bucket.
#[derive(Debug)]
pub struct SetBucket<T> {
    items: Mutex<IndexSet<T>>,
}

impl<T: Eq + Hash> Default for SetBucket<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> SetBucket<T> {
    /// Create an empty bucket.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(IndexSet::new()),
        }
    }

    /// Insert one item. Returns `true` if it was not already pending.
    pub fn insert(&self, item: T) -> bool {
        self.items.lock().insert(item)
    }

    /// Insert every item under a single lock acquisition.
    ///
    /// Returns the number of items offered (not the number that were new).
    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) -> usize {
        let mut set = self.items.lock();
        let mut offered = 0;
        for item in items {
            set.insert(item);
            offered += 1;
        }
        offered
    }

    /// Take everything pending and leave the bucket empty.
    pub fn drain(&self) -> Vec<T> {
        let taken = std::mem::take(&mut *self.items.lock());
        taken.into_iter().collect()
    }

    /// Number of distinct pending items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

/// Single-slot, last-write-wins bucket.
#[derive(Debug)]
pub struct LatestBucket<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for LatestBucket<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestBucket<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Overwrite the slot. Returns the value it displaced, if any.
    pub fn set(&self, value: T) -> Option<T> {
        self.slot.lock().replace(value)
    }

    /// Take the latest value and reset the slot to empty.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Whether no value is pending.
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// "Needs update" bit.
#[derive(Debug, Default)]
pub struct FlagBucket {
    raised: AtomicBool,
}

impl FlagBucket {
    /// A lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Lower the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Whether the flag is raised.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

// ── BucketKind ───────────────────────────────────────────────────

/// The categories of pending update, in flush order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKind {
    /// Cards needing a visual redraw.
    Cards,
    /// Cards whose detail panes need a refresh.
    CardDetails,
    /// Players whose life/stat summary needs a refresh.
    Lives,
    /// Players whose shard (resource pool) count changed.
    Shards,
    /// Players whose mana pool changed.
    ManaPool,
    /// Latest turn owner.
    Turn,
    /// Latest phase (carries the save-state flag).
    Phase,
    /// Combat display.
    Combat,
    /// Stack display.
    Stack,
    /// Seat control display.
    PlayerControl,
    /// Player zones needing a redraw.
    Zones,
    /// Full battlefield re-layout.
    FieldRefresh,
    /// Exile reveal for the latest activating player.
    Exile,
    /// The game has an outcome.
    GameOver,
    /// The game is finished.
    GameFinished,
}

impl BucketKind {
    /// Every bucket, in the order a flush delivers them.
    ///
    /// Zone membership is applied before summary state that may
    /// reference it; terminal buckets come last.
    pub const FLUSH_ORDER: [BucketKind; 15] = [
        Self::Cards,
        Self::CardDetails,
        Self::Lives,
        Self::Shards,
        Self::ManaPool,
        Self::Turn,
        Self::Phase,
        Self::Combat,
        Self::Stack,
        Self::PlayerControl,
        Self::Zones,
        Self::FieldRefresh,
        Self::Exile,
        Self::GameOver,
        Self::GameFinished,
    ];

    /// Short name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Cards => "cards",
            Self::CardDetails => "card_details",
            Self::Lives => "lives",
            Self::Shards => "shards",
            Self::ManaPool => "mana_pool",
            Self::Turn => "turn",
            Self::Phase => "phase",
            Self::Combat => "combat",
            Self::Stack => "stack",
            Self::PlayerControl => "player_control",
            Self::Zones => "zones",
            Self::FieldRefresh => "field_refresh",
            Self::Exile => "exile",
            Self::GameOver => "game_over",
            Self::GameFinished => "game_finished",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened when one bucket was drained into the view.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing was pending; the view was not called.
    Empty,
    /// The view accepted a batch of `items` entries.
    Applied {
        /// Batch size (1 for slot and flag buckets).
        items: usize,
    },
    /// The view rejected the batch. The batch is not retried.
    Failed(ViewError),
}

// ── AccumulatorSet ───────────────────────────────────────────────

/// Every bucket a dispatcher owns.
#[derive(Debug, Default)]
pub struct AccumulatorSet {
    cards: SetBucket<CardId>,
    card_details: SetBucket<CardId>,
    lives: SetBucket<PlayerId>,
    shards: SetBucket<PlayerId>,
    mana_pool: SetBucket<PlayerId>,
    turn: LatestBucket<PlayerId>,
    /// Save-state flag of the latest phase change.
    phase: LatestBucket<bool>,
    combat: FlagBucket,
    stack: FlagBucket,
    player_control: FlagBucket,
    zones: SetBucket<PlayerZone>,
    field_refresh: FlagBucket,
    exile: LatestBucket<PlayerId>,
    game_over: FlagBucket,
    game_finished: FlagBucket,
}

impl AccumulatorSet {
    /// Create a set with every bucket empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a notification into the buckets it affects.
    ///
    /// Returns `true` if at least one bucket received data (and a flush
    /// is therefore needed), `false` for notifications with nothing to
    /// deliver (log-only kinds, empty card lists).
    pub fn absorb(&self, notification: &Notification) -> bool {
        match notification {
            Notification::CardTapped { card } => {
                self.field_refresh.raise();
                self.cards.insert(*card);
                true
            }
            Notification::CardChanged { card } => {
                self.cards.insert(*card);
                true
            }
            Notification::CardStatsChanged { cards } | Notification::CardsRegenerated { cards } => {
                self.field_refresh.raise();
                self.card_details.extend(cards.iter().copied());
                self.cards.extend(cards.iter().copied());
                true
            }
            Notification::AttackersDeclared { cards } | Notification::BlockersDeclared { cards } => {
                self.cards.extend(cards.iter().copied()) > 0
            }
            Notification::CombatChanged | Notification::PriorityPassed { .. } => {
                self.combat.raise();
                true
            }
            Notification::CombatEnded {
                attackers,
                blockers,
            } => {
                self.combat.raise();
                self.cards
                    .extend(attackers.iter().chain(blockers.iter()).copied());
                true
            }
            Notification::TurnBegan { player, .. } => {
                self.turn.set(*player);
                self.lives.insert(*player);
                true
            }
            Notification::PhaseChanged {
                player,
                dev_mode,
                refresh_battlefield,
                ..
            } => {
                self.phase.set(!dev_mode);
                if *refresh_battlefield {
                    self.zones
                        .insert(PlayerZone::new(*player, ZoneKind::Battlefield));
                }
                true
            }
            Notification::PlayerLifeChanged { player }
            | Notification::PlayerPoisoned { player }
            | Notification::PlayerCountersChanged { player }
            | Notification::ManaBurn { player } => {
                self.lives.insert(*player);
                true
            }
            Notification::PlayerDamaged { .. } => false,
            Notification::PlayerStatsChanged { players, cards } => {
                let players = self.lives.extend(players.iter().copied());
                let cards = self.card_details.extend(cards.iter().copied());
                players + cards > 0
            }
            Notification::ShardsChanged { player } => {
                self.shards.insert(*player);
                true
            }
            Notification::ManaPoolChanged { player } => {
                self.mana_pool.insert(*player);
                true
            }
            Notification::LandPlayed { player, card } => {
                self.lives.insert(*player);
                self.card_details.insert(*card);
                true
            }
            Notification::SpellCast { .. }
            | Notification::SpellResolved { .. }
            | Notification::SpellRemoved { .. } => {
                self.stack.raise();
                true
            }
            Notification::ZoneChanged { zone } => {
                self.zones.insert(*zone);
                true
            }
            Notification::CardMoved { from, to, .. } => {
                self.zones.extend(from.iter().chain(to.iter()).copied()) > 0
            }
            Notification::CardAttached { zones } => self.zones.extend(zones.iter().copied()) > 0,
            Notification::LibraryShuffled { player } => {
                self.zones
                    .insert(PlayerZone::new(*player, ZoneKind::Library));
                true
            }
            Notification::PlayerControlChanged { .. } => {
                self.player_control.raise();
                true
            }
            Notification::CardForetold { player } | Notification::CardPlotted { player } => {
                self.exile.set(*player);
                true
            }
            Notification::GameOutcome { .. } => {
                self.game_over.raise();
                true
            }
            Notification::GameFinished => {
                self.game_finished.raise();
                true
            }
        }
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
            && self.card_details.is_empty()
            && self.lives.is_empty()
            && self.shards.is_empty()
            && self.mana_pool.is_empty()
            && self.turn.is_empty()
            && self.phase.is_empty()
            && !self.combat.is_raised()
            && !self.stack.is_raised()
            && !self.player_control.is_raised()
            && self.zones.is_empty()
            && !self.field_refresh.is_raised()
            && self.exile.is_empty()
            && !self.game_over.is_raised()
            && !self.game_finished.is_raised()
    }

    /// Drain one bucket and hand its contents to the view.
    ///
    /// Empty buckets are skipped without calling the view. Must only be
    /// called from the consumer's execution context.
    pub fn deliver(&self, kind: BucketKind, view: &mut dyn MatchView) -> Delivery {
        match kind {
            BucketKind::Cards => apply_set(self.cards.drain(), |c| view.update_cards(c)),
            BucketKind::CardDetails => {
                apply_set(self.card_details.drain(), |c| view.refresh_card_details(c))
            }
            BucketKind::Lives => apply_set(self.lives.drain(), |p| view.update_lives(p)),
            BucketKind::Shards => apply_set(self.shards.drain(), |p| view.update_shards(p)),
            BucketKind::ManaPool => {
                apply_set(self.mana_pool.drain(), |p| view.update_mana_pool(p))
            }
            BucketKind::Turn => apply_slot(self.turn.take(), |p| view.update_turn(p)),
            BucketKind::Phase => apply_slot(self.phase.take(), |save| view.update_phase(save)),
            BucketKind::Combat => apply_flag(self.combat.take(), || view.show_combat()),
            BucketKind::Stack => apply_flag(self.stack.take(), || view.update_stack()),
            BucketKind::PlayerControl => {
                apply_flag(self.player_control.take(), || view.update_player_control())
            }
            BucketKind::Zones => apply_set(self.zones.drain(), |z| view.update_zones(z)),
            BucketKind::FieldRefresh => {
                apply_flag(self.field_refresh.take(), || view.refresh_field())
            }
            BucketKind::Exile => apply_slot(self.exile.take(), |p| view.open_exile(p)),
            BucketKind::GameOver => apply_flag(self.game_over.take(), || view.game_over()),
            BucketKind::GameFinished => apply_flag(self.game_finished.take(), || {
                // Unblock anything awaiting input before tearing down,
                // even if the view could not cancel cleanly.
                let cancelled = view.cancel_await_input();
                let finished = view.finish_game();
                cancelled.and(finished)
            }),
        }
    }
}

fn apply_set<T>(items: Vec<T>, apply: impl FnOnce(&[T]) -> duel_core::ViewResult) -> Delivery {
    if items.is_empty() {
        return Delivery::Empty;
    }
    match apply(&items) {
        Ok(()) => Delivery::Applied { items: items.len() },
        Err(e) => Delivery::Failed(e),
    }
}

fn apply_slot<T>(value: Option<T>, apply: impl FnOnce(T) -> duel_core::ViewResult) -> Delivery {
    match value {
        None => Delivery::Empty,
        Some(v) => match apply(v) {
            Ok(()) => Delivery::Applied { items: 1 },
            Err(e) => Delivery::Failed(e),
        },
    }
}

fn apply_flag(raised: bool, apply: impl FnOnce() -> duel_core::ViewResult) -> Delivery {
    if !raised {
        return Delivery::Empty;
    }
    match apply() {
        Ok(()) => Delivery::Applied { items: 1 },
        Err(e) => Delivery::Failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::{GameOutcome, Phase, ViewResult};
    use proptest::prelude::*;
    use smallvec::smallvec;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[derive(Default)]
    struct CallLog(Vec<String>);

    impl MatchView for CallLog {
        fn update_cards(&mut self, cards: &[CardId]) -> ViewResult {
            self.0.push(format!("cards {}", cards.len()));
            Ok(())
        }
        fn update_zones(&mut self, zones: &[PlayerZone]) -> ViewResult {
            self.0.push(format!("zones {}", zones.len()));
            Ok(())
        }
        fn update_phase(&mut self, save_state: bool) -> ViewResult {
            self.0.push(format!("phase {save_state}"));
            Ok(())
        }
        fn cancel_await_input(&mut self) -> ViewResult {
            self.0.push("cancel_await_input".into());
            Err(ViewError::Disconnected)
        }
        fn finish_game(&mut self) -> ViewResult {
            self.0.push("finish_game".into());
            Ok(())
        }
    }

    // ── Bucket shapes ────────────────────────────────────────────

    #[test]
    fn set_bucket_collapses_duplicates() {
        let b = SetBucket::new();
        assert!(b.insert(CardId(1)));
        assert!(!b.insert(CardId(1)));
        assert!(b.insert(CardId(2)));
        assert_eq!(b.len(), 2);
        assert_eq!(b.drain(), vec![CardId(1), CardId(2)]);
        assert!(b.is_empty());
    }

    #[test]
    fn latest_bucket_overwrites_and_resets() {
        let b = LatestBucket::new();
        assert_eq!(b.set(PlayerId(0)), None);
        assert_eq!(b.set(PlayerId(1)), Some(PlayerId(0)));
        assert_eq!(b.take(), Some(PlayerId(1)));
        assert_eq!(b.take(), None);
    }

    #[test]
    fn flag_bucket_take_lowers() {
        let f = FlagBucket::new();
        assert!(!f.take());
        f.raise();
        f.raise();
        assert!(f.is_raised());
        assert!(f.take());
        assert!(!f.take());
    }

    #[test]
    fn concurrent_inserts_all_land() {
        let b = Arc::new(SetBucket::new());
        let handles: Vec<_> = (0..8u32)
            .map(|t| {
                let b = Arc::clone(&b);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        b.insert(CardId(t * 1000 + i));
                        // Overlapping range shared by every thread.
                        b.insert(CardId(i % 50));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 8 * 500 distinct plus ids 0..50 (threads 0 already covers them).
        assert_eq!(b.len(), 8 * 500);
    }

    #[test]
    fn items_inserted_after_drain_belong_to_next_cycle() {
        let b = SetBucket::new();
        b.insert(CardId(1));
        let first = b.drain();
        b.insert(CardId(2));
        assert_eq!(first, vec![CardId(1)]);
        assert_eq!(b.drain(), vec![CardId(2)]);
    }

    // ── AccumulatorSet ───────────────────────────────────────────

    #[test]
    fn absorb_routes_to_expected_buckets() {
        let acc = AccumulatorSet::new();
        assert!(acc.absorb(&Notification::CardTapped { card: CardId(5) }));
        assert_eq!(acc.cards.len(), 1);
        assert!(acc.field_refresh.is_raised());

        assert!(acc.absorb(&Notification::TurnBegan {
            player: PlayerId(1),
            turn: 3
        }));
        assert!(!acc.turn.is_empty());
        assert_eq!(acc.lives.len(), 1);

        assert!(acc.absorb(&Notification::LibraryShuffled {
            player: PlayerId(0)
        }));
        assert_eq!(
            acc.zones.drain(),
            vec![PlayerZone::new(PlayerId(0), ZoneKind::Library)]
        );
    }

    #[test]
    fn log_only_and_empty_notifications_need_no_flush() {
        let acc = AccumulatorSet::new();
        assert!(!acc.absorb(&Notification::PlayerDamaged {
            player: PlayerId(0)
        }));
        assert!(!acc.absorb(&Notification::AttackersDeclared {
            cards: smallvec![]
        }));
        assert!(!acc.absorb(&Notification::CardMoved {
            card: CardId(1),
            from: None,
            to: None
        }));
        assert!(acc.is_empty());
    }

    #[test]
    fn phase_keeps_latest_save_state() {
        let acc = AccumulatorSet::new();
        let phase = |dev_mode| Notification::PhaseChanged {
            player: PlayerId(0),
            phase: Phase::Main1,
            dev_mode,
            refresh_battlefield: false,
        };
        acc.absorb(&phase(false));
        acc.absorb(&phase(true));
        let mut view = CallLog::default();
        assert_eq!(
            acc.deliver(BucketKind::Phase, &mut view),
            Delivery::Applied { items: 1 }
        );
        assert_eq!(view.0, vec!["phase false"]);
    }

    #[test]
    fn phase_with_refresh_marks_battlefield() {
        let acc = AccumulatorSet::new();
        acc.absorb(&Notification::PhaseChanged {
            player: PlayerId(1),
            phase: Phase::Upkeep,
            dev_mode: false,
            refresh_battlefield: true,
        });
        assert_eq!(
            acc.zones.drain(),
            vec![PlayerZone::new(PlayerId(1), ZoneKind::Battlefield)]
        );
    }

    #[test]
    fn empty_buckets_do_not_call_view() {
        let acc = AccumulatorSet::new();
        let mut view = CallLog::default();
        for kind in BucketKind::FLUSH_ORDER {
            assert_eq!(acc.deliver(kind, &mut view), Delivery::Empty);
        }
        assert!(view.0.is_empty());
    }

    #[test]
    fn game_finished_cancels_input_before_finishing() {
        let acc = AccumulatorSet::new();
        acc.absorb(&Notification::GameFinished);
        let mut view = CallLog::default();
        let delivery = acc.deliver(BucketKind::GameFinished, &mut view);
        assert_eq!(view.0, vec!["cancel_await_input", "finish_game"]);
        assert_eq!(delivery, Delivery::Failed(ViewError::Disconnected));
    }

    #[test]
    fn flush_order_is_complete_and_terminal_last() {
        let unique: HashSet<_> = BucketKind::FLUSH_ORDER.iter().collect();
        assert_eq!(unique.len(), BucketKind::FLUSH_ORDER.len());
        assert_eq!(BucketKind::FLUSH_ORDER[13], BucketKind::GameOver);
        assert_eq!(BucketKind::FLUSH_ORDER[14], BucketKind::GameFinished);
        let mut sorted = BucketKind::FLUSH_ORDER;
        sorted.sort();
        assert_eq!(sorted, BucketKind::FLUSH_ORDER);
    }

    #[test]
    fn outcome_raises_game_over() {
        let acc = AccumulatorSet::new();
        acc.absorb(&Notification::GameOutcome {
            outcome: GameOutcome::win(PlayerId(0), "A"),
        });
        assert!(acc.game_over.is_raised());
        assert!(!acc.game_finished.is_raised());
    }

    // ── Properties ───────────────────────────────────────────────

    proptest! {
        #[test]
        fn drain_returns_union_without_duplicates(
            batches in prop::collection::vec(prop::collection::vec(0u32..64, 0..32), 1..8)
        ) {
            let b = SetBucket::new();
            let mut expected = HashSet::new();
            for batch in &batches {
                b.extend(batch.iter().map(|&i| CardId(i)));
                expected.extend(batch.iter().map(|&i| CardId(i)));
            }
            let drained = b.drain();
            let as_set: HashSet<_> = drained.iter().copied().collect();
            prop_assert_eq!(drained.len(), as_set.len());
            prop_assert_eq!(as_set, expected);
            prop_assert!(b.is_empty());
        }

        #[test]
        fn latest_bucket_is_last_write_wins(values in prop::collection::vec(0u32..16, 1..32)) {
            let b = LatestBucket::new();
            for &v in &values {
                b.set(PlayerId(v));
            }
            prop_assert_eq!(b.take(), values.last().map(|&v| PlayerId(v)));
            prop_assert_eq!(b.take(), None);
        }
    }
}
