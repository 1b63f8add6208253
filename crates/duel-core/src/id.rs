//! Strongly-typed identifiers, zones and turn phases.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies a card (a game object) within one match.
///
/// IDs are assigned by the rules engine and are only meaningful for the
/// match that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for CardId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Identifies a player seat within one match.
///
/// `PlayerId(n)` is the n-th registered player (zero-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl From<u32> for PlayerId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Counter for unique [`MatchId`] allocation.
static MATCH_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-run identifier for one match execution.
///
/// Allocated from a monotonic atomic counter via [`MatchId::next`], so
/// two runs in the same process never share an ID even when they play
/// the same decks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(u64);

impl MatchId {
    /// Allocate a fresh, unique match ID. Thread-safe.
    pub fn next() -> Self {
        Self(MATCH_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A zone a card can occupy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneKind {
    /// Cards in play.
    Battlefield,
    /// A player's hand.
    Hand,
    /// A player's draw pile.
    Library,
    /// Discarded and destroyed cards.
    Graveyard,
    /// Exiled cards.
    Exile,
    /// Spells and abilities waiting to resolve.
    Stack,
    /// Command zone (commanders, emblems).
    Command,
    /// Cards set aside for the ante.
    Ante,
    /// Sideboard cards outside the game.
    Sideboard,
}

impl ZoneKind {
    /// Human-readable zone name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Battlefield => "Battlefield",
            Self::Hand => "Hand",
            Self::Library => "Library",
            Self::Graveyard => "Graveyard",
            Self::Exile => "Exile",
            Self::Stack => "Stack",
            Self::Command => "Command",
            Self::Ante => "Ante",
            Self::Sideboard => "Sideboard",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One player's zone: the unit of a zone redraw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerZone {
    /// Owner of the zone.
    pub player: PlayerId,
    /// Which of the player's zones.
    pub zone: ZoneKind,
}

impl PlayerZone {
    /// Pair a player with one of their zones.
    pub fn new(player: PlayerId, zone: ZoneKind) -> Self {
        Self { player, zone }
    }
}

impl fmt::Display for PlayerZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.player, self.zone)
    }
}

/// Steps of a turn, in turn order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Untap step.
    Untap,
    /// Upkeep step.
    Upkeep,
    /// Draw step.
    Draw,
    /// First main phase.
    Main1,
    /// Beginning of combat.
    CombatBegin,
    /// Declare attackers step.
    CombatDeclareAttackers,
    /// Declare blockers step.
    CombatDeclareBlockers,
    /// Combat damage step.
    CombatDamage,
    /// End of combat.
    CombatEnd,
    /// Second main phase.
    Main2,
    /// End step.
    EndOfTurn,
    /// Cleanup step.
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Untap => "untap",
            Self::Upkeep => "upkeep",
            Self::Draw => "draw",
            Self::Main1 => "main 1",
            Self::CombatBegin => "beginning of combat",
            Self::CombatDeclareAttackers => "declare attackers",
            Self::CombatDeclareBlockers => "declare blockers",
            Self::CombatDamage => "combat damage",
            Self::CombatEnd => "end of combat",
            Self::Main2 => "main 2",
            Self::EndOfTurn => "end of turn",
            Self::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_ids_are_unique() {
        let a = MatchId::next();
        let b = MatchId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn match_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| MatchId::next()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<MatchId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn player_zone_display() {
        let pz = PlayerZone::new(PlayerId(1), ZoneKind::Graveyard);
        assert_eq!(pz.to_string(), "P1:Graveyard");
    }
}
