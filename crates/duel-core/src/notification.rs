//! The closed set of change notifications a rules engine emits.
//!
//! Each variant carries only the identifying payload a presentation layer
//! needs to find what changed; the view re-reads the current state itself.
//! Notifications are immutable once emitted and are moved into the sink.

use std::fmt;

use smallvec::SmallVec;

use crate::id::{CardId, Phase, PlayerId, PlayerZone};
use crate::log::LogCategory;
use crate::outcome::GameOutcome;

/// A short list of cards, inline up to four entries.
pub type CardList = SmallVec<[CardId; 4]>;

/// A change observed by the rules engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A card was tapped or untapped.
    CardTapped {
        /// The card.
        card: CardId,
    },
    /// A card's visible state changed (phased, damaged, counters).
    CardChanged {
        /// The card.
        card: CardId,
    },
    /// Power, toughness or other characteristics of cards changed.
    CardStatsChanged {
        /// The affected cards.
        cards: CardList,
    },
    /// Cards regenerated.
    CardsRegenerated {
        /// The affected cards.
        cards: CardList,
    },
    /// Attackers were declared.
    AttackersDeclared {
        /// The attacking cards.
        cards: CardList,
    },
    /// Blockers were declared.
    BlockersDeclared {
        /// The blocking cards.
        cards: CardList,
    },
    /// Combat assignments changed.
    CombatChanged,
    /// A player received priority.
    PriorityPassed {
        /// The player holding priority.
        player: PlayerId,
    },
    /// Combat ended; attackers and blockers lose their combat markers.
    CombatEnded {
        /// Cards that attacked.
        attackers: CardList,
        /// Cards that blocked.
        blockers: CardList,
    },
    /// A new turn began.
    TurnBegan {
        /// The player whose turn it is.
        player: PlayerId,
        /// Turn number, starting at 1.
        turn: u32,
    },
    /// The turn moved to another phase.
    PhaseChanged {
        /// The active player.
        player: PlayerId,
        /// The new phase.
        phase: Phase,
        /// The phase change came from a developer tool, not normal play.
        dev_mode: bool,
        /// The active player's battlefield needs a redraw (tokens or
        /// stacked creatures are present).
        refresh_battlefield: bool,
    },
    /// A player's life total changed.
    PlayerLifeChanged {
        /// The player.
        player: PlayerId,
    },
    /// A player received poison counters.
    PlayerPoisoned {
        /// The player.
        player: PlayerId,
    },
    /// A player's counters changed.
    PlayerCountersChanged {
        /// The player.
        player: PlayerId,
    },
    /// A player took mana burn.
    ManaBurn {
        /// The player.
        player: PlayerId,
    },
    /// A player was dealt damage (logged only; life changes arrive separately).
    PlayerDamaged {
        /// The player.
        player: PlayerId,
    },
    /// Aggregate player statistics changed.
    PlayerStatsChanged {
        /// The affected players.
        players: SmallVec<[PlayerId; 2]>,
        /// Cards whose details depend on those statistics.
        cards: CardList,
    },
    /// A player's shard (secondary resource) count changed.
    ShardsChanged {
        /// The player.
        player: PlayerId,
    },
    /// A player's mana pool changed.
    ManaPoolChanged {
        /// The player.
        player: PlayerId,
    },
    /// A land was played.
    LandPlayed {
        /// The player who played it.
        player: PlayerId,
        /// The land.
        card: CardId,
    },
    /// A spell or ability was put on the stack.
    SpellCast {
        /// The spell's card.
        card: CardId,
    },
    /// A stack item resolved.
    SpellResolved {
        /// The spell's card.
        card: CardId,
    },
    /// A stack item was removed without resolving (countered, fizzled).
    SpellRemoved {
        /// The spell's card.
        card: CardId,
    },
    /// A player's zone contents changed.
    ZoneChanged {
        /// The zone.
        zone: PlayerZone,
    },
    /// A card moved between zones.
    CardMoved {
        /// The card.
        card: CardId,
        /// Source zone, if the card came from one.
        from: Option<PlayerZone>,
        /// Destination zone, if the card went to one.
        to: Option<PlayerZone>,
    },
    /// An attachment (equipment, aura) changed; every listed zone needs a redraw.
    CardAttached {
        /// Zones of the attachment, its old host and its new host.
        zones: SmallVec<[PlayerZone; 3]>,
    },
    /// A library was shuffled.
    LibraryShuffled {
        /// The library's owner.
        player: PlayerId,
    },
    /// Control of a player changed (human/AI takeover).
    PlayerControlChanged {
        /// The player.
        player: PlayerId,
    },
    /// A card was foretold into exile.
    CardForetold {
        /// The player who foretold it.
        player: PlayerId,
    },
    /// A card was plotted into exile.
    CardPlotted {
        /// The player who plotted it.
        player: PlayerId,
    },
    /// The game reached its outcome.
    GameOutcome {
        /// The outcome.
        outcome: GameOutcome,
    },
    /// The game is finished and its resources can be torn down.
    GameFinished,
}

/// An immediate, non-coalesced stack notice for views that animate
/// individual stack additions and removals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackNotice {
    /// A spell went on the stack.
    Added {
        /// The spell's card.
        card: CardId,
    },
    /// A spell left the stack without resolving.
    Removed {
        /// The spell's card.
        card: CardId,
    },
}

impl Notification {
    /// Log category for this notification.
    pub fn category(&self) -> LogCategory {
        match self {
            Self::CardTapped { .. }
            | Self::CardChanged { .. }
            | Self::CardStatsChanged { .. }
            | Self::CardsRegenerated { .. }
            | Self::PlayerStatsChanged { .. }
            | Self::PlayerControlChanged { .. } => LogCategory::Information,
            Self::AttackersDeclared { .. }
            | Self::BlockersDeclared { .. }
            | Self::CombatChanged
            | Self::CombatEnded { .. } => LogCategory::Combat,
            Self::PriorityPassed { .. } | Self::PhaseChanged { .. } => LogCategory::Phase,
            Self::TurnBegan { .. } => LogCategory::Turn,
            Self::PlayerLifeChanged { .. }
            | Self::PlayerPoisoned { .. }
            | Self::PlayerCountersChanged { .. }
            | Self::PlayerDamaged { .. } => LogCategory::Damage,
            Self::ManaBurn { .. } | Self::ManaPoolChanged { .. } | Self::ShardsChanged { .. } => {
                LogCategory::Mana
            }
            Self::LandPlayed { .. } => LogCategory::Land,
            Self::SpellCast { .. } => LogCategory::StackAdd,
            Self::SpellResolved { .. } | Self::SpellRemoved { .. } => LogCategory::StackResolve,
            Self::ZoneChanged { .. }
            | Self::CardMoved { .. }
            | Self::CardAttached { .. }
            | Self::LibraryShuffled { .. }
            | Self::CardForetold { .. }
            | Self::CardPlotted { .. } => LogCategory::ZoneChange,
            Self::GameOutcome { .. } | Self::GameFinished => LogCategory::GameOutcome,
        }
    }

    /// The immediate stack notice this notification implies, if any.
    pub fn stack_notice(&self) -> Option<StackNotice> {
        match self {
            Self::SpellCast { card } => Some(StackNotice::Added { card: *card }),
            Self::SpellRemoved { card } => Some(StackNotice::Removed { card: *card }),
            _ => None,
        }
    }
}

fn write_cards(f: &mut fmt::Formatter<'_>, cards: &[CardId]) -> fmt::Result {
    for (i, card) in cards.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{card}")?;
    }
    Ok(())
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CardTapped { card } => write!(f, "{card} tapped"),
            Self::CardChanged { card } => write!(f, "{card} changed"),
            Self::CardStatsChanged { cards } => {
                f.write_str("stats changed: ")?;
                write_cards(f, cards)
            }
            Self::CardsRegenerated { cards } => {
                f.write_str("regenerated: ")?;
                write_cards(f, cards)
            }
            Self::AttackersDeclared { cards } => {
                f.write_str("attackers: ")?;
                write_cards(f, cards)
            }
            Self::BlockersDeclared { cards } => {
                f.write_str("blockers: ")?;
                write_cards(f, cards)
            }
            Self::CombatChanged => f.write_str("combat changed"),
            Self::PriorityPassed { player } => write!(f, "{player} has priority"),
            Self::CombatEnded { .. } => f.write_str("combat ended"),
            Self::TurnBegan { player, turn } => write!(f, "Turn {turn} ({player})"),
            Self::PhaseChanged { player, phase, .. } => write!(f, "{player}: {phase}"),
            Self::PlayerLifeChanged { player } => write!(f, "{player} life changed"),
            Self::PlayerPoisoned { player } => write!(f, "{player} poisoned"),
            Self::PlayerCountersChanged { player } => write!(f, "{player} counters changed"),
            Self::ManaBurn { player } => write!(f, "{player} took mana burn"),
            Self::PlayerDamaged { player } => write!(f, "{player} was dealt damage"),
            Self::PlayerStatsChanged { players, .. } => {
                f.write_str("player stats changed:")?;
                for p in players {
                    write!(f, " {p}")?;
                }
                Ok(())
            }
            Self::ShardsChanged { player } => write!(f, "{player} shards changed"),
            Self::ManaPoolChanged { player } => write!(f, "{player} mana pool changed"),
            Self::LandPlayed { player, card } => write!(f, "{player} played {card}"),
            Self::SpellCast { card } => write!(f, "cast {card}"),
            Self::SpellResolved { card } => write!(f, "{card} resolved"),
            Self::SpellRemoved { card } => write!(f, "{card} removed from stack"),
            Self::ZoneChanged { zone } => write!(f, "{zone} changed"),
            Self::CardMoved { card, from, to } => {
                write!(f, "{card} moved")?;
                if let Some(from) = from {
                    write!(f, " from {from}")?;
                }
                if let Some(to) = to {
                    write!(f, " to {to}")?;
                }
                Ok(())
            }
            Self::CardAttached { .. } => f.write_str("attachment changed"),
            Self::LibraryShuffled { player } => write!(f, "{player} shuffled"),
            Self::PlayerControlChanged { player } => write!(f, "{player} control changed"),
            Self::CardForetold { player } => write!(f, "{player} foretold a card"),
            Self::CardPlotted { player } => write!(f, "{player} plotted a card"),
            Self::GameOutcome { outcome } => write!(f, "{outcome}"),
            Self::GameFinished => f.write_str("game finished"),
        }
    }
}
