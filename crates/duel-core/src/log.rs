//! The ordered match log.
//!
//! A [`GameLog`] is appended to from whichever thread is running the game
//! (and from the coordinator when it forces an outcome), then read once
//! for reporting. Readers choose between the full log and the
//! match-result summary with [`LogMode`].

use std::fmt;

use parking_lot::Mutex;

/// Category of a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// How a single game ended.
    GameOutcome,
    /// The final result line of a match.
    MatchResults,
    /// A new turn began.
    Turn,
    /// Mulligan decisions.
    Mulligan,
    /// Ante selection.
    Ante,
    /// Draft picks.
    Draft,
    /// A card moved between zones.
    ZoneChange,
    /// Control of a player changed hands.
    PlayerControl,
    /// Damage dealt.
    Damage,
    /// A land was played.
    Land,
    /// A card was discarded.
    Discard,
    /// Combat declarations and results.
    Combat,
    /// Coordinator and engine diagnostics.
    Information,
    /// A stack item resolved.
    StackResolve,
    /// A spell or ability was put on the stack.
    StackAdd,
    /// A replacement effect applied.
    EffectReplaced,
    /// Mana pool changes.
    Mana,
    /// Turn phase changes.
    Phase,
}

impl LogCategory {
    /// Caption used when rendering an entry.
    pub fn caption(self) -> &'static str {
        match self {
            Self::GameOutcome => "Game Outcome",
            Self::MatchResults => "Match Result",
            Self::Turn => "Turn",
            Self::Mulligan => "Mulligan",
            Self::Ante => "Ante",
            Self::Draft => "Draft",
            Self::ZoneChange => "Zone Change",
            Self::PlayerControl => "Player Control",
            Self::Damage => "Damage",
            Self::Land => "Land",
            Self::Discard => "Discard",
            Self::Combat => "Combat",
            Self::Information => "Information",
            Self::StackResolve => "Resolve Stack",
            Self::StackAdd => "Add To Stack",
            Self::EffectReplaced => "Replacement Effect",
            Self::Mana => "Mana",
            Self::Phase => "Phase",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caption())
    }
}

/// One line of the match log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Entry category, used for summary filtering.
    pub category: LogCategory,
    /// Human-readable text.
    pub message: String,
}

impl LogEntry {
    /// Create an entry.
    pub fn new(category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

/// Which entries a report should carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogMode {
    /// Every entry, in order.
    #[default]
    Full,
    /// Only [`LogCategory::MatchResults`] entries.
    Summary,
}

impl LogMode {
    /// Whether an entry of `category` is kept under this mode.
    pub fn keeps(self, category: LogCategory) -> bool {
        match self {
            Self::Full => true,
            Self::Summary => category == LogCategory::MatchResults,
        }
    }
}

/// Append-only, thread-safe, ordered log.
#[derive(Debug, Default)]
pub struct GameLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl GameLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }

    /// Append an entry built from its parts.
    pub fn add(&self, category: LogCategory, message: impl Into<String>) {
        self.push(LogEntry::new(category, message));
    }

    /// Number of entries recorded so far.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy out the entries kept by `mode`, oldest first.
    pub fn entries(&self, mode: LogMode) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| mode.keeps(e.category))
            .cloned()
            .collect()
    }
}
