//! Terminal game outcomes.

use std::fmt;

use crate::id::PlayerId;

/// Why a game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndReason {
    /// Every opponent of the winner lost.
    AllOpponentsLost,
    /// The losing side conceded.
    Conceded,
    /// The rules produced a draw (simultaneous loss, repeated loop).
    Draw,
    /// The coordinator stopped the game because its time budget ran out.
    TimedOut,
    /// The coordinator stopped the game because the rules engine failed.
    EngineFailure,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AllOpponentsLost => "all opponents lost",
            Self::Conceded => "conceded",
            Self::Draw => "draw",
            Self::TimedOut => "time budget exhausted",
            Self::EngineFailure => "engine failure",
        };
        f.write_str(text)
    }
}

/// The single result of one game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameOutcome {
    /// One player won.
    Win {
        /// Seat of the winner.
        winner: PlayerId,
        /// Display name of the winner.
        name: String,
        /// How the game was decided.
        reason: EndReason,
    },
    /// Nobody won.
    Draw {
        /// Why the game was drawn.
        reason: EndReason,
    },
}

impl GameOutcome {
    /// A decisive result for `winner`.
    pub fn win(winner: PlayerId, name: impl Into<String>) -> Self {
        Self::Win {
            winner,
            name: name.into(),
            reason: EndReason::AllOpponentsLost,
        }
    }

    /// A draw for the given reason.
    pub fn draw(reason: EndReason) -> Self {
        Self::Draw { reason }
    }

    /// Whether the game was drawn.
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. })
    }

    /// Winner seat, if the game was decisive.
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            Self::Win { winner, .. } => Some(*winner),
            Self::Draw { .. } => None,
        }
    }

    /// Winner display name, if the game was decisive.
    pub fn winner_name(&self) -> Option<&str> {
        match self {
            Self::Win { name, .. } => Some(name),
            Self::Draw { .. } => None,
        }
    }

    /// Why the game ended.
    pub fn reason(&self) -> EndReason {
        match self {
            Self::Win { reason, .. } | Self::Draw { reason } => *reason,
        }
    }

    /// Whether the coordinator, not the rules engine, decided this outcome.
    pub fn is_forced(&self) -> bool {
        matches!(
            self.reason(),
            EndReason::TimedOut | EndReason::EngineFailure
        )
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win { name, reason, .. } => write!(f, "{name} has won ({reason})"),
            Self::Draw { reason } => write!(f, "draw ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_accessors() {
        let o = GameOutcome::win(PlayerId(1), "Ai(2)-Burn");
        assert!(!o.is_draw());
        assert_eq!(o.winner(), Some(PlayerId(1)));
        assert_eq!(o.winner_name(), Some("Ai(2)-Burn"));
        assert!(!o.is_forced());
    }

    #[test]
    fn forced_draws_are_flagged() {
        assert!(GameOutcome::draw(EndReason::TimedOut).is_forced());
        assert!(GameOutcome::draw(EndReason::EngineFailure).is_forced());
        assert!(!GameOutcome::draw(EndReason::Draw).is_forced());
    }
}
