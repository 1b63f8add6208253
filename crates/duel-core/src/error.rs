//! Error types shared by producers and consumers.
//!
//! Producer (rules engine) failures are [`GameError`]s; they never reach
//! the consumer. Consumer batch-apply failures are [`ViewError`]s; they
//! are isolated per bucket by the dispatcher.

use thiserror::Error;

/// Errors raised by a rules engine while running a game.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    /// The rules engine reached an illegal or unsupported state.
    #[error("rules engine failed: {reason}")]
    Rules {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The game observed a cancellation request and stopped early.
    #[error("game cancelled")]
    Cancelled,
    /// Any other internal failure (I/O, corrupted state).
    #[error("internal error: {reason}")]
    Internal {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl GameError {
    /// Shorthand for [`GameError::Rules`].
    pub fn rules(reason: impl Into<String>) -> Self {
        Self::Rules {
            reason: reason.into(),
        }
    }
}

/// Errors returned by a consumer batch-apply operation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ViewError {
    /// The view refused the batch.
    #[error("view rejected {bucket} batch: {reason}")]
    Rejected {
        /// Name of the bucket whose batch was rejected.
        bucket: &'static str,
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The view is no longer attached (window closed, client gone).
    #[error("view disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_error_display() {
        let err = GameError::rules("stack overflow in trigger loop");
        assert_eq!(
            err.to_string(),
            "rules engine failed: stack overflow in trigger loop"
        );
        assert_eq!(GameError::Cancelled.to_string(), "game cancelled");
    }

    #[test]
    fn view_error_display() {
        let err = ViewError::Rejected {
            bucket: "zones",
            reason: "unknown player".into(),
        };
        assert!(err.to_string().contains("zones"));
        assert!(err.to_string().contains("unknown player"));
    }
}
