//! Core types and traits for the Duel match coordination layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by producers (rules engines) and consumers
//! (presentation layers): entity IDs, the closed [`Notification`] set,
//! game outcomes, the match log, cancellation, and the seam traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod log;
pub mod notification;
pub mod outcome;
pub mod status;
pub mod traits;

pub use error::{GameError, ViewError};
pub use id::{CardId, MatchId, Phase, PlayerId, PlayerZone, ZoneKind};
pub use log::{GameLog, LogCategory, LogEntry, LogMode};
pub use notification::{CardList, Notification, StackNotice};
pub use outcome::{EndReason, GameOutcome};
pub use status::{CancelToken, GameStatus};
pub use traits::{Game, GameContext, MatchView, NotificationSink, ViewResult};
