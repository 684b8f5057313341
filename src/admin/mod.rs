//! # Session Orchestration
//!
//! Glue between the caller-facing surface and the lower layers. A
//! [`Session`] owns the one protocol client plus the live player and
//! saved-location sets, and chains free-text resolution → command
//! construction → dispatch for every intent. The [`session::spawn`]
//! actor wraps a session in a request channel so concurrent callers and
//! the periodic player-list refresh all queue onto one serialized
//! execute path; nothing else may touch the client.

pub mod session;

use chrono::{DateTime, Utc};

use crate::matcher::Named;

pub use session::{
    spawn, ExecuteOutcome, SearchHit, Session, SessionHandle, SessionRequest,
};

/// One player currently on the server, as confirmed by `list` polls.
/// A player missing from two consecutive successful refreshes is
/// dropped from the live set.
#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub last_seen: DateTime<Utc>,
    /// Consecutive successful refreshes that did not list this player.
    pub(crate) misses: u8,
}

impl Player {
    pub fn new(name: &str) -> Self {
        Player {
            name: name.to_string(),
            last_seen: Utc::now(),
            misses: 0,
        }
    }
}

impl Named for Player {
    fn display_name(&self) -> &str {
        &self.name
    }
}
