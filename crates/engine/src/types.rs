//! Types for the ranking engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ranked participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Opaque identity (an address-like string in the minting app)
    pub participant: String,
    /// Activity count; only ever increases while the entry is ranked
    pub score: u64,
    /// Epoch seconds of the last accepted update
    pub last_update: i64,
}

/// Snapshot of the store's occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankingStats {
    pub count: usize,
    /// Admission floor: score of the lowest occupant when full, 0 otherwise
    pub min_score: u64,
}

/// Result of an accepted or rejected submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// The participant now holds `rank` with `score`; `evicted` names the
    /// occupant pushed out to make room, if any
    Updated {
        rank: usize,
        score: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        evicted: Option<String>,
    },
    /// Non-increasing score for an already-ranked participant; exact no-op
    Unchanged,
    /// Store full and the score did not beat the admission floor
    NotAdmitted,
}

/// Caller errors; the store is never modified when one is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RankingError {
    #[error("participant identity must not be empty")]
    InvalidParticipant,
    #[error("score must be greater than zero")]
    InvalidScore,
    #[error("argument {0} is outside the valid rank range")]
    InvalidRange(usize),
    #[error("rank {0} is not filled")]
    RankNotFilled(usize),
    #[error("caller is not the authorized writer")]
    Unauthorized,
}
