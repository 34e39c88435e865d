//! Mintboard Ranking Engine — bounded top-100 minter leaderboard
//!
//! Self-contained crate holding the ranking state of the minting app.
//! Provides:
//! - A capacity-bounded sorted store with rank lookups and eviction
//! - A single-writer gate with two-phase ownership handoff
//! - A read-only query surface (top-N, rank-of, entry-at-rank, stats)

pub mod access;
pub mod ranking;
pub mod types;

// Re-exports for convenience
pub use access::GatedRanking;
pub use ranking::{RankingStore, CAPACITY};
pub use types::{Entry, RankingError, RankingStats, SubmitOutcome};
