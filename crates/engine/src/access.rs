//! Single-writer gate around the ranking store
//!
//! Exactly one caller identity may submit scores. Ownership moves via a
//! two-phase handoff (propose, then accept by the proposed party) so control
//! can never land on an identity that cannot act.

use tracing::info;

use crate::ranking::RankingStore;
use crate::types::{RankingError, SubmitOutcome};

/// [`RankingStore`] plus the owner identity allowed to mutate it.
///
/// Reads pass through [`GatedRanking::store`] unauthenticated.
#[derive(Debug)]
pub struct GatedRanking {
    store: RankingStore,
    owner: String,
    pending_owner: Option<String>,
}

impl GatedRanking {
    pub fn new(owner: impl Into<String>) -> Result<Self, RankingError> {
        let owner = owner.into();
        if owner.is_empty() {
            return Err(RankingError::InvalidParticipant);
        }
        Ok(Self {
            store: RankingStore::new(),
            owner,
            pending_owner: None,
        })
    }

    /// Submit a score on behalf of `caller`; only the owner may write.
    pub fn submit(
        &mut self,
        caller: &str,
        participant: &str,
        new_score: u64,
        now: i64,
    ) -> Result<SubmitOutcome, RankingError> {
        if caller != self.owner {
            return Err(RankingError::Unauthorized);
        }
        self.store.submit(participant, new_score, now)
    }

    /// Propose a new owner; the handoff completes only when the candidate
    /// calls [`GatedRanking::accept_ownership`]. A later proposal replaces
    /// an earlier one.
    pub fn propose_owner(&mut self, caller: &str, candidate: &str) -> Result<(), RankingError> {
        if caller != self.owner {
            return Err(RankingError::Unauthorized);
        }
        if candidate.is_empty() {
            return Err(RankingError::InvalidParticipant);
        }
        info!(owner = %self.owner, candidate, "ownership handoff proposed");
        self.pending_owner = Some(candidate.to_string());
        Ok(())
    }

    /// Complete a proposed handoff; only the proposed candidate may accept.
    pub fn accept_ownership(&mut self, caller: &str) -> Result<(), RankingError> {
        match self.pending_owner.take() {
            Some(candidate) if candidate == caller => {
                info!(previous = %self.owner, owner = %candidate, "ownership transferred");
                self.owner = candidate;
                Ok(())
            }
            other => {
                // An unauthorized accept must not discard the proposal
                self.pending_owner = other;
                Err(RankingError::Unauthorized)
            }
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn pending_owner(&self) -> Option<&str> {
        self.pending_owner.as_deref()
    }

    /// Read-only view of the underlying store.
    pub fn store(&self) -> &RankingStore {
        &self.store
    }
}
