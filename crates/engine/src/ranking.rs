//! Bounded top-100 ranking store
//!
//! Flat sorted vector plus a participant→rank map. The vector stays small
//! (at most [`CAPACITY`] entries) so every mutation is a handful of linear
//! shifts; keeping it flat gives O(1) rank-by-position lookups, which a heap
//! would not.
//!
//! Tie rule: equal scores rank by insertion order — the earliest holder of a
//! score stays ahead. A re-scored entry stops below any entry it merely ties.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::types::{Entry, RankingError, RankingStats, SubmitOutcome};

/// Maximum number of ranked participants
pub const CAPACITY: usize = 100;

/// Bounded collection of entries, strictly sorted by score descending.
///
/// Mutations must be serialized by the caller; see [`crate::access`] for the
/// single-writer gate.
#[derive(Debug, Default)]
pub struct RankingStore {
    /// Sorted descending by score, ties by insertion order
    entries: Vec<Entry>,
    /// participant → current 1-indexed rank
    ranks: HashMap<String, usize>,
    /// Score of the lowest occupant when full, 0 while below capacity
    min_score: u64,
}

impl RankingStore {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(CAPACITY),
            ranks: HashMap::with_capacity(CAPACITY),
            min_score: 0,
        }
    }

    /// Record a new activity count for a participant.
    ///
    /// Scores are monotonic: a submission that does not strictly raise the
    /// participant's stored score is an exact no-op, which makes replays of
    /// stale counts harmless. When the store is full, a newcomer is admitted
    /// only by strictly beating the admission floor, evicting the current
    /// lowest occupant.
    pub fn submit(
        &mut self,
        participant: &str,
        new_score: u64,
        now: i64,
    ) -> Result<SubmitOutcome, RankingError> {
        if participant.is_empty() {
            return Err(RankingError::InvalidParticipant);
        }
        if new_score == 0 {
            return Err(RankingError::InvalidScore);
        }

        if let Some(&rank) = self.ranks.get(participant) {
            let idx = rank - 1;
            if new_score <= self.entries[idx].score {
                return Ok(SubmitOutcome::Unchanged);
            }
            self.entries[idx].score = new_score;
            self.entries[idx].last_update = now;
            let new_idx = self.shift_up(idx);
            if self.entries.len() == CAPACITY {
                self.min_score = self.entries[CAPACITY - 1].score;
            }
            debug!(participant, rank = new_idx + 1, score = new_score, "score updated");
            return Ok(SubmitOutcome::Updated {
                rank: new_idx + 1,
                score: new_score,
                evicted: None,
            });
        }

        if self.entries.len() == CAPACITY && new_score <= self.min_score {
            debug!(
                participant,
                score = new_score,
                floor = self.min_score,
                "below admission floor"
            );
            return Ok(SubmitOutcome::NotAdmitted);
        }

        // At capacity the newcomer beat the floor: drop the single lowest
        // occupant (the latest arrival among equal-lowest scores).
        let mut evicted = None;
        if self.entries.len() == CAPACITY {
            if let Some(out) = self.entries.pop() {
                self.ranks.remove(&out.participant);
                info!(participant = %out.participant, score = out.score, "evicted");
                evicted = Some(out.participant);
            }
        }

        let pos = self.insert_sorted(Entry {
            participant: participant.to_string(),
            score: new_score,
            last_update: now,
        });
        self.min_score = if self.entries.len() == CAPACITY {
            self.entries[CAPACITY - 1].score
        } else {
            0
        };

        debug!(participant, rank = pos + 1, score = new_score, "entered ranking");
        Ok(SubmitOutcome::Updated {
            rank: pos + 1,
            score: new_score,
            evicted,
        })
    }

    /// Snapshot of the first `min(n, count)` entries, `1 <= n <= CAPACITY`.
    pub fn top(&self, n: usize) -> Result<Vec<Entry>, RankingError> {
        if n == 0 || n > CAPACITY {
            return Err(RankingError::InvalidRange(n));
        }
        Ok(self.entries.iter().take(n).cloned().collect())
    }

    /// The stored entry and its 1-indexed rank, `None` when unranked.
    pub fn entry_for(&self, participant: &str) -> Option<(&Entry, usize)> {
        let &rank = self.ranks.get(participant)?;
        Some((&self.entries[rank - 1], rank))
    }

    /// The occupant at a 1-indexed rank.
    pub fn entry_at_rank(&self, rank: usize) -> Result<&Entry, RankingError> {
        if rank == 0 || rank > CAPACITY {
            return Err(RankingError::InvalidRange(rank));
        }
        self.entries
            .get(rank - 1)
            .ok_or(RankingError::RankNotFilled(rank))
    }

    pub fn stats(&self) -> RankingStats {
        RankingStats {
            count: self.entries.len(),
            min_score: self.min_score,
        }
    }

    pub fn is_ranked(&self, participant: &str) -> bool {
        self.ranks.contains_key(participant)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move `entries[idx]` toward rank 1 past strictly lower-scored
    /// neighbors, fixing the rank map for everything displaced. Returns the
    /// final index.
    fn shift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 && self.entries[idx - 1].score < self.entries[idx].score {
            self.entries.swap(idx - 1, idx);
            self.ranks
                .insert(self.entries[idx].participant.clone(), idx + 1);
            idx -= 1;
        }
        self.ranks
            .insert(self.entries[idx].participant.clone(), idx + 1);
        idx
    }

    /// Insert after every entry with a greater-or-equal score, remapping the
    /// ranks of everything shifted down. Returns the insertion index.
    fn insert_sorted(&mut self, entry: Entry) -> usize {
        let pos = self.entries.partition_point(|e| e.score >= entry.score);
        self.entries.insert(pos, entry);
        for i in pos..self.entries.len() {
            self.ranks
                .insert(self.entries[i].participant.clone(), i + 1);
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_store() -> RankingStore {
        // 100 distinct participants scoring 1..=100
        let mut store = RankingStore::new();
        for i in 1..=100u64 {
            store.submit(&format!("p{i}"), i, i as i64).unwrap();
        }
        store
    }

    #[test]
    fn orders_by_score_descending() {
        let mut store = RankingStore::new();
        store.submit("A", 5, 0).unwrap();
        store.submit("B", 10, 1).unwrap();
        store.submit("C", 3, 2).unwrap();

        let top = store.top(3).unwrap();
        let names: Vec<&str> = top.iter().map(|e| e.participant.as_str()).collect();
        assert_eq!(names, ["B", "A", "C"]);
        assert_eq!(top[0].score, 10);
    }

    #[test]
    fn non_increasing_score_is_exact_noop() {
        let mut store = RankingStore::new();
        store.submit("A", 10, 0).unwrap();
        assert_eq!(store.submit("A", 5, 99).unwrap(), SubmitOutcome::Unchanged);
        assert_eq!(store.submit("A", 10, 99).unwrap(), SubmitOutcome::Unchanged);

        let (entry, rank) = store.entry_for("A").unwrap();
        assert_eq!(entry.score, 10);
        assert_eq!(entry.last_update, 0, "timestamp untouched by rejected update");
        assert_eq!(rank, 1);
    }

    #[test]
    fn increased_score_moves_entry_up() {
        let mut store = RankingStore::new();
        store.submit("A", 5, 0).unwrap();
        store.submit("B", 10, 1).unwrap();
        store.submit("C", 3, 2).unwrap();

        let outcome = store.submit("C", 12, 3).unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Updated {
                rank: 1,
                score: 12,
                evicted: None
            }
        );
        assert_eq!(store.entry_for("B").unwrap().1, 2);
        assert_eq!(store.entry_for("A").unwrap().1, 3);
    }

    #[test]
    fn equal_scores_rank_by_insertion_order() {
        let mut store = RankingStore::new();
        store.submit("A", 7, 0).unwrap();
        store.submit("B", 7, 1).unwrap();
        assert_eq!(store.entry_for("A").unwrap().1, 1);
        assert_eq!(store.entry_for("B").unwrap().1, 2);

        // A re-scored entry stops below an entry it merely ties
        store.submit("C", 3, 2).unwrap();
        store.submit("C", 7, 3).unwrap();
        assert_eq!(store.entry_for("C").unwrap().1, 3);
    }

    #[test]
    fn eviction_at_capacity() {
        let mut store = filled_store();
        assert_eq!(store.stats().count, 100);
        assert_eq!(store.stats().min_score, 1);

        let outcome = store.submit("X", 50, 200).unwrap();
        match outcome {
            SubmitOutcome::Updated { evicted, .. } => {
                assert_eq!(evicted.as_deref(), Some("p1"));
            }
            other => panic!("expected Updated, got {other:?}"),
        }
        assert!(!store.is_ranked("p1"));
        assert!(store.is_ranked("X"));
        assert_eq!(store.stats(), RankingStats { count: 100, min_score: 2 });
    }

    #[test]
    fn score_at_floor_is_not_admitted() {
        let mut store = filled_store();
        assert_eq!(store.submit("Y", 1, 200).unwrap(), SubmitOutcome::NotAdmitted);
        assert_eq!(store.stats().count, 100);
        assert!(!store.is_ranked("Y"));
    }

    #[test]
    fn evicted_participant_can_reenter() {
        let mut store = filled_store();
        store.submit("X", 50, 200).unwrap(); // evicts p1
        let outcome = store.submit("p1", 80, 201).unwrap();
        match outcome {
            SubmitOutcome::Updated { evicted, .. } => assert!(evicted.is_some()),
            other => panic!("expected Updated, got {other:?}"),
        }
        assert!(store.is_ranked("p1"));
    }

    #[test]
    fn min_score_zero_below_capacity() {
        let mut store = RankingStore::new();
        for i in 1..=99u64 {
            store.submit(&format!("p{i}"), i, 0).unwrap();
        }
        assert_eq!(store.stats().min_score, 0);
        store.submit("p100", 100, 0).unwrap();
        assert_eq!(store.stats().min_score, 1);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let mut store = RankingStore::new();
        assert_eq!(store.submit("", 5, 0), Err(RankingError::InvalidParticipant));
        assert_eq!(store.submit("A", 0, 0), Err(RankingError::InvalidScore));
        assert_eq!(store.top(0), Err(RankingError::InvalidRange(0)));
        assert_eq!(store.top(CAPACITY + 1), Err(RankingError::InvalidRange(101)));
        assert_eq!(store.entry_at_rank(0), Err(RankingError::InvalidRange(0)));
        assert_eq!(
            store.entry_at_rank(CAPACITY + 1),
            Err(RankingError::InvalidRange(101))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn entry_at_unfilled_rank() {
        let mut store = RankingStore::new();
        assert_eq!(store.entry_at_rank(1), Err(RankingError::RankNotFilled(1)));

        store.submit("A", 5, 0).unwrap();
        assert_eq!(store.entry_at_rank(1).unwrap().participant, "A");
        assert_eq!(store.entry_at_rank(2), Err(RankingError::RankNotFilled(2)));
    }

    #[test]
    fn unknown_participant_is_not_an_error() {
        let store = RankingStore::new();
        assert!(store.entry_for("nobody").is_none());
        assert!(!store.is_ranked("nobody"));
    }

    #[test]
    fn top_is_a_snapshot() {
        let mut store = RankingStore::new();
        store.submit("A", 5, 0).unwrap();
        let before = store.top(3).unwrap();
        store.submit("B", 10, 1).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].participant, "A");
    }

    fn assert_invariants(store: &RankingStore) {
        let top = store.top(CAPACITY).unwrap();
        assert!(top.len() <= CAPACITY);
        assert!(top.windows(2).all(|w| w[0].score >= w[1].score));
        for (i, e) in top.iter().enumerate() {
            let (stored, rank) = store.entry_for(&e.participant).unwrap();
            assert_eq!(rank, i + 1);
            assert_eq!(stored.score, e.score);
        }
        let stats = store.stats();
        assert_eq!(stats.count, top.len());
        if stats.count == CAPACITY {
            assert_eq!(stats.min_score, top[CAPACITY - 1].score);
        } else {
            assert_eq!(stats.min_score, 0);
        }
    }

    #[test]
    fn randomized_submissions_keep_invariants() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut store = RankingStore::new();
        for round in 0..5_000i64 {
            let participant = format!("p{}", rng.gen_range(0..250));
            let score = rng.gen_range(1..1_000u64);
            store.submit(&participant, score, round).unwrap();
            if round % 50 == 0 {
                assert_invariants(&store);
            }
        }
        assert_invariants(&store);
    }

    #[test]
    fn eviction_only_removes_the_lowest() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        let mut store = filled_store();
        for round in 0..1_000i64 {
            let floor = store.stats().min_score;
            let lowest = store.entry_at_rank(CAPACITY).unwrap().clone();
            let participant = format!("q{round}");
            let score = rng.gen_range(1..300u64);
            match store.submit(&participant, score, round).unwrap() {
                SubmitOutcome::Updated { evicted, .. } => {
                    assert!(score > floor);
                    assert_eq!(evicted.as_deref(), Some(lowest.participant.as_str()));
                }
                SubmitOutcome::NotAdmitted => assert!(score <= floor),
                SubmitOutcome::Unchanged => panic!("fresh participant cannot be unchanged"),
            }
            assert_eq!(store.len(), CAPACITY);
        }
    }
}
