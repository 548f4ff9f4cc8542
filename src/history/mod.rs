//! Bounded, ordered conversation transcript.
//!
//! Keeps at most `capacity` turns and evicts the oldest first. A call takes a
//! [`Checkpoint`] before pushing anything; rolling back to it drops the
//! turns the call pushed and puts back any turn they evicted.

use std::collections::VecDeque;

use crate::types::{Role, Turn};

/// Maximum number of turns kept by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Number of non-system turns sent to the model by default.
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// History state captured by [`HistoryStore::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
    seq: u64,
    snapshot: VecDeque<(u64, Turn)>,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    turns: VecDeque<(u64, Turn)>,
    capacity: usize,
    next_seq: u64,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a turn, evicting the oldest ones while over capacity.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back((self.next_seq, turn));
        self.next_seq += 1;
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// Capture the current turns; everything appended later belongs to it.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            seq: self.next_seq,
            snapshot: self.turns.clone(),
        }
    }

    /// Restore the history to `checkpoint`.
    ///
    /// Turns appended since are removed and turns they evicted come back.
    /// Returns the number of turns removed.
    pub fn rollback(&mut self, checkpoint: Checkpoint) -> usize {
        let removed = self
            .turns
            .iter()
            .filter(|(seq, _)| *seq >= checkpoint.seq)
            .count();
        let kept = self.turns.len() - removed;
        let restored = checkpoint.snapshot.len().saturating_sub(kept);
        self.turns = checkpoint.snapshot;
        if removed > 0 || restored > 0 {
            tracing::debug!(removed, restored, remaining = self.turns.len(), "history rolled back");
        }
        removed
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> Vec<Turn> {
        self.turns.iter().map(|(_, turn)| turn.clone()).collect()
    }

    /// The last `window` turns, system turns excluded, oldest first.
    ///
    /// Computed on every read; never stored.
    pub fn recent(&self, window: usize) -> Vec<Turn> {
        let mut recent: Vec<Turn> = self
            .turns
            .iter()
            .rev()
            .filter(|(_, turn)| turn.role != Role::System)
            .take(window)
            .map(|(_, turn)| turn.clone())
            .collect();
        recent.reverse();
        recent
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.turns.iter().filter(|(_, turn)| turn.role == role).count()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
