//! Chunk ownership store.
//!
//! Pure bookkeeping: the ledger never decides whether a mutation is legal.
//! [`crate::claims::ClaimEngine`] is the only writer outside of checkpoint
//! loading and faction disbandment.

use crate::spatial::ChunkKey;
use crate::state::FactionId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One claimed cell as it appears in checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimedChunk {
    pub key: ChunkKey,
    pub holder: FactionId,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkLedger {
    chunks: FxHashMap<ChunkKey, FactionId>,
    /// Held-chunk count per faction, kept in step with `chunks`.
    counts: FxHashMap<FactionId, usize>,
}

impl ChunkLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ChunkKey) -> Option<FactionId> {
        self.chunks.get(key).copied()
    }

    pub fn is_claimed(&self, key: &ChunkKey) -> bool {
        self.chunks.contains_key(key)
    }

    /// Upsert the holder of `key`, returning the previous holder.
    pub fn put(&mut self, key: ChunkKey, holder: FactionId) -> Option<FactionId> {
        let previous = self.chunks.insert(key, holder);
        if let Some(prev) = previous {
            self.decrement(prev);
        }
        *self.counts.entry(holder).or_insert(0) += 1;
        previous
    }

    pub fn remove(&mut self, key: &ChunkKey) -> Option<FactionId> {
        let previous = self.chunks.remove(key);
        if let Some(prev) = previous {
            self.decrement(prev);
        }
        previous
    }

    pub fn count_held_by(&self, faction: FactionId) -> usize {
        self.counts.get(&faction).copied().unwrap_or(0)
    }

    /// Every cell held by `faction`, sorted.
    pub fn all_held_by(&self, faction: FactionId) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self
            .chunks
            .iter()
            .filter(|(_, holder)| **holder == faction)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Drop every cell held by `faction`, returning them sorted.
    pub fn remove_all_held_by(&mut self, faction: FactionId) -> Vec<ChunkKey> {
        let keys = self.all_held_by(faction);
        for key in &keys {
            self.chunks.remove(key);
        }
        self.counts.remove(&faction);
        keys
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All claims in key order, for checksums and checkpoints.
    pub fn entries(&self) -> Vec<ClaimedChunk> {
        let mut out: Vec<ClaimedChunk> = self
            .chunks
            .iter()
            .map(|(key, holder)| ClaimedChunk {
                key: key.clone(),
                holder: *holder,
            })
            .collect();
        out.sort();
        out
    }

    fn decrement(&mut self, faction: FactionId) {
        if let Some(count) = self.counts.get_mut(&faction) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.counts.remove(&faction);
            }
        }
    }
}

impl FromIterator<ClaimedChunk> for ChunkLedger {
    fn from_iter<I: IntoIterator<Item = ClaimedChunk>>(iter: I) -> Self {
        let mut ledger = ChunkLedger::new();
        for claim in iter {
            ledger.put(claim.key, claim.holder);
        }
        ledger
    }
}
