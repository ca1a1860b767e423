use crate::spatial::{BlockPos, ChunkKey};
use crate::state::{FactionId, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A block a player has locked against other players.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LockedBlock {
    pub pos: BlockPos,
    pub owner: PlayerId,
    pub faction: FactionId,
}

#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    locks: HashMap<BlockPos, LockedBlock>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the block is already locked.
    pub fn lock(&mut self, lock: LockedBlock) -> bool {
        if self.locks.contains_key(&lock.pos) {
            return false;
        }
        self.locks.insert(lock.pos.clone(), lock);
        true
    }

    pub fn unlock(&mut self, pos: &BlockPos) -> Option<LockedBlock> {
        self.locks.remove(pos)
    }

    pub fn get(&self, pos: &BlockPos) -> Option<&LockedBlock> {
        self.locks.get(pos)
    }

    pub fn is_locked(&self, pos: &BlockPos) -> bool {
        self.locks.contains_key(pos)
    }

    /// Drop every lock physically inside `cell`.
    pub fn purge_chunk(&mut self, cell: &ChunkKey) -> usize {
        let before = self.locks.len();
        self.locks.retain(|pos, _| !cell.contains(pos));
        before - self.locks.len()
    }

    pub fn remove_owned_by_faction(&mut self, faction: FactionId) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| lock.faction != faction);
        before - self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// All locks, sorted by position.
    pub fn entries(&self) -> Vec<LockedBlock> {
        let mut out: Vec<LockedBlock> = self.locks.values().cloned().collect();
        out.sort();
        out
    }
}

impl FromIterator<LockedBlock> for LockRegistry {
    fn from_iter<I: IntoIterator<Item = LockedBlock>>(iter: I) -> Self {
        let mut registry = LockRegistry::new();
        for lock in iter {
            registry.lock(lock);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_at(x: i32, z: i32, faction: u32) -> LockedBlock {
        LockedBlock {
            pos: BlockPos::new("world", x, 64, z),
            owner: PlayerId(faction as u64),
            faction: FactionId(faction),
        }
    }

    #[test]
    fn test_double_lock_rejected() {
        let mut registry = LockRegistry::new();
        assert!(registry.lock(lock_at(1, 1, 1)));
        assert!(!registry.lock(lock_at(1, 1, 2)));
        assert_eq!(registry.get(&BlockPos::new("world", 1, 64, 1)).map(|l| l.faction), Some(FactionId(1)));
    }

    #[test]
    fn test_purge_chunk_only_touches_that_chunk() {
        let mut registry: LockRegistry =
            [lock_at(1, 1, 1), lock_at(15, 15, 2), lock_at(16, 0, 1)].into_iter().collect();

        assert_eq!(registry.purge_chunk(&ChunkKey::new("world", 0, 0)), 2);
        assert!(registry.is_locked(&BlockPos::new("world", 16, 64, 0)));
    }

    #[test]
    fn test_remove_owned_by_faction() {
        let mut registry: LockRegistry =
            [lock_at(1, 1, 1), lock_at(40, 40, 1), lock_at(3, 3, 2)].into_iter().collect();
        assert_eq!(registry.remove_owned_by_faction(FactionId(1)), 2);
        assert_eq!(registry.len(), 1);
    }
}
