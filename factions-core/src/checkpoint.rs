//! Load/save boundary for the world.
//!
//! A checkpoint is a flat, sorted snapshot of every store so that two
//! identical worlds serialize to identical bytes. Deferred scheduler tasks
//! are transient and not captured.

use crate::config::FactionsConfig;
use crate::ledger::ClaimedChunk;
use crate::locks::LockedBlock;
use crate::power::{PlayerPowerRecord, PowerEconomy, PowerRules};
use crate::relations::RelationEdge;
use crate::state::{Faction, WorldState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed checkpoint: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported checkpoint version {found} (expected {expected})", expected = CHECKPOINT_VERSION)]
    UnsupportedVersion { found: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub tick: u64,
    pub next_faction_id: u32,
    pub factions: Vec<Faction>,
    pub claims: Vec<ClaimedChunk>,
    pub relations: Vec<RelationEdge>,
    pub players: Vec<PlayerPowerRecord>,
    pub locks: Vec<LockedBlock>,
}

impl Checkpoint {
    pub fn capture(state: &WorldState) -> Self {
        let mut factions: Vec<Faction> = state.factions.values().cloned().collect();
        factions.sort_by_key(|f| f.id);
        Self {
            version: CHECKPOINT_VERSION,
            tick: state.tick,
            next_faction_id: state.next_faction_id,
            factions,
            claims: state.ledger.entries(),
            relations: state.relations.edges(),
            players: state.power.records(),
            locks: state.locks.entries(),
        }
    }

    /// Rebuild a world. Power records are re-clamped under `config`.
    pub fn into_state(self, config: &FactionsConfig) -> WorldState {
        let mut power = PowerEconomy::new(PowerRules::from(config));
        for record in self.players {
            power.insert_record(record);
        }
        let next_faction_id = self
            .factions
            .iter()
            .map(|f| f.id.0 + 1)
            .max()
            .unwrap_or(1)
            .max(self.next_faction_id);
        WorldState {
            tick: self.tick,
            factions: self.factions.into_iter().map(|f| (f.id, f)).collect(),
            ledger: self.claims.into_iter().collect(),
            relations: self.relations.into_iter().collect(),
            power,
            locks: self.locks.into_iter().collect(),
            scheduler: Default::default(),
            next_faction_id,
        }
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Checkpoint = serde_json::from_str(json)?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
            });
        }
        Ok(checkpoint)
    }

    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let json = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::RelationKind;
    use crate::spatial::{BlockPos, ChunkKey};
    use crate::state::{FactionId, PlayerId};
    use crate::testing::WorldBuilder;

    fn sample() -> WorldState {
        WorldBuilder::new()
            .tick(42)
            .with_faction(1, "A")
            .with_member(1, 10, 7)
            .with_faction(3, "C")
            .with_member(3, 30, 2)
            .with_claims(1, "world", &[(0, 0), (0, 1)])
            .with_claims(3, "nether", &[(-4, 2)])
            .with_relation(3, 1, RelationKind::Liege)
            .with_lock(1, 10, BlockPos::new("world", 2, 64, 2))
            .with_home(1, BlockPos::new("world", 2, 70, 2))
            .build()
    }

    #[test]
    fn test_capture_restores_same_world() {
        let state = sample();
        let config = FactionsConfig::default();
        let json = Checkpoint::capture(&state).to_json().unwrap();
        let restored = Checkpoint::from_json(&json).unwrap().into_state(&config);

        assert_eq!(restored.checksum(), state.checksum());
        assert_eq!(restored.ledger.get(&ChunkKey::new("nether", -4, 2)), Some(FactionId(3)));
        assert_eq!(restored.relations.liege_of(FactionId(3)), Some(FactionId(1)));
        assert_eq!(restored.power.current_power(PlayerId(10)), 7);
        assert_eq!(restored.next_faction_id, 4);
    }

    #[test]
    fn test_capture_is_byte_stable() {
        let a = Checkpoint::capture(&sample()).to_json().unwrap();
        let b = Checkpoint::capture(&sample()).to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_lower_ceiling_on_load() {
        let config = FactionsConfig {
            max_power: 3,
            ..Default::default()
        };
        let restored = Checkpoint::capture(&sample()).into_state(&config);
        assert_eq!(restored.power.current_power(PlayerId(10)), 3);
    }

    #[test]
    fn test_version_mismatch() {
        let mut checkpoint = Checkpoint::capture(&sample());
        checkpoint.version = 99;
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert!(matches!(
            Checkpoint::from_json(&json),
            Err(CheckpointError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("factions-checkpoint-{}.json", std::process::id()));
        let checkpoint = Checkpoint::capture(&sample());
        checkpoint.save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Checkpoint::load(Path::new("/nonexistent/world.json")).unwrap_err();
        assert!(matches!(err, CheckpointError::Io { .. }));
    }
}
