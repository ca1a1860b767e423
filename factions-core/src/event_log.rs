//! Hook that records committed territory and war events as JSONL.
//!
//! Only `after` notifications are recorded, so vetoed operations never
//! appear. The log itself never vetoes.
//!
//! ```json
//! {"type":"chunk_conquered","seq":3,"faction":1,"from":2,"cell":{"world":"world","x":0,"z":0}}
//! ```

use crate::hooks::{ClaimHook, HookEvent, HookEventKind};
use crate::spatial::ChunkKey;
use crate::state::{FactionId, PlayerId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactionEvent {
    ChunkClaimed {
        seq: u64,
        faction: FactionId,
        cell: ChunkKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        actor: Option<PlayerId>,
    },
    ChunkConquered {
        seq: u64,
        faction: FactionId,
        from: FactionId,
        cell: ChunkKey,
    },
    ChunkForceClaimed {
        seq: u64,
        faction: FactionId,
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<FactionId>,
        cell: ChunkKey,
    },
    ChunkUnclaimed {
        seq: u64,
        faction: FactionId,
        cell: ChunkKey,
    },
    AllLandUnclaimed {
        seq: u64,
        faction: FactionId,
    },
    WarStarted {
        seq: u64,
        attacker: FactionId,
        target: FactionId,
    },
}

#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<FactionEvent>,
    next_seq: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[FactionEvent] {
        &self.events
    }

    fn convert(&self, event: &HookEvent) -> Option<FactionEvent> {
        let seq = self.next_seq;
        let faction = event.faction;
        Some(match event.kind {
            HookEventKind::Claim => FactionEvent::ChunkClaimed {
                seq,
                faction,
                cell: event.cell.clone()?,
                actor: event.actor,
            },
            HookEventKind::Conquest => FactionEvent::ChunkConquered {
                seq,
                faction,
                from: event.counterpart?,
                cell: event.cell.clone()?,
            },
            HookEventKind::ForceClaim => FactionEvent::ChunkForceClaimed {
                seq,
                faction,
                from: event.counterpart,
                cell: event.cell.clone()?,
            },
            HookEventKind::Unclaim => FactionEvent::ChunkUnclaimed {
                seq,
                faction,
                cell: event.cell.clone()?,
            },
            HookEventKind::UnclaimAll => FactionEvent::AllLandUnclaimed { seq, faction },
            HookEventKind::WarStart => FactionEvent::WarStarted {
                seq,
                attacker: faction,
                target: event.counterpart?,
            },
        })
    }

    /// One JSON object per line.
    pub fn write_jsonl<W: Write>(&self, out: W) -> Result<(), EventLogError> {
        let mut writer = BufWriter::new(out);
        for event in &self.events {
            serde_json::to_writer(&mut writer, event)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), EventLogError> {
        self.write_jsonl(File::create(path)?)
    }
}

impl ClaimHook for EventLog {
    fn before(&mut self, _event: &HookEvent) -> bool {
        true
    }

    fn after(&mut self, event: &HookEvent) {
        match self.convert(event) {
            Some(recorded) => {
                self.events.push(recorded);
                self.next_seq += 1;
            }
            None => log::warn!("Incomplete {:?} event not logged", event.kind),
        }
    }

    fn name(&self) -> &str {
        "event_log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ClaimEngine, UnclaimScope};
    use crate::config::FactionsConfig;
    use crate::hooks::tests::VetoKinds;
    use crate::hooks::HookRegistry;
    use crate::testing::WorldBuilder;

    #[test]
    fn test_records_committed_claims_only() {
        let config = FactionsConfig::default();
        let mut state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 1)
            .build();
        let mut log = EventLog::new();
        let mut engine = ClaimEngine::new(&config, &mut log);

        engine.claim(&mut state, FactionId(1), &ChunkKey::new("world", 0, 0), Some(PlayerId(10)));
        // Over the limit: rejected before the hook
        engine.claim(&mut state, FactionId(1), &ChunkKey::new("world", 1, 0), None);
        engine.unclaim(&mut state, FactionId(1), &UnclaimScope::All, None);

        assert_eq!(
            log.events(),
            &[
                FactionEvent::ChunkClaimed {
                    seq: 0,
                    faction: FactionId(1),
                    cell: ChunkKey::new("world", 0, 0),
                    actor: Some(PlayerId(10)),
                },
                FactionEvent::AllLandUnclaimed {
                    seq: 1,
                    faction: FactionId(1)
                },
            ]
        );
    }

    #[test]
    fn test_vetoed_events_not_recorded_through_registry() {
        let config = FactionsConfig::default();
        let mut state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 5)
            .build();
        let mut registry = HookRegistry::new();
        registry.register(Box::new(VetoKinds::new(&[HookEventKind::Claim])));
        registry.register(Box::new(EventLog::new()));
        let mut engine = ClaimEngine::new(&config, &mut registry);

        engine.claim(&mut state, FactionId(1), &ChunkKey::new("world", 0, 0), None);
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn test_jsonl_output() {
        let mut log = EventLog::new();
        log.after(
            &HookEvent::new(HookEventKind::WarStart, FactionId(1)).counterpart(FactionId(2)),
        );
        log.after(&HookEvent::new(HookEventKind::Claim, FactionId(1)));

        let mut buf = Vec::new();
        log.write_jsonl(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // The claim without a cell was dropped
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            r#"{"type":"war_started","seq":0,"attacker":1,"target":2}"#
        );
    }
}
