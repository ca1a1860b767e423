//! Timed requests read from a JSONL script.
//!
//! ```json
//! {"tick":1,"event":"login","player":7}
//! {"tick":1,"event":"command","player":7,"command":{"type":"create_faction","name":"Ravens"}}
//! ```

use factions_core::{Command, PlayerId, PlayerInputs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEntry {
    Login {
        tick: u64,
        player: PlayerId,
    },
    Logout {
        tick: u64,
        player: PlayerId,
    },
    Command {
        tick: u64,
        player: PlayerId,
        command: Command,
    },
}

impl ScriptEntry {
    pub fn tick(&self) -> u64 {
        match self {
            ScriptEntry::Login { tick, .. }
            | ScriptEntry::Logout { tick, .. }
            | ScriptEntry::Command { tick, .. } => *tick,
        }
    }
}

/// Everything the script does during a single tick.
#[derive(Debug, Default, Clone)]
pub struct TickBatch {
    pub logins: Vec<PlayerId>,
    pub logouts: Vec<PlayerId>,
    pub inputs: Vec<PlayerInputs>,
}

/// Script entries grouped by tick, preserving file order within a tick.
#[derive(Debug, Default)]
pub struct Script {
    batches: BTreeMap<u64, TickBatch>,
}

impl Script {
    pub fn last_tick(&self) -> Option<u64> {
        self.batches.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Batches due at or before `tick`, merged in tick order.
    pub fn take_through(&mut self, tick: u64) -> TickBatch {
        let later = self.batches.split_off(&(tick + 1));
        let due = std::mem::replace(&mut self.batches, later);
        let mut merged = TickBatch::default();
        for (_, batch) in due {
            merged.logins.extend(batch.logins);
            merged.logouts.extend(batch.logouts);
            merged.inputs.extend(batch.inputs);
        }
        merged
    }
}

impl FromIterator<ScriptEntry> for Script {
    fn from_iter<I: IntoIterator<Item = ScriptEntry>>(iter: I) -> Self {
        let mut batches: BTreeMap<u64, TickBatch> = BTreeMap::new();
        for entry in iter {
            let batch = batches.entry(entry.tick()).or_default();
            match entry {
                ScriptEntry::Login { player, .. } => batch.logins.push(player),
                ScriptEntry::Logout { player, .. } => batch.logouts.push(player),
                ScriptEntry::Command {
                    player, command, ..
                } => match batch.inputs.last_mut() {
                    // Consecutive commands from one player share an input
                    Some(last) if last.player == player => last.commands.push(command),
                    _ => batch.inputs.push(PlayerInputs {
                        player,
                        commands: vec![command],
                    }),
                },
            }
        }
        Self { batches }
    }
}
