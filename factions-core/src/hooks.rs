//! Pre-commit veto hooks.
//!
//! Every territory mutation and every war start is announced to a
//! [`ClaimHook`] before anything changes. A hook answering `false` aborts the
//! whole operation. Hooks receive the event by shared reference while the
//! engine holds the world mutably, so a hook cannot call back into the
//! engine on the same world mid-operation.
//!
//! ```text
//! ClaimHook trait
//!        │
//!        ├── AllowAll (default host)
//!        ├── EventLog (records committed events)
//!        └── HookRegistry (fans out, ANDs answers)
//! ```

use crate::spatial::ChunkKey;
use crate::state::{FactionId, PlayerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventKind {
    Claim,
    Conquest,
    ForceClaim,
    Unclaim,
    /// Batch release of every cell a faction holds.
    UnclaimAll,
    WarStart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookEvent {
    pub kind: HookEventKind,
    /// The faction gaining land, losing land, or declaring war.
    pub faction: FactionId,
    pub actor: Option<PlayerId>,
    /// Previous holder for conquest/force claim, target for war.
    pub counterpart: Option<FactionId>,
    pub cell: Option<ChunkKey>,
}

impl HookEvent {
    pub fn new(kind: HookEventKind, faction: FactionId) -> Self {
        Self {
            kind,
            faction,
            actor: None,
            counterpart: None,
            cell: None,
        }
    }

    pub fn actor(mut self, actor: Option<PlayerId>) -> Self {
        self.actor = actor;
        self
    }

    pub fn counterpart(mut self, counterpart: FactionId) -> Self {
        self.counterpart = Some(counterpart);
        self
    }

    pub fn cell(mut self, cell: ChunkKey) -> Self {
        self.cell = Some(cell);
        self
    }
}

pub trait ClaimHook {
    /// Called before the mutation. Return `false` to veto it.
    fn before(&mut self, event: &HookEvent) -> bool;

    /// Called after the mutation committed.
    fn after(&mut self, _event: &HookEvent) {}

    fn name(&self) -> &str;
}

/// Allows everything and observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl ClaimHook for AllowAll {
    fn before(&mut self, _event: &HookEvent) -> bool {
        true
    }

    fn name(&self) -> &str {
        "allow_all"
    }
}

/// Fans each event out to every registered hook.
///
/// All hooks see `before` even once one has vetoed; the answers are ANDed.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn ClaimHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self { hooks: vec![] }
    }

    pub fn register(&mut self, hook: Box<dyn ClaimHook>) {
        log::info!("Registered claim hook: {}", hook.name());
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Take the hooks back out, e.g. to flush an event log after a run.
    pub fn into_hooks(self) -> Vec<Box<dyn ClaimHook>> {
        self.hooks
    }
}

impl ClaimHook for HookRegistry {
    fn before(&mut self, event: &HookEvent) -> bool {
        let mut allowed = true;
        for hook in &mut self.hooks {
            if !hook.before(event) {
                log::debug!("{:?} vetoed by {}", event.kind, hook.name());
                allowed = false;
            }
        }
        allowed
    }

    fn after(&mut self, event: &HookEvent) {
        for hook in &mut self.hooks {
            hook.after(event);
        }
    }

    fn name(&self) -> &str {
        "registry"
    }
}
