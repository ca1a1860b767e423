//! # Factions Core
//!
//! Territory claims, a power economy and faction relations for
//! land-ownership game servers.
//!
//! Factions claim chunks, the sum of their members' power bounds how many
//! chunks they may hold, and a directed relation graph (ally, enemy, liege,
//! vassal) decides who may conquer whom.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Host server │────▶│ PlayerInputs │────▶│ step_world  │
//! │ (commands)  │     │ (commands)   │     │ (one tick)  │
//! └─────────────┘     └──────────────┘     └──────┬──────┘
//!                                                 │
//!                     ┌──────────────┐     ┌──────▼──────┐
//!                     │ ClaimHook    │◀────│ ClaimEngine │
//!                     │ (veto/log)   │     │ diplomacy   │
//!                     └──────────────┘     └──────┬──────┘
//!                                                 │
//!                                          ┌──────▼──────┐
//!                                          │ WorldState  │
//!                                          │ ledger      │
//!                                          │ relations   │
//!                                          │ power       │
//!                                          └─────────────┘
//! ```
//!
//! ## Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`WorldState`] | Factions plus the ledger, relation graph, power and lock stores |
//! | [`ClaimEngine`] | Claim, conquest and unclaim rules |
//! | [`AccessGate`] | Read-only interaction policy for claimed land |
//! | [`Command`] | Typed player requests |
//! | [`step_world`] | Advance one tick: commands, deferred tasks, power sweeps |
//! | [`ClaimHook`] | Pre-commit veto and post-commit notification |
//! | [`Checkpoint`] | Load/save boundary |

pub mod access;
pub mod bounded;
pub mod checkpoint;
pub mod claims;
pub mod config;
pub mod diplomacy;
pub mod event_log;
pub mod hooks;
pub mod input;
pub mod ledger;
pub mod locks;
pub mod power;
pub mod relations;
pub mod spatial;
pub mod state;
pub mod step;
pub mod testing;

pub use access::{Access, AccessGate, ActionCategory, TerritoryAlert};
pub use bounded::{new_power, BoundedInt};
pub use checkpoint::{Checkpoint, CheckpointError};
pub use claims::{
    ClaimEngine, ClaimOutcome, ConquestOutcome, LandOutcome, RadiusClaimSummary, UnclaimOutcome,
    UnclaimScope,
};
pub use config::{ConfigError, FactionsConfig};
pub use diplomacy::{DiplomacyOutcome, IndependenceOutcome};
pub use event_log::{EventLog, FactionEvent};
pub use hooks::{AllowAll, ClaimHook, HookEvent, HookEventKind, HookRegistry};
pub use input::{Command, PlayerInputs};
pub use ledger::ChunkLedger;
pub use power::{ActivityOracle, PowerEconomy};
pub use relations::{RelationGraph, RelationKind};
pub use spatial::{BlockPos, ChunkKey, RadiusShape};
pub use state::{Faction, FactionId, PlayerId, WorldState};
pub use step::{execute_command, on_chunk_enter, step_world, CommandOutcome, TickContext};
