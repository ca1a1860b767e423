//! Claim, conquest and unclaim rules over the chunk ledger.
//!
//! Every successful path runs in the same order: validate against ledger,
//! power and relations, ask the hook, then mutate. A veto therefore never
//! leaves a partial change behind.

use crate::config::FactionsConfig;
use crate::hooks::{ClaimHook, HookEvent, HookEventKind};
use crate::spatial::ChunkKey;
use crate::state::{FactionId, PlayerId, WorldState};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// Post-mutation held count and the demesne limit it was checked against.
    Claimed { held: usize, limit: i64 },
    AlreadyOwned,
    HeldByOther { holder: FactionId },
    DemesneLimitReached { held: usize, limit: i64 },
    UnknownFaction,
    Vetoed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConquestOutcome {
    Conquered {
        from: FactionId,
        held: usize,
        limit: i64,
    },
    NotAtWar { holder: FactionId },
    TargetNotOverExtended { holder: FactionId },
    SurroundedChunkProtected { holder: FactionId },
    DemesneLimitReached { held: usize, limit: i64 },
    /// The cell is unclaimed or already the requester's.
    NoTarget,
    UnknownFaction,
    Vetoed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnclaimOutcome {
    Unclaimed { count: usize },
    NotHeld,
    Vetoed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnclaimScope {
    /// One cell. `bypass` releases it from whichever faction holds it.
    Cell { cell: ChunkKey, bypass: bool },
    Radius { center: ChunkKey, radius: i64 },
    All,
}

/// Result of [`ClaimEngine::claim_or_conquer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LandOutcome {
    Claim(ClaimOutcome),
    Conquest(ConquestOutcome),
}

impl LandOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            LandOutcome::Claim(ClaimOutcome::Claimed { .. })
                | LandOutcome::Conquest(ConquestOutcome::Conquered { .. })
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RadiusClaimSummary {
    pub claimed: usize,
    pub conquered: usize,
    pub already_owned: usize,
    pub rejected: usize,
}

/// Whether all four cardinal neighbors of `cell` are held by `holder`.
pub fn is_surrounded(state: &WorldState, cell: &ChunkKey, holder: FactionId) -> bool {
    cell.neighbors()
        .iter()
        .all(|n| state.ledger.get(n) == Some(holder))
}

pub struct ClaimEngine<'a> {
    config: &'a FactionsConfig,
    hook: &'a mut dyn ClaimHook,
}

impl<'a> ClaimEngine<'a> {
    pub fn new(config: &'a FactionsConfig, hook: &'a mut dyn ClaimHook) -> Self {
        Self { config, hook }
    }

    /// `Some((held, limit))` if `faction` may not take another chunk.
    fn limit_reached(&self, state: &WorldState, faction: FactionId) -> Option<(usize, i64)> {
        if !self.config.demesne_limit_enabled {
            return None;
        }
        let held = state.held_chunks(faction);
        let limit = state.cumulative_power(faction);
        (held as i64 >= limit).then_some((held, limit))
    }

    /// Claim an unheld cell for `requester`.
    pub fn claim(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        cell: &ChunkKey,
        actor: Option<PlayerId>,
    ) -> ClaimOutcome {
        if state.faction(requester).is_none() {
            return ClaimOutcome::UnknownFaction;
        }
        match state.ledger.get(cell) {
            Some(holder) if holder == requester => return ClaimOutcome::AlreadyOwned,
            Some(holder) => return ClaimOutcome::HeldByOther { holder },
            None => {}
        }
        if let Some((held, limit)) = self.limit_reached(state, requester) {
            log::debug!(
                "Claim of {} by {} rejected: {} held, limit {}",
                cell,
                requester,
                held,
                limit
            );
            return ClaimOutcome::DemesneLimitReached { held, limit };
        }

        let event = HookEvent::new(HookEventKind::Claim, requester)
            .actor(actor)
            .cell(cell.clone());
        if !self.hook.before(&event) {
            log::debug!("Claim of {} by {} vetoed", cell, requester);
            return ClaimOutcome::Vetoed;
        }

        state.ledger.put(cell.clone(), requester);
        self.hook.after(&event);

        let held = state.held_chunks(requester);
        let limit = state.cumulative_power(requester);
        log::info!("{} claimed {} ({}/{})", requester, cell, held, limit);
        ClaimOutcome::Claimed { held, limit }
    }

    /// Take a cell from a hostile, over-extended faction.
    pub fn conquer(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        cell: &ChunkKey,
        actor: Option<PlayerId>,
    ) -> ConquestOutcome {
        if state.faction(requester).is_none() {
            return ConquestOutcome::UnknownFaction;
        }
        let holder = match state.ledger.get(cell) {
            Some(holder) if holder != requester => holder,
            _ => return ConquestOutcome::NoTarget,
        };
        if !state.relations.is_hostile(requester, holder) {
            return ConquestOutcome::NotAtWar { holder };
        }
        if !state.is_over_limit(holder) {
            return ConquestOutcome::TargetNotOverExtended { holder };
        }
        if self.config.surrounded_chunk_protection_enabled && is_surrounded(state, cell, holder) {
            return ConquestOutcome::SurroundedChunkProtected { holder };
        }
        if let Some((held, limit)) = self.limit_reached(state, requester) {
            return ConquestOutcome::DemesneLimitReached { held, limit };
        }

        let event = HookEvent::new(HookEventKind::Conquest, requester)
            .actor(actor)
            .counterpart(holder)
            .cell(cell.clone());
        if !self.hook.before(&event) {
            log::debug!("Conquest of {} by {} vetoed", cell, requester);
            return ConquestOutcome::Vetoed;
        }

        let locks = state.locks.purge_chunk(cell);
        state.ledger.put(cell.clone(), requester);
        let gates = remove_gates(state, holder, cell);
        self.hook.after(&event);

        let held = state.held_chunks(requester);
        let limit = state.cumulative_power(requester);
        log::info!(
            "{} conquered {} from {} ({} locks, {} gates removed)",
            requester,
            cell,
            holder,
            locks,
            gates
        );
        ConquestOutcome::Conquered {
            from: holder,
            held,
            limit,
        }
    }

    /// Claim if the cell is free or already ours, otherwise attempt conquest.
    pub fn claim_or_conquer(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        cell: &ChunkKey,
        actor: Option<PlayerId>,
    ) -> LandOutcome {
        match state.ledger.get(cell) {
            Some(holder) if holder != requester => {
                LandOutcome::Conquest(self.conquer(state, requester, cell, actor))
            }
            _ => LandOutcome::Claim(self.claim(state, requester, cell, actor)),
        }
    }

    /// Claim or conquer every cell in the configured shape around `center`.
    pub fn claim_radius(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        center: &ChunkKey,
        radius: i64,
        actor: Option<PlayerId>,
    ) -> RadiusClaimSummary {
        let radius = self.config.clamp_radius(radius);
        let mut summary = RadiusClaimSummary::default();
        for cell in center.cells_in_radius(radius, self.config.radius_shape) {
            match self.claim_or_conquer(state, requester, &cell, actor) {
                LandOutcome::Claim(ClaimOutcome::Claimed { .. }) => summary.claimed += 1,
                LandOutcome::Conquest(ConquestOutcome::Conquered { .. }) => {
                    summary.conquered += 1
                }
                LandOutcome::Claim(ClaimOutcome::AlreadyOwned) => summary.already_owned += 1,
                _ => summary.rejected += 1,
            }
        }
        summary
    }

    /// Administrative claim: ignores limits and relations, still vetoable.
    pub fn force_claim(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        cell: &ChunkKey,
        actor: Option<PlayerId>,
    ) -> ClaimOutcome {
        if state.faction(requester).is_none() {
            return ClaimOutcome::UnknownFaction;
        }
        let previous = state.ledger.get(cell);
        if previous == Some(requester) {
            return ClaimOutcome::AlreadyOwned;
        }

        let mut event = HookEvent::new(HookEventKind::ForceClaim, requester)
            .actor(actor)
            .cell(cell.clone());
        if let Some(prev) = previous {
            event = event.counterpart(prev);
        }
        if !self.hook.before(&event) {
            return ClaimOutcome::Vetoed;
        }

        if let Some(prev) = previous {
            release_cell(state, prev, cell);
        }
        state.ledger.put(cell.clone(), requester);
        self.hook.after(&event);

        let held = state.held_chunks(requester);
        let limit = state.cumulative_power(requester);
        log::info!("{} force-claimed {} (was {:?})", requester, cell, previous);
        ClaimOutcome::Claimed { held, limit }
    }

    pub fn unclaim(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        scope: &UnclaimScope,
        actor: Option<PlayerId>,
    ) -> UnclaimOutcome {
        match scope {
            UnclaimScope::Cell { cell, bypass } => {
                self.unclaim_cell(state, requester, cell, *bypass, actor)
            }
            UnclaimScope::Radius { center, radius } => {
                let radius = self.config.clamp_radius(*radius);
                let mut count = 0;
                let mut vetoed = false;
                for cell in center.cells_in_radius(radius, self.config.radius_shape) {
                    if state.ledger.get(&cell) != Some(requester) {
                        continue;
                    }
                    match self.unclaim_cell(state, requester, &cell, false, actor) {
                        UnclaimOutcome::Unclaimed { .. } => count += 1,
                        UnclaimOutcome::Vetoed => vetoed = true,
                        UnclaimOutcome::NotHeld => {}
                    }
                }
                match (count, vetoed) {
                    (0, true) => UnclaimOutcome::Vetoed,
                    (0, false) => UnclaimOutcome::NotHeld,
                    _ => UnclaimOutcome::Unclaimed { count },
                }
            }
            UnclaimScope::All => self.unclaim_all(state, requester, actor),
        }
    }

    fn unclaim_cell(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        cell: &ChunkKey,
        bypass: bool,
        actor: Option<PlayerId>,
    ) -> UnclaimOutcome {
        let holder = match state.ledger.get(cell) {
            Some(holder) if bypass || holder == requester => holder,
            _ => return UnclaimOutcome::NotHeld,
        };

        let event = HookEvent::new(HookEventKind::Unclaim, holder)
            .actor(actor)
            .cell(cell.clone());
        if !self.hook.before(&event) {
            log::debug!("Unclaim of {} by {} vetoed", cell, requester);
            return UnclaimOutcome::Vetoed;
        }

        release_cell(state, holder, cell);
        self.hook.after(&event);
        log::info!("{} released {}", holder, cell);
        UnclaimOutcome::Unclaimed { count: 1 }
    }

    /// Release every cell of `requester`, its home and all of its locks.
    ///
    /// The hook sees one batch event; a veto keeps everything.
    fn unclaim_all(
        &mut self,
        state: &mut WorldState,
        requester: FactionId,
        actor: Option<PlayerId>,
    ) -> UnclaimOutcome {
        if state.faction(requester).is_none() {
            return UnclaimOutcome::NotHeld;
        }
        let event = HookEvent::new(HookEventKind::UnclaimAll, requester).actor(actor);
        if !self.hook.before(&event) {
            return UnclaimOutcome::Vetoed;
        }

        let cells = state.ledger.remove_all_held_by(requester);
        let locks = state.locks.remove_owned_by_faction(requester);
        if let Some(faction) = state.faction_mut(requester) {
            faction.home = None;
            faction
                .gates
                .retain(|gate| !cells.iter().any(|cell| gate.intersects(cell)));
        }
        self.hook.after(&event);
        log::info!(
            "{} released all land: {} chunks, {} locks",
            requester,
            cells.len(),
            locks
        );
        UnclaimOutcome::Unclaimed { count: cells.len() }
    }
}

/// Drop the gates of `holder` that overlap `cell`.
fn remove_gates(state: &mut WorldState, holder: FactionId, cell: &ChunkKey) -> usize {
    let Some(faction) = state.faction_mut(holder) else {
        return 0;
    };
    let before = faction.gates.len();
    faction.gates.retain(|gate| !gate.intersects(cell));
    before - faction.gates.len()
}

/// Remove `cell` from the ledger along with the holder's structures in it.
fn release_cell(state: &mut WorldState, holder: FactionId, cell: &ChunkKey) {
    state.ledger.remove(cell);
    state.locks.purge_chunk(cell);
    remove_gates(state, holder, cell);
    if let Some(faction) = state.faction_mut(holder) {
        if faction.home_in(cell) {
            faction.home = None;
        }
    }
}

#[cfg(test)]
#[path = "claims_tests.rs"]
mod tests;
