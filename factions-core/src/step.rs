use crate::access::{Access, AccessGate, TerritoryAlert};
use crate::claims::{
    ClaimEngine, ClaimOutcome, LandOutcome, RadiusClaimSummary, UnclaimOutcome, UnclaimScope,
};
use crate::config::FactionsConfig;
use crate::diplomacy::{self, DiplomacyOutcome, IndependenceOutcome};
use crate::hooks::ClaimHook;
use crate::input::{Command, PlayerInputs};
use crate::locks::LockedBlock;
use crate::power::ActivityOracle;
use crate::spatial::ChunkKey;
use crate::state::{CreateFactionOutcome, DisbandReport, FactionId, Gate, PlayerId, WorldState};
use serde::Serialize;
use std::collections::BTreeMap;

/// Work deferred to a later tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledTask {
    AutoClaim {
        player: PlayerId,
        faction: FactionId,
        cell: ChunkKey,
    },
}

/// Deferred tasks keyed by the tick they become due.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    tasks: BTreeMap<u64, Vec<ScheduledTask>>,
}

impl Scheduler {
    pub fn schedule(&mut self, due: u64, task: ScheduledTask) {
        self.tasks.entry(due).or_default().push(task);
    }

    /// Remove and return every task due at or before `tick`, oldest first.
    pub fn take_due(&mut self, tick: u64) -> Vec<ScheduledTask> {
        let later = self.tasks.split_off(&(tick.saturating_add(1)));
        let due = std::mem::replace(&mut self.tasks, later);
        due.into_values().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Everything a tick needs besides the world itself.
pub struct TickContext<'a> {
    pub config: &'a FactionsConfig,
    pub hook: &'a mut dyn ClaimHook,
    pub oracle: &'a dyn ActivityOracle,
    /// Wall clock in epoch seconds, used for inactivity decay.
    pub now: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AutoClaimDecision {
    NotApplicable,
    Scheduled { due: u64 },
    LimitReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub alert: Option<TerritoryAlert>,
    pub autoclaim: AutoClaimDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum CommandOutcome {
    Created(CreateFactionOutcome),
    Land(LandOutcome),
    Claim(ClaimOutcome),
    RadiusClaim(RadiusClaimSummary),
    Unclaim(UnclaimOutcome),
    Diplomacy(DiplomacyOutcome),
    Independence(IndependenceOutcome),
    Access(Access),
    Move(MoveReport),
    Disbanded(DisbandReport),
    Done,
    NoFaction,
    Rejected(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub increased: usize,
    pub decreased: usize,
    pub disbanded: Vec<FactionId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub outcomes: Vec<(PlayerId, CommandOutcome)>,
    pub auto_claims: Vec<LandOutcome>,
    pub sweep: Option<SweepReport>,
}

/// Advance the world by one tick.
///
/// Order: player commands, then deferred tasks due this tick, then the
/// periodic power sweep.
pub fn step_world(
    state: &mut WorldState,
    inputs: &[PlayerInputs],
    ctx: &mut TickContext<'_>,
) -> TickReport {
    state.tick += 1;
    let mut report = TickReport {
        tick: state.tick,
        ..Default::default()
    };

    for player_input in inputs {
        for cmd in &player_input.commands {
            let outcome = execute_command(state, player_input.player, cmd, ctx);
            log::debug!("{} {:?} -> {:?}", player_input.player, cmd, outcome);
            report.outcomes.push((player_input.player, outcome));
        }
    }

    for task in state.scheduler.take_due(state.tick) {
        if let Some(outcome) = run_task(state, task, ctx) {
            report.auto_claims.push(outcome);
        }
    }

    let interval = ctx.config.sweep_interval();
    if interval > 0 && state.tick % interval == 0 {
        report.sweep = Some(run_power_sweep(state, ctx));
    }

    report
}

fn run_task(
    state: &mut WorldState,
    task: ScheduledTask,
    ctx: &mut TickContext<'_>,
) -> Option<LandOutcome> {
    match task {
        ScheduledTask::AutoClaim {
            player,
            faction,
            cell,
        } => {
            let still_owner = state
                .faction(faction)
                .is_some_and(|f| f.autoclaim && f.owner() == Some(player));
            if !still_owner {
                log::debug!("Dropping auto-claim of {} for vanished {}", cell, faction);
                return None;
            }
            let mut engine = ClaimEngine::new(ctx.config, &mut *ctx.hook);
            Some(engine.claim_or_conquer(state, faction, &cell, Some(player)))
        }
    }
}

#[tracing::instrument(skip_all, name = "power_sweep")]
fn run_power_sweep(state: &mut WorldState, ctx: &TickContext<'_>) -> SweepReport {
    let increased = state.power.increase_sweep(ctx.oracle);
    let decreased = state.power.decrease_sweep(ctx.oracle, ctx.now);
    let disbanded = if ctx.config.disband_zero_power_factions {
        diplomacy::disband_zero_power_factions(state)
    } else {
        Vec::new()
    };
    log::info!(
        "Power sweep at tick {}: +{} -{} disbanded {}",
        state.tick,
        increased,
        decreased,
        disbanded.len()
    );
    SweepReport {
        increased,
        decreased,
        disbanded,
    }
}

/// Report what a player crossing from `from` into `to` should see, and
/// schedule an auto-claim of `to` for the next tick when it applies.
pub fn on_chunk_enter(
    state: &mut WorldState,
    config: &FactionsConfig,
    player: PlayerId,
    from: &ChunkKey,
    to: &ChunkKey,
) -> MoveReport {
    let alert = AccessGate::new(state, config).territory_alert(from, to);
    let autoclaim = autoclaim_decision(state, config, player, from, to);
    MoveReport { alert, autoclaim }
}

fn autoclaim_decision(
    state: &mut WorldState,
    config: &FactionsConfig,
    player: PlayerId,
    from: &ChunkKey,
    to: &ChunkKey,
) -> AutoClaimDecision {
    if from == to {
        return AutoClaimDecision::NotApplicable;
    }
    let Some(faction) = state.faction_of(player) else {
        return AutoClaimDecision::NotApplicable;
    };
    let applies = state
        .faction(faction)
        .is_some_and(|f| f.autoclaim && f.owner() == Some(player));
    if !applies || state.ledger.get(to) == Some(faction) {
        return AutoClaimDecision::NotApplicable;
    }
    if config.demesne_limit_enabled
        && state.held_chunks(faction) as i64 >= state.cumulative_power(faction)
    {
        return AutoClaimDecision::LimitReached;
    }
    let due = state.tick + 1;
    state.scheduler.schedule(
        due,
        ScheduledTask::AutoClaim {
            player,
            faction,
            cell: to.clone(),
        },
    );
    AutoClaimDecision::Scheduled { due }
}

/// Apply one command on behalf of `player`.
pub fn execute_command(
    state: &mut WorldState,
    player: PlayerId,
    cmd: &Command,
    ctx: &mut TickContext<'_>,
) -> CommandOutcome {
    state.power.ensure_record(player, ctx.now);
    let own = state.faction_of(player);
    let config = ctx.config;

    // Commands that do not need the player to belong to a faction.
    match cmd {
        Command::CreateFaction { name } => {
            return CommandOutcome::Created(state.found_faction(name, player, ctx.now));
        }
        Command::JoinFaction { faction } => {
            return if state.add_member(*faction, player, ctx.now) {
                CommandOutcome::Done
            } else {
                CommandOutcome::Rejected(format!("cannot join {}", faction))
            };
        }
        Command::SetBonusPower { faction, amount } => {
            return match state.faction_mut(*faction) {
                Some(f) => {
                    f.bonus_power = *amount;
                    CommandOutcome::Done
                }
                None => CommandOutcome::Rejected(format!("unknown faction {}", faction)),
            };
        }
        Command::ForceClaim { at, faction } => {
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            return CommandOutcome::Claim(engine.force_claim(
                state,
                *faction,
                &at.chunk(),
                Some(player),
            ));
        }
        Command::Unclaim { at, bypass: true } => {
            let scope = UnclaimScope::Cell {
                cell: at.chunk(),
                bypass: true,
            };
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            return CommandOutcome::Unclaim(engine.unclaim(
                state,
                own.unwrap_or_default(),
                &scope,
                Some(player),
            ));
        }
        Command::UnclaimAll {
            faction: Some(faction),
        } => {
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            return CommandOutcome::Unclaim(engine.unclaim(
                state,
                *faction,
                &UnclaimScope::All,
                Some(player),
            ));
        }
        Command::Disband {
            faction: Some(faction),
        } => {
            return match state.disband_faction(*faction) {
                Some(report) => CommandOutcome::Disbanded(report),
                None => CommandOutcome::Rejected(format!("unknown faction {}", faction)),
            };
        }
        Command::Move { from, to } => {
            return CommandOutcome::Move(on_chunk_enter(
                state,
                config,
                player,
                &from.chunk(),
                &to.chunk(),
            ));
        }
        Command::CheckAccess { at, action, bypass } => {
            let gate = AccessGate::new(state, config);
            return CommandOutcome::Access(gate.query_access(
                player,
                &at.chunk(),
                *action,
                *bypass,
            ));
        }
        _ => {}
    }

    let Some(own) = own else {
        return CommandOutcome::NoFaction;
    };

    match cmd {
        Command::LeaveFaction => {
            state.remove_member(player);
            CommandOutcome::Done
        }
        Command::SetNeutral { neutral } => {
            if !config.allow_neutrality {
                return CommandOutcome::Rejected("neutrality is disabled".into());
            }
            if let Some(f) = state.faction_mut(own) {
                f.neutral = *neutral;
            }
            CommandOutcome::Done
        }
        Command::Disband { faction: None } => match state.disband_faction(own) {
            Some(report) => CommandOutcome::Disbanded(report),
            None => CommandOutcome::NoFaction,
        },
        Command::Claim { at } => {
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            CommandOutcome::Land(engine.claim_or_conquer(state, own, &at.chunk(), Some(player)))
        }
        Command::ClaimRadius { at, radius } => {
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            CommandOutcome::RadiusClaim(engine.claim_radius(
                state,
                own,
                &at.chunk(),
                *radius,
                Some(player),
            ))
        }
        Command::Unclaim { at, .. } => {
            let scope = UnclaimScope::Cell {
                cell: at.chunk(),
                bypass: false,
            };
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            CommandOutcome::Unclaim(engine.unclaim(state, own, &scope, Some(player)))
        }
        Command::UnclaimRadius { at, radius } => {
            let scope = UnclaimScope::Radius {
                center: at.chunk(),
                radius: *radius,
            };
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            CommandOutcome::Unclaim(engine.unclaim(state, own, &scope, Some(player)))
        }
        Command::UnclaimAll { .. } => {
            let mut engine = ClaimEngine::new(config, &mut *ctx.hook);
            CommandOutcome::Unclaim(engine.unclaim(state, own, &UnclaimScope::All, Some(player)))
        }
        Command::ToggleAutoClaim => {
            if let Some(f) = state.faction_mut(own) {
                f.autoclaim = !f.autoclaim;
            }
            CommandOutcome::Done
        }
        Command::SetHome { at } => {
            if state.ledger.get(&at.chunk()) != Some(own) {
                return CommandOutcome::Rejected("home must be on own land".into());
            }
            if let Some(f) = state.faction_mut(own) {
                f.home = Some(at.clone());
            }
            CommandOutcome::Done
        }
        Command::LockBlock { at } => {
            if state.ledger.get(&at.chunk()) != Some(own) {
                return CommandOutcome::Rejected("can only lock blocks on own land".into());
            }
            let locked = state.locks.lock(LockedBlock {
                pos: at.clone(),
                owner: player,
                faction: own,
            });
            if locked {
                CommandOutcome::Done
            } else {
                CommandOutcome::Rejected(format!("{} is already locked", at))
            }
        }
        Command::UnlockBlock { at } => {
            let permitted = state
                .locks
                .get(at)
                .map(|lock| lock.owner == player || lock.faction == own);
            match permitted {
                Some(true) => {
                    state.locks.unlock(at);
                    CommandOutcome::Done
                }
                Some(false) => {
                    CommandOutcome::Rejected(format!("{} is locked by another faction", at))
                }
                None => CommandOutcome::Rejected(format!("{} is not locked", at)),
            }
        }
        Command::AddGate {
            name,
            corner_a,
            corner_b,
        } => {
            let on_own_land = [corner_a, corner_b]
                .iter()
                .all(|c| state.ledger.get(&c.chunk()) == Some(own));
            if !on_own_land || corner_a.world != corner_b.world {
                return CommandOutcome::Rejected("gate corners must be on own land".into());
            }
            if let Some(f) = state.faction_mut(own) {
                f.gates.push(Gate {
                    name: name.clone(),
                    corner_a: corner_a.clone(),
                    corner_b: corner_b.clone(),
                });
            }
            CommandOutcome::Done
        }
        Command::RequestAlliance { target } => {
            CommandOutcome::Diplomacy(diplomacy::request_alliance(state, own, *target))
        }
        Command::BreakAlliance { target } => {
            CommandOutcome::Diplomacy(diplomacy::break_alliance(state, own, *target))
        }
        Command::DeclareWar { target } => CommandOutcome::Diplomacy(diplomacy::declare_war(
            state,
            config,
            &mut *ctx.hook,
            own,
            *target,
            Some(player),
        )),
        Command::OfferPeace { target } => {
            CommandOutcome::Diplomacy(diplomacy::offer_peace(state, own, *target))
        }
        Command::OfferVassalization { target } => {
            CommandOutcome::Diplomacy(diplomacy::offer_vassalization(state, own, *target))
        }
        Command::SwearFealty { liege } => {
            CommandOutcome::Diplomacy(diplomacy::swear_fealty(state, own, *liege))
        }
        Command::ReleaseVassal { vassal } => {
            CommandOutcome::Diplomacy(diplomacy::release_vassal(state, own, *vassal))
        }
        Command::DeclareIndependence => CommandOutcome::Independence(
            diplomacy::declare_independence(state, config, &mut *ctx.hook, own, Some(player)),
        ),
        // Handled above
        Command::CreateFaction { .. }
        | Command::JoinFaction { .. }
        | Command::SetBonusPower { .. }
        | Command::ForceClaim { .. }
        | Command::Disband { .. }
        | Command::Move { .. }
        | Command::CheckAccess { .. } => CommandOutcome::Done,
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
