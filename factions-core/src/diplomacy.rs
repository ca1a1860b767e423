//! Relation changes between factions.
//!
//! The relation graph stores directed edges only; every function here
//! updates both directions of a pair in the same call so that Ally/Enemy
//! stay symmetric and every `Liege` edge has its `Vassal` mirror.

use crate::config::FactionsConfig;
use crate::hooks::{ClaimHook, HookEvent, HookEventKind};
use crate::relations::RelationKind;
use crate::state::{FactionId, PlayerId, WorldState};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DiplomacyOutcome {
    AllianceRequested,
    AllianceFormed,
    AllianceBroken,
    /// Factions pulled into the war on the target's side.
    WarDeclared { dragged_in: Vec<FactionId> },
    PeaceOffered,
    PeaceMade,
    VassalizationOffered,
    VassalSworn,
    VassalReleased,
    UnknownFaction,
    SameFaction,
    AlreadyRelated { kind: RelationKind },
    NotRelated,
    Neutral { faction: FactionId },
    InVassalageTree,
    AlreadyHasLiege,
    NoPendingOffer,
    WouldCreateCycle,
    Vetoed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndependenceOutcome {
    Declared {
        former_liege: FactionId,
        at_war: bool,
        /// The former liege's vassalage tree, to be told about the declaration.
        informed: Vec<FactionId>,
    },
    NotAVassal,
    UnknownFaction,
}

fn check_pair(state: &WorldState, a: FactionId, b: FactionId) -> Option<DiplomacyOutcome> {
    if state.faction(a).is_none() || state.faction(b).is_none() {
        return Some(DiplomacyOutcome::UnknownFaction);
    }
    if a == b {
        return Some(DiplomacyOutcome::SameFaction);
    }
    None
}

fn set_mutual(state: &mut WorldState, a: FactionId, b: FactionId, kind: RelationKind) {
    state.relations.set_relation(a, b, kind);
    state.relations.set_relation(b, a, kind);
    clear_offers(state, a, b);
}

fn clear_mutual(state: &mut WorldState, a: FactionId, b: FactionId) {
    state.relations.clear_relation(a, b);
    state.relations.clear_relation(b, a);
}

/// Drop every pending offer between `a` and `b`.
fn clear_offers(state: &mut WorldState, a: FactionId, b: FactionId) {
    for (x, y) in [(a, b), (b, a)] {
        if let Some(f) = state.faction_mut(x) {
            f.alliance_requests.remove(&y);
            f.peace_offers.remove(&y);
            f.vassalization_offers.remove(&y);
        }
    }
}

fn is_neutral(state: &WorldState, config: &FactionsConfig, id: FactionId) -> bool {
    config.allow_neutrality && state.faction(id).is_some_and(|f| f.neutral)
}

/// Ask `to` for an alliance. A request answering an earlier one from `to` forms it.
pub fn request_alliance(state: &mut WorldState, from: FactionId, to: FactionId) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, from, to) {
        return rejected;
    }
    if let Some(kind) = state.relations.relation_of(from, to) {
        return DiplomacyOutcome::AlreadyRelated { kind };
    }
    let answered = state
        .faction(from)
        .is_some_and(|f| f.alliance_requests.contains(&to));
    if answered {
        set_mutual(state, from, to, RelationKind::Ally);
        log::info!("{} and {} are now allied", from, to);
        return DiplomacyOutcome::AllianceFormed;
    }
    if let Some(target) = state.faction_mut(to) {
        target.alliance_requests.insert(from);
    }
    DiplomacyOutcome::AllianceRequested
}

pub fn break_alliance(state: &mut WorldState, a: FactionId, b: FactionId) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, a, b) {
        return rejected;
    }
    if !state.relations.is_ally(a, b) {
        return DiplomacyOutcome::NotRelated;
    }
    clear_mutual(state, a, b);
    log::info!("{} broke its alliance with {}", a, b);
    DiplomacyOutcome::AllianceBroken
}

/// Make `attacker` and `target` enemies.
///
/// The target's vassalage tree and its allies join the war against the
/// attacker, except neutral factions, members of the attacker's own tree,
/// and factions that already have a relation with the attacker.
pub fn declare_war(
    state: &mut WorldState,
    config: &FactionsConfig,
    hook: &mut dyn ClaimHook,
    attacker: FactionId,
    target: FactionId,
    actor: Option<PlayerId>,
) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, attacker, target) {
        return rejected;
    }
    match state.relations.relation_of(attacker, target) {
        Some(kind @ (RelationKind::Enemy | RelationKind::Ally)) => {
            return DiplomacyOutcome::AlreadyRelated { kind };
        }
        _ => {}
    }
    let attacker_tree = state.vassalage_tree(attacker);
    if attacker_tree.contains(&target) {
        return DiplomacyOutcome::InVassalageTree;
    }
    for side in [target, attacker] {
        if is_neutral(state, config, side) {
            return DiplomacyOutcome::Neutral { faction: side };
        }
    }

    let event = HookEvent::new(HookEventKind::WarStart, attacker)
        .actor(actor)
        .counterpart(target);
    if !hook.before(&event) {
        log::debug!("War of {} on {} vetoed", attacker, target);
        return DiplomacyOutcome::Vetoed;
    }

    set_mutual(state, attacker, target, RelationKind::Enemy);

    let view: &WorldState = state;
    let mut candidates = view.vassalage_tree(target);
    candidates.extend(view.relations.peers_with(target, RelationKind::Ally));
    let dragged_in: Vec<FactionId> = candidates
        .into_iter()
        .filter(|f| *f != target && *f != attacker)
        .filter(|f| !attacker_tree.contains(f))
        .filter(|f| !is_neutral(view, config, *f))
        .filter(|f| view.relations.relation_of(attacker, *f).is_none())
        .filter(|f| view.faction(*f).is_some())
        .collect();
    for faction in &dragged_in {
        set_mutual(state, attacker, *faction, RelationKind::Enemy);
    }
    hook.after(&event);

    log::info!(
        "{} declared war on {} ({} dragged in)",
        attacker,
        target,
        dragged_in.len()
    );
    DiplomacyOutcome::WarDeclared { dragged_in }
}

/// Offer peace to an enemy. A matching offer from the other side ends the war.
pub fn offer_peace(state: &mut WorldState, from: FactionId, to: FactionId) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, from, to) {
        return rejected;
    }
    if !state.relations.is_hostile(from, to) {
        return DiplomacyOutcome::NotRelated;
    }
    let answered = state
        .faction(from)
        .is_some_and(|f| f.peace_offers.contains(&to));
    if answered {
        clear_mutual(state, from, to);
        clear_offers(state, from, to);
        log::info!("{} and {} made peace", from, to);
        return DiplomacyOutcome::PeaceMade;
    }
    if let Some(target) = state.faction_mut(to) {
        target.peace_offers.insert(from);
    }
    DiplomacyOutcome::PeaceOffered
}

pub fn offer_vassalization(
    state: &mut WorldState,
    liege: FactionId,
    target: FactionId,
) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, liege, target) {
        return rejected;
    }
    if state.relations.relation_of(liege, target) == Some(RelationKind::Vassal) {
        return DiplomacyOutcome::AlreadyRelated {
            kind: RelationKind::Vassal,
        };
    }
    if state.relations.liege_of(target).is_some() {
        return DiplomacyOutcome::AlreadyHasLiege;
    }
    if state.relations.descendants(target).contains(&liege) {
        return DiplomacyOutcome::WouldCreateCycle;
    }
    if let Some(f) = state.faction_mut(liege) {
        f.vassalization_offers.insert(target);
    }
    DiplomacyOutcome::VassalizationOffered
}

/// Accept a pending vassalization offer from `liege`.
pub fn swear_fealty(state: &mut WorldState, vassal: FactionId, liege: FactionId) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, vassal, liege) {
        return rejected;
    }
    let offered = state
        .faction(liege)
        .is_some_and(|f| f.vassalization_offers.contains(&vassal));
    if !offered {
        return DiplomacyOutcome::NoPendingOffer;
    }
    if state.relations.liege_of(vassal).is_some() {
        return DiplomacyOutcome::AlreadyHasLiege;
    }
    if state.relations.descendants(vassal).contains(&liege) {
        return DiplomacyOutcome::WouldCreateCycle;
    }

    state.relations.set_relation(liege, vassal, RelationKind::Vassal);
    state.relations.set_relation(vassal, liege, RelationKind::Liege);
    clear_offers(state, liege, vassal);
    log::info!("{} swore fealty to {}", vassal, liege);
    DiplomacyOutcome::VassalSworn
}

pub fn release_vassal(state: &mut WorldState, liege: FactionId, vassal: FactionId) -> DiplomacyOutcome {
    if let Some(rejected) = check_pair(state, liege, vassal) {
        return rejected;
    }
    if state.relations.relation_of(liege, vassal) != Some(RelationKind::Vassal) {
        return DiplomacyOutcome::NotRelated;
    }
    clear_mutual(state, liege, vassal);
    log::info!("{} released vassal {}", liege, vassal);
    DiplomacyOutcome::VassalReleased
}

/// Break `vassal` away from its liege.
///
/// Unless neutrality keeps the peace, the two become enemies (the war start
/// is vetoable; a veto leaves them merely unrelated).
pub fn declare_independence(
    state: &mut WorldState,
    config: &FactionsConfig,
    hook: &mut dyn ClaimHook,
    vassal: FactionId,
    actor: Option<PlayerId>,
) -> IndependenceOutcome {
    if state.faction(vassal).is_none() {
        return IndependenceOutcome::UnknownFaction;
    }
    let Some(liege) = state.relations.liege_of(vassal) else {
        return IndependenceOutcome::NotAVassal;
    };
    if state.faction(liege).is_none() {
        log::warn!("{} recorded missing liege {}; dropping edge", vassal, liege);
        clear_mutual(state, vassal, liege);
        return IndependenceOutcome::NotAVassal;
    }

    let informed: Vec<FactionId> = state
        .vassalage_tree(liege)
        .into_iter()
        .filter(|f| *f != vassal)
        .collect();
    clear_mutual(state, vassal, liege);
    clear_offers(state, vassal, liege);

    let peaceful = config.allow_neutrality
        && (is_neutral(state, config, vassal) || is_neutral(state, config, liege));
    let mut at_war = false;
    if !peaceful {
        let event = HookEvent::new(HookEventKind::WarStart, vassal)
            .actor(actor)
            .counterpart(liege);
        if hook.before(&event) {
            set_mutual(state, vassal, liege, RelationKind::Enemy);
            hook.after(&event);
            at_war = true;
        }
    }

    log::info!(
        "{} declared independence from {} (war: {})",
        vassal,
        liege,
        at_war
    );
    IndependenceOutcome::Declared {
        former_liege: liege,
        at_war,
        informed,
    }
}

/// Disband every faction whose cumulative power is zero or less.
#[tracing::instrument(skip_all, name = "disband_zero_power")]
pub fn disband_zero_power_factions(state: &mut WorldState) -> Vec<FactionId> {
    let mut doomed: Vec<FactionId> = state
        .factions
        .keys()
        .copied()
        .filter(|id| state.cumulative_power(*id) <= 0)
        .collect();
    doomed.sort();
    for id in &doomed {
        state.disband_faction(*id);
    }
    doomed
}
