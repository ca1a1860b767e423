use crate::config::FactionsConfig;
use crate::ledger::ChunkLedger;
use crate::locks::LockRegistry;
use crate::power::{PowerEconomy, PowerRules};
use crate::relations::{RelationGraph, RelationKind};
use crate::spatial::{BlockPos, ChunkKey};
use crate::step::Scheduler;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Opaque faction identity. Allocated by [`WorldState::found_faction`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct FactionId(pub u32);

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque player identity supplied by the host.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Owner,
}

/// A named gate structure spanning two corner blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub name: String,
    pub corner_a: BlockPos,
    pub corner_b: BlockPos,
}

impl Gate {
    /// Whether the gate's bounding box overlaps `cell` (same world only).
    pub fn intersects(&self, cell: &ChunkKey) -> bool {
        if self.corner_a.world != cell.world || self.corner_b.world != cell.world {
            return false;
        }
        let a = self.corner_a.chunk();
        let b = self.corner_b.chunk();
        let (min_x, max_x) = (a.x.min(b.x), a.x.max(b.x));
        let (min_z, max_z) = (a.z.min(b.z), a.z.max(b.z));
        (min_x..=max_x).contains(&cell.x) && (min_z..=max_z).contains(&cell.z)
    }
}

/// A group of players holding land together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub members: BTreeMap<PlayerId, Role>,
    /// Flat bonus added to the members' summed power.
    pub bonus_power: i32,
    pub home: Option<BlockPos>,
    pub autoclaim: bool,
    pub neutral: bool,
    pub gates: Vec<Gate>,
    /// Factions that asked this one for an alliance.
    pub alliance_requests: BTreeSet<FactionId>,
    /// Factions that offered this one peace.
    pub peace_offers: BTreeSet<FactionId>,
    /// Factions this one has invited to become its vassal.
    pub vassalization_offers: BTreeSet<FactionId>,
}

impl Faction {
    pub fn new(id: FactionId, name: &str, owner: PlayerId) -> Self {
        let mut members = BTreeMap::new();
        members.insert(owner, Role::Owner);
        Self {
            id,
            name: name.to_string(),
            members,
            bonus_power: 0,
            home: None,
            autoclaim: false,
            neutral: false,
            gates: Vec::new(),
            alliance_requests: BTreeSet::new(),
            peace_offers: BTreeSet::new(),
            vassalization_offers: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.members
            .iter()
            .find(|(_, role)| **role == Role::Owner)
            .map(|(player, _)| *player)
    }

    pub fn is_member(&self, player: PlayerId) -> bool {
        self.members.contains_key(&player)
    }

    pub fn role_of(&self, player: PlayerId) -> Option<Role> {
        self.members.get(&player).copied()
    }

    pub fn home_in(&self, cell: &ChunkKey) -> bool {
        self.home.as_ref().is_some_and(|h| cell.contains(h))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreateFactionOutcome {
    Created { faction: FactionId },
    NameTaken,
    AlreadyInFaction { faction: FactionId },
}

/// What a disbandment removed from the world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisbandReport {
    pub chunks_released: usize,
    pub relations_purged: usize,
    pub locks_removed: usize,
}

/// Complete territorial state of one server.
///
/// The stores are owned here and handed by reference to the engine,
/// gate and diplomacy functions.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub tick: u64,
    pub factions: HashMap<FactionId, Faction>,
    pub ledger: ChunkLedger,
    pub relations: RelationGraph,
    pub power: PowerEconomy,
    pub locks: LockRegistry,
    /// Deferred tasks. Transient: not part of checkpoints.
    pub scheduler: Scheduler,
    pub next_faction_id: u32,
}

impl WorldState {
    pub fn new(config: &FactionsConfig) -> Self {
        Self {
            power: PowerEconomy::new(PowerRules::from(config)),
            next_faction_id: 1,
            ..Default::default()
        }
    }

    pub fn faction(&self, id: FactionId) -> Option<&Faction> {
        self.factions.get(&id)
    }

    pub fn faction_mut(&mut self, id: FactionId) -> Option<&mut Faction> {
        self.factions.get_mut(&id)
    }

    pub fn faction_of(&self, player: PlayerId) -> Option<FactionId> {
        self.factions
            .values()
            .filter(|f| f.is_member(player))
            .map(|f| f.id)
            .min()
    }

    pub fn faction_by_name(&self, name: &str) -> Option<FactionId> {
        self.factions
            .values()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.id)
    }

    pub fn held_chunks(&self, id: FactionId) -> usize {
        self.ledger.count_held_by(id)
    }

    /// The faction's own power: members plus bonus.
    fn own_power(&self, faction: &Faction) -> i64 {
        self.power.sum_for(faction.members.keys()) + faction.bonus_power as i64
    }

    /// Demesne limit of `id`. Unknown factions have none.
    ///
    /// Each direct vassal adds the configured percentage of its own power.
    pub fn cumulative_power(&self, id: FactionId) -> i64 {
        let Some(faction) = self.factions.get(&id) else {
            return 0;
        };
        let mut total = self.own_power(faction);
        let percent = self.power.rules().vassal_contribution_percent;
        if percent > 0 {
            for vassal in self.relations.vassals_of(id) {
                if let Some(v) = self.factions.get(&vassal) {
                    total += self.own_power(v).max(0) * percent / 100;
                }
            }
        }
        total
    }

    /// Strictly more chunks held than the demesne limit allows.
    pub fn is_over_limit(&self, id: FactionId) -> bool {
        self.held_chunks(id) as i64 > self.cumulative_power(id)
    }

    /// [`RelationGraph::vassalage_tree`] restricted to factions that still exist.
    pub fn vassalage_tree(&self, id: FactionId) -> BTreeSet<FactionId> {
        self.relations
            .vassalage_tree(id)
            .into_iter()
            .filter(|f| self.factions.contains_key(f))
            .collect()
    }

    pub fn is_player_in_vassalage_tree(&self, player: PlayerId, faction: FactionId) -> bool {
        self.faction_of(player)
            .is_some_and(|own| self.vassalage_tree(faction).contains(&own))
    }

    pub fn found_faction(
        &mut self,
        name: &str,
        owner: PlayerId,
        now: u64,
    ) -> CreateFactionOutcome {
        if let Some(faction) = self.faction_of(owner) {
            return CreateFactionOutcome::AlreadyInFaction { faction };
        }
        if self.faction_by_name(name).is_some() {
            return CreateFactionOutcome::NameTaken;
        }
        let id = FactionId(self.next_faction_id.max(1));
        self.next_faction_id = id.0 + 1;
        self.power.ensure_record(owner, now);
        self.factions.insert(id, Faction::new(id, name, owner));
        log::info!("Faction {} '{}' founded by {}", id, name, owner);
        CreateFactionOutcome::Created { faction: id }
    }

    /// Returns `false` if the faction is unknown or the player already belongs somewhere.
    pub fn add_member(&mut self, id: FactionId, player: PlayerId, now: u64) -> bool {
        if self.faction_of(player).is_some() {
            return false;
        }
        let Some(faction) = self.factions.get_mut(&id) else {
            return false;
        };
        faction.members.insert(player, Role::Member);
        self.power.ensure_record(player, now);
        log::info!("{} joined faction {}", player, id);
        true
    }

    /// Remove `player` from their faction. A faction left empty is disbanded;
    /// an owner leaving hands ownership to the next member.
    pub fn remove_member(&mut self, player: PlayerId) -> Option<FactionId> {
        let id = self.faction_of(player)?;
        let faction = self.factions.get_mut(&id)?;
        let role = faction.members.remove(&player);
        if faction.members.is_empty() {
            self.disband_faction(id);
        } else if role == Some(Role::Owner) {
            if let Some((_, next)) = faction.members.iter_mut().next() {
                *next = Role::Owner;
            }
        }
        log::info!("{} left faction {}", player, id);
        Some(id)
    }

    /// Delete `id` and everything that refers to it.
    pub fn disband_faction(&mut self, id: FactionId) -> Option<DisbandReport> {
        self.factions.remove(&id)?;
        let chunks_released = self.ledger.remove_all_held_by(id).len();
        let relations_purged = self.relations.purge(id);
        let locks_removed = self.locks.remove_owned_by_faction(id);
        for other in self.factions.values_mut() {
            other.alliance_requests.remove(&id);
            other.peace_offers.remove(&id);
            other.vassalization_offers.remove(&id);
        }
        log::info!(
            "Faction {} disbanded: {} chunks released, {} relations purged",
            id,
            chunks_released,
            relations_purged
        );
        Some(DisbandReport {
            chunks_released,
            relations_purged,
            locks_removed,
        })
    }

    /// Factions sorted by cumulative power, highest first; ties by id.
    pub fn ranked_factions(&self) -> Vec<(FactionId, i64)> {
        let mut ranked: Vec<(FactionId, i64)> = self
            .factions
            .keys()
            .map(|id| (*id, self.cumulative_power(*id)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    pub fn are_allied(&self, a: FactionId, b: FactionId) -> bool {
        self.relations.relation_of(a, b) == Some(RelationKind::Ally)
    }

    /// Compute a deterministic checksum of the world state.
    ///
    /// Identical states produce identical checksums regardless of map
    /// iteration order.
    pub fn checksum(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.next_faction_id.hash(&mut hasher);

        let mut ids: Vec<_> = self.factions.keys().collect();
        ids.sort();
        for id in ids {
            let f = &self.factions[id];
            id.hash(&mut hasher);
            f.name.hash(&mut hasher);
            f.members.hash(&mut hasher);
            f.bonus_power.hash(&mut hasher);
            f.home.hash(&mut hasher);
            f.neutral.hash(&mut hasher);
        }

        for claim in self.ledger.entries() {
            claim.key.hash(&mut hasher);
            claim.holder.hash(&mut hasher);
        }
        for edge in self.relations.edges() {
            edge.hash(&mut hasher);
        }
        for record in self.power.records() {
            record.player.hash(&mut hasher);
            record.power.get().hash(&mut hasher);
        }
        for lock in self.locks.entries() {
            lock.pos.hash(&mut hasher);
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::WorldBuilder;

    #[test]
    fn test_found_faction_rules() {
        let mut state = WorldState::new(&FactionsConfig::default());
        let id = match state.found_faction("Kingdom", PlayerId(1), 0) {
            CreateFactionOutcome::Created { faction } => faction,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(state.faction(id).and_then(|f| f.owner()), Some(PlayerId(1)));
        assert_eq!(
            state.found_faction("kingdom", PlayerId(2), 0),
            CreateFactionOutcome::NameTaken
        );
        assert_eq!(
            state.found_faction("Other", PlayerId(1), 0),
            CreateFactionOutcome::AlreadyInFaction { faction: id }
        );
        // New owner is observed at initial power
        assert_eq!(state.cumulative_power(id), 5);
    }

    #[test]
    fn test_cumulative_power_sums_members_and_bonus() {
        let state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 4)
            .with_member(1, 11, 3)
            .with_bonus_power(1, 2)
            .build();
        assert_eq!(state.cumulative_power(FactionId(1)), 9);
        assert_eq!(state.cumulative_power(FactionId(99)), 0);
    }

    #[test]
    fn test_vassal_contribution() {
        let config = FactionsConfig {
            vassal_contribution_percent: 50,
            ..Default::default()
        };
        let state = WorldBuilder::new()
            .with_faction(1, "Liege")
            .with_member(1, 10, 4)
            .with_faction(2, "Vassal")
            .with_member(2, 20, 6)
            .with_relation(2, 1, RelationKind::Liege)
            .build_with_config(&config);
        assert_eq!(state.cumulative_power(FactionId(1)), 4 + 3);
        assert_eq!(state.cumulative_power(FactionId(2)), 6);
    }

    #[test]
    fn test_over_limit_is_strict() {
        let state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 2)
            .with_claims(1, "world", &[(0, 0), (0, 1)])
            .build();
        assert!(!state.is_over_limit(FactionId(1)));

        let state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 2)
            .with_claims(1, "world", &[(0, 0), (0, 1), (0, 2)])
            .build();
        assert!(state.is_over_limit(FactionId(1)));
    }

    #[test]
    fn test_disband_purges_everything() {
        let mut state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 5)
            .with_faction(2, "B")
            .with_member(2, 20, 5)
            .with_claims(1, "world", &[(0, 0), (1, 0)])
            .with_relation(1, 2, RelationKind::Enemy)
            .with_lock(1, 10, BlockPos::new("world", 3, 64, 3))
            .build();
        if let Some(b) = state.faction_mut(FactionId(2)) {
            b.peace_offers.insert(FactionId(1));
        }

        let report = state.disband_faction(FactionId(1)).unwrap();
        assert_eq!(report.chunks_released, 2);
        assert_eq!(report.relations_purged, 2);
        assert_eq!(report.locks_removed, 1);
        assert!(state.ledger.is_empty());
        assert!(state.relations.edges().is_empty());
        assert!(state.faction(FactionId(2)).unwrap().peace_offers.is_empty());
        assert_eq!(state.disband_faction(FactionId(1)), None);
    }

    #[test]
    fn test_last_member_leaving_disbands() {
        let mut state = WorldBuilder::new()
            .with_faction(1, "A")
            .with_member(1, 10, 5)
            .with_member(1, 11, 5)
            .build();
        assert_eq!(state.remove_member(PlayerId(10)), Some(FactionId(1)));
        assert_eq!(
            state.faction(FactionId(1)).and_then(|f| f.owner()),
            Some(PlayerId(11))
        );
        state.remove_member(PlayerId(11));
        assert!(state.faction(FactionId(1)).is_none());
    }

    #[test]
    fn test_ranked_factions() {
        let state = WorldBuilder::new()
            .with_faction(1, "Small")
            .with_member(1, 10, 2)
            .with_faction(2, "Big")
            .with_member(2, 20, 9)
            .build();
        assert_eq!(
            state.ranked_factions(),
            vec![(FactionId(2), 9), (FactionId(1), 2)]
        );
    }

    #[test]
    fn test_gate_intersection() {
        let gate = Gate {
            name: "front".into(),
            corner_a: BlockPos::new("world", 10, 60, 10),
            corner_b: BlockPos::new("world", 20, 70, 10),
        };
        assert!(gate.intersects(&ChunkKey::new("world", 0, 0)));
        assert!(gate.intersects(&ChunkKey::new("world", 1, 0)));
        assert!(!gate.intersects(&ChunkKey::new("world", 2, 0)));
        assert!(!gate.intersects(&ChunkKey::new("nether", 0, 0)));
    }

    #[test]
    fn test_checksum_determinism_and_sensitivity() {
        let build = || {
            WorldBuilder::new()
                .with_faction(1, "A")
                .with_member(1, 10, 5)
                .with_claims(1, "world", &[(0, 0), (3, 4)])
                .build()
        };
        assert_eq!(build().checksum(), build().checksum());

        let mut changed = build();
        changed.ledger.put(ChunkKey::new("world", 9, 9), FactionId(1));
        assert_ne!(build().checksum(), changed.checksum());
    }

    #[test]
    fn test_player_in_vassalage_tree() {
        let state = WorldBuilder::new()
            .with_faction(1, "Liege")
            .with_member(1, 10, 5)
            .with_faction(2, "West")
            .with_member(2, 20, 5)
            .with_faction(3, "East")
            .with_member(3, 30, 5)
            .with_faction(4, "Outsider")
            .with_member(4, 40, 5)
            .with_relation(2, 1, RelationKind::Liege)
            .with_relation(3, 1, RelationKind::Liege)
            .build();

        // Sibling vassal and the shared liege
        assert!(state.is_player_in_vassalage_tree(PlayerId(30), FactionId(2)));
        assert!(state.is_player_in_vassalage_tree(PlayerId(10), FactionId(2)));
        assert!(!state.is_player_in_vassalage_tree(PlayerId(40), FactionId(2)));
        assert!(!state.is_player_in_vassalage_tree(PlayerId(99), FactionId(2)));
    }

    #[test]
    fn test_new_members_start_inactivity_clock() {
        let mut state = WorldState::new(&FactionsConfig::default());
        state.found_faction("Kingdom", PlayerId(1), 500);
        assert!(state.add_member(FactionId(1), PlayerId(2), 500));

        let nobody: std::collections::HashSet<PlayerId> = std::collections::HashSet::new();
        let lowered = state.power.decrease_sweep(&nobody, 500 + 1440 * 60 + 1);
        assert_eq!(lowered, 2);
        assert_eq!(state.cumulative_power(FactionId(1)), 8);
    }
}
