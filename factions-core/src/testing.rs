use crate::bounded::new_power;
use crate::config::FactionsConfig;
use crate::locks::LockedBlock;
use crate::power::{PlayerPowerRecord, PowerRules};
use crate::relations::RelationKind;
use crate::spatial::{BlockPos, ChunkKey};
use crate::state::{Faction, FactionId, PlayerId, Role, WorldState};
use std::collections::{BTreeMap, BTreeSet};

/// Fixture builder for tests and demos.
///
/// The first member added to a faction becomes its owner.
pub struct WorldBuilder {
    state: WorldState,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self {
            state: WorldState::new(&FactionsConfig::default()),
        }
    }

    pub fn tick(mut self, tick: u64) -> Self {
        self.state.tick = tick;
        self
    }

    pub fn with_faction(mut self, id: u32, name: &str) -> Self {
        let id = FactionId(id);
        self.state.factions.insert(
            id,
            Faction {
                id,
                name: name.to_string(),
                members: BTreeMap::new(),
                bonus_power: 0,
                home: None,
                autoclaim: false,
                neutral: false,
                gates: Vec::new(),
                alliance_requests: BTreeSet::new(),
                peace_offers: BTreeSet::new(),
                vassalization_offers: BTreeSet::new(),
            },
        );
        self.state.next_faction_id = self.state.next_faction_id.max(id.0 + 1);
        self
    }

    /// Add `player` to `faction` with a fixed power value.
    pub fn with_member(mut self, faction: u32, player: u64, power: i32) -> Self {
        let player = PlayerId(player);
        if let Some(f) = self.state.factions.get_mut(&FactionId(faction)) {
            let role = if f.members.is_empty() {
                Role::Owner
            } else {
                Role::Member
            };
            f.members.insert(player, role);
        }
        let max = self.state.power.rules().max_power;
        self.state.power.insert_record(PlayerPowerRecord {
            player,
            power: new_power(power, max),
            last_logout: None,
        });
        self
    }

    pub fn with_bonus_power(mut self, faction: u32, bonus: i32) -> Self {
        if let Some(f) = self.state.factions.get_mut(&FactionId(faction)) {
            f.bonus_power = bonus;
        }
        self
    }

    pub fn with_home(mut self, faction: u32, home: BlockPos) -> Self {
        if let Some(f) = self.state.factions.get_mut(&FactionId(faction)) {
            f.home = Some(home);
        }
        self
    }

    pub fn with_neutral(mut self, faction: u32) -> Self {
        if let Some(f) = self.state.factions.get_mut(&FactionId(faction)) {
            f.neutral = true;
        }
        self
    }

    pub fn with_claims(mut self, faction: u32, world: &str, cells: &[(i32, i32)]) -> Self {
        for (x, z) in cells {
            self.state
                .ledger
                .put(ChunkKey::new(world, *x, *z), FactionId(faction));
        }
        self
    }

    /// Set `a -> b` and its mirror `b -> a` in one go.
    pub fn with_relation(mut self, a: u32, b: u32, kind: RelationKind) -> Self {
        let mirror = match kind {
            RelationKind::Ally => RelationKind::Ally,
            RelationKind::Enemy => RelationKind::Enemy,
            RelationKind::Vassal => RelationKind::Liege,
            RelationKind::Liege => RelationKind::Vassal,
        };
        self.state.relations.set_relation(FactionId(a), FactionId(b), kind);
        self.state.relations.set_relation(FactionId(b), FactionId(a), mirror);
        self
    }

    pub fn with_lock(mut self, faction: u32, owner: u64, pos: BlockPos) -> Self {
        self.state.locks.lock(LockedBlock {
            pos,
            owner: PlayerId(owner),
            faction: FactionId(faction),
        });
        self
    }

    pub fn build(self) -> WorldState {
        self.state
    }

    /// Build with power rules taken from `config`.
    pub fn build_with_config(mut self, config: &FactionsConfig) -> WorldState {
        self.state.power.set_rules(PowerRules::from(config));
        self.state
    }
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}
