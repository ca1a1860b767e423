//! Read-only interaction policy for claimed land.
//!
//! The host's event layer asks [`AccessGate::query_access`] before letting a
//! player touch a block and decides itself whether to cancel.

use crate::config::FactionsConfig;
use crate::spatial::ChunkKey;
use crate::state::{FactionId, PlayerId, WorldState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    OpenContainer,
    UseDoor,
    UseMechanism,
    PlaceBlock,
    PlaceLadder,
    BreakBlock,
    Eat,
    Shield,
    Interact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Allow,
    Deny,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }
}

impl From<bool> for Access {
    fn from(allowed: bool) -> Self {
        if allowed {
            Access::Allow
        } else {
            Access::Deny
        }
    }
}

/// Title shown when a player crosses into different land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "alert", rename_all = "snake_case")]
pub enum TerritoryAlert {
    Wilderness,
    Entered { faction: FactionId, name: String },
}

pub struct AccessGate<'a> {
    state: &'a WorldState,
    config: &'a FactionsConfig,
}

impl<'a> AccessGate<'a> {
    pub fn new(state: &'a WorldState, config: &'a FactionsConfig) -> Self {
        Self { state, config }
    }

    pub fn query_access(
        &self,
        actor: PlayerId,
        cell: &ChunkKey,
        action: ActionCategory,
        bypass: bool,
    ) -> Access {
        if bypass {
            return Access::Allow;
        }
        let Some(holder) = self.state.ledger.get(cell) else {
            return Access::Allow;
        };
        let own = self.state.faction_of(actor);
        if own == Some(holder) {
            return Access::Allow;
        }
        if action == ActionCategory::UseDoor && self.config.non_members_can_interact_with_doors {
            return Access::Allow;
        }
        let Some(own) = own else {
            return Access::Deny;
        };

        let relations = &self.state.relations;
        if relations.is_ally(own, holder) {
            return self.config.ally_interaction_allowed.into();
        }
        if self.config.vassalage_tree_interaction_allowed
            && self.state.is_player_in_vassalage_tree(actor, holder)
        {
            return Access::Allow;
        }
        if relations.is_hostile(own, holder) {
            return self.enemy_whitelist(action).into();
        }
        Access::Deny
    }

    /// Actions an enemy may still take on hostile land.
    fn enemy_whitelist(&self, action: ActionCategory) -> bool {
        match action {
            ActionCategory::Eat | ActionCategory::Shield => true,
            ActionCategory::PlaceLadder => self.config.ladders_placeable_in_enemy_territory,
            _ => false,
        }
    }

    /// Liquids never flow from wilderness into claimed land or across a border.
    pub fn fluid_may_flow(&self, from: &ChunkKey, to: &ChunkKey) -> bool {
        match (self.state.ledger.get(from), self.state.ledger.get(to)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(b)) => a == b,
        }
    }

    /// The alert to show when moving from `from` to `to`, if the holder changed.
    pub fn territory_alert(&self, from: &ChunkKey, to: &ChunkKey) -> Option<TerritoryAlert> {
        let before = self.state.ledger.get(from);
        let after = self.state.ledger.get(to);
        if before == after {
            return None;
        }
        Some(match after {
            None => TerritoryAlert::Wilderness,
            Some(id) => TerritoryAlert::Entered {
                faction: id,
                name: self
                    .state
                    .faction(id)
                    .map(|f| f.name.clone())
                    .unwrap_or_default(),
            },
        })
    }
}
