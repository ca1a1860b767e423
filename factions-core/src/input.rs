use crate::access::ActionCategory;
use crate::spatial::BlockPos;
use crate::state::{FactionId, PlayerId};
use serde::{Deserialize, Serialize};

/// Commands issued by one player during a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInputs {
    pub player: PlayerId,
    pub commands: Vec<Command>,
}

/// A validated request from the host's command layer.
///
/// Locations are block positions; the chunk is derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // Membership
    CreateFaction {
        name: String,
    },
    JoinFaction {
        faction: FactionId,
    },
    LeaveFaction,
    SetNeutral {
        neutral: bool,
    },
    SetBonusPower {
        faction: FactionId,
        amount: i32,
    },
    Disband {
        faction: Option<FactionId>,
    },

    // Land
    Claim {
        at: BlockPos,
    },
    ClaimRadius {
        at: BlockPos,
        radius: i64,
    },
    ForceClaim {
        at: BlockPos,
        faction: FactionId,
    },
    Unclaim {
        at: BlockPos,
        #[serde(default)]
        bypass: bool,
    },
    UnclaimRadius {
        at: BlockPos,
        radius: i64,
    },
    /// Release all land of `faction`, or of the player's own faction.
    UnclaimAll {
        faction: Option<FactionId>,
    },
    ToggleAutoClaim,
    SetHome {
        at: BlockPos,
    },
    Move {
        from: BlockPos,
        to: BlockPos,
    },

    // Structures
    LockBlock {
        at: BlockPos,
    },
    UnlockBlock {
        at: BlockPos,
    },
    AddGate {
        name: String,
        corner_a: BlockPos,
        corner_b: BlockPos,
    },

    // Diplomacy
    RequestAlliance {
        target: FactionId,
    },
    BreakAlliance {
        target: FactionId,
    },
    DeclareWar {
        target: FactionId,
    },
    OfferPeace {
        target: FactionId,
    },
    OfferVassalization {
        target: FactionId,
    },
    SwearFealty {
        liege: FactionId,
    },
    ReleaseVassal {
        vassal: FactionId,
    },
    DeclareIndependence,

    // Queries
    CheckAccess {
        at: BlockPos,
        action: ActionCategory,
        #[serde(default)]
        bypass: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_shape() {
        let cmd: Command = serde_json::from_str(
            r#"{ "type": "claim", "at": { "world": "world", "x": 5, "y": 64, "z": -3 } }"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Claim {
                at: BlockPos::new("world", 5, 64, -3)
            }
        );

        let cmd: Command = serde_json::from_str(r#"{ "type": "declare_independence" }"#).unwrap();
        assert_eq!(cmd, Command::DeclareIndependence);

        let cmd: Command =
            serde_json::from_str(r#"{ "type": "unclaim_all", "faction": null }"#).unwrap();
        assert_eq!(cmd, Command::UnclaimAll { faction: None });
    }
}
