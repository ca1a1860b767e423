use crate::spatial::RadiusShape;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rules configuration, read once at startup and shared by reference.
///
/// Field names serialize in camelCase so host config files can use the
/// same keys the named reader ([`FactionsConfig::get_bool`],
/// [`FactionsConfig::get_int`]) accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FactionsConfig {
    /// Reject claims once held chunks reach cumulative power.
    pub demesne_limit_enabled: bool,
    /// Upper bound for claim/unclaim radius requests.
    pub max_claim_radius: i64,
    pub radius_shape: RadiusShape,
    /// Chunks whose four neighbors share their holder cannot be conquered.
    pub surrounded_chunk_protection_enabled: bool,

    pub initial_power: i64,
    pub max_power: i64,
    pub power_increase_amount: i64,
    pub power_decrease_amount: i64,
    pub power_decreases: bool,
    pub minutes_before_decay: i64,
    /// Ticks between power sweeps (0 disables sweeps).
    pub power_sweep_interval_ticks: i64,
    pub disband_zero_power_factions: bool,
    /// Percent of each direct vassal's own power added to its liege's limit.
    pub vassal_contribution_percent: i64,

    pub allow_neutrality: bool,
    pub non_members_can_interact_with_doors: bool,
    pub ladders_placeable_in_enemy_territory: bool,
    pub ally_interaction_allowed: bool,
    pub vassalage_tree_interaction_allowed: bool,
}

impl Default for FactionsConfig {
    fn default() -> Self {
        Self {
            demesne_limit_enabled: true,
            max_claim_radius: 3,
            radius_shape: RadiusShape::Square,
            surrounded_chunk_protection_enabled: true,
            initial_power: 5,
            max_power: 20,
            power_increase_amount: 1,
            power_decrease_amount: 1,
            power_decreases: true,
            minutes_before_decay: 1440,
            // One hour at 20 ticks per second
            power_sweep_interval_ticks: 72_000,
            disband_zero_power_factions: false,
            vassal_contribution_percent: 0,
            allow_neutrality: false,
            non_members_can_interact_with_doors: false,
            ladders_placeable_in_enemy_territory: true,
            ally_interaction_allowed: false,
            vassalage_tree_interaction_allowed: false,
        }
    }
}

impl FactionsConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Look up a boolean option by its config key, e.g. `"allowNeutrality"`.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.lookup(name).and_then(|v| v.as_bool())
    }

    /// Look up an integer option by its config key, e.g. `"maxClaimRadius"`.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.lookup(name).and_then(|v| v.as_i64())
    }

    fn lookup(&self, name: &str) -> Option<serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => map.remove(name),
            _ => None,
        }
    }

    /// Normalize a requested radius into `0..=max_claim_radius`.
    ///
    /// Negative requests collapse to 0 (the current cell only).
    pub fn clamp_radius(&self, requested: i64) -> u32 {
        let max = self.max_claim_radius.max(1);
        requested.clamp(0, max).min(u32::MAX as i64) as u32
    }

    pub fn sweep_interval(&self) -> u64 {
        self.power_sweep_interval_ticks.max(0) as u64
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse factions config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read factions config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
