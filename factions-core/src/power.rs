//! Per-player power and the periodic rules that move it.
//!
//! The economy only tracks players. Faction-level sums (the demesne limit)
//! are derived on demand by [`crate::state::WorldState::cumulative_power`].

use crate::bounded::{new_power, BoundedInt};
use crate::config::FactionsConfig;
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Rate and ceiling rules, normalized from [`FactionsConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerRules {
    pub initial_power: i32,
    pub max_power: i32,
    pub increase_amount: i32,
    pub decrease_amount: i32,
    pub decay_enabled: bool,
    pub minutes_before_decay: u64,
    pub vassal_contribution_percent: i64,
}

fn to_i32(value: i64) -> i32 {
    value.clamp(0, i32::MAX as i64) as i32
}

impl From<&FactionsConfig> for PowerRules {
    fn from(config: &FactionsConfig) -> Self {
        Self {
            initial_power: to_i32(config.initial_power),
            max_power: to_i32(config.max_power),
            increase_amount: to_i32(config.power_increase_amount),
            decrease_amount: to_i32(config.power_decrease_amount),
            decay_enabled: config.power_decreases,
            minutes_before_decay: config.minutes_before_decay.max(0) as u64,
            vassal_contribution_percent: config.vassal_contribution_percent.clamp(0, 100),
        }
    }
}

impl Default for PowerRules {
    fn default() -> Self {
        Self::from(&FactionsConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPowerRecord {
    pub player: PlayerId,
    pub power: BoundedInt,
    /// Epoch seconds of the last observed logout. `None` while never logged out.
    pub last_logout: Option<u64>,
}

/// Answers "is this player currently active", typically "online".
pub trait ActivityOracle {
    fn is_active(&self, player: PlayerId) -> bool;
}

impl ActivityOracle for HashSet<PlayerId> {
    fn is_active(&self, player: PlayerId) -> bool {
        self.contains(&player)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PowerEconomy {
    rules: PowerRules,
    records: HashMap<PlayerId, PlayerPowerRecord>,
}

impl PowerEconomy {
    pub fn new(rules: PowerRules) -> Self {
        Self {
            rules,
            records: HashMap::new(),
        }
    }

    pub fn rules(&self) -> &PowerRules {
        &self.rules
    }

    /// Swap the rules and re-clamp every record under the new ceiling.
    pub fn set_rules(&mut self, rules: PowerRules) {
        for record in self.records.values_mut() {
            record.power.rebound(0, rules.max_power);
        }
        self.rules = rules;
    }

    /// Create a record at the initial power on first observation.
    ///
    /// The record starts its inactivity clock at `now`, so a player who is
    /// never seen logging out still decays. Returns `true` if the record was
    /// created.
    pub fn ensure_record(&mut self, player: PlayerId, now: u64) -> bool {
        if self.records.contains_key(&player) {
            return false;
        }
        let power = new_power(self.rules.initial_power, self.rules.max_power);
        self.records.insert(
            player,
            PlayerPowerRecord {
                player,
                power,
                last_logout: Some(now),
            },
        );
        log::debug!("Observed player {} with power {}", player, power.get());
        true
    }

    pub fn record_login(&mut self, player: PlayerId, now: u64) {
        self.ensure_record(player, now);
    }

    pub fn record_logout(&mut self, player: PlayerId, now: u64) {
        self.ensure_record(player, now);
        if let Some(record) = self.records.get_mut(&player) {
            record.last_logout = Some(now);
        }
    }

    /// Start the inactivity clock at `now` for inactive players that have none,
    /// such as records restored without a logout stamp.
    ///
    /// Returns how many records were stamped.
    pub fn stamp_offline(&mut self, oracle: &dyn ActivityOracle, now: u64) -> usize {
        let mut stamped = 0;
        for record in self.records.values_mut() {
            if record.last_logout.is_none() && !oracle.is_active(record.player) {
                record.last_logout = Some(now);
                stamped += 1;
            }
        }
        if stamped > 0 {
            log::debug!("Stamped {} offline players at {}", stamped, now);
        }
        stamped
    }

    /// Unknown players have no power.
    pub fn current_power(&self, player: PlayerId) -> i32 {
        self.records.get(&player).map(|r| r.power.get()).unwrap_or(0)
    }

    pub fn max_power(&self, player: PlayerId) -> i32 {
        self.records
            .get(&player)
            .map(|r| r.power.max())
            .unwrap_or(self.rules.max_power)
    }

    /// Grow an active player's power toward the ceiling.
    ///
    /// Returns `true` if the value changed.
    pub fn increase(&mut self, player: PlayerId, oracle: &dyn ActivityOracle) -> bool {
        if !oracle.is_active(player) {
            return false;
        }
        let amount = self.rules.increase_amount;
        match self.records.get_mut(&player) {
            Some(record) if !record.power.is_at_max() => {
                let before = record.power.get();
                record.power.add(amount);
                record.power.get() != before
            }
            _ => false,
        }
    }

    /// Decay an inactive player's power once they have been away long enough.
    ///
    /// Returns `true` if the value changed.
    pub fn decrease(&mut self, player: PlayerId, oracle: &dyn ActivityOracle, now: u64) -> bool {
        if !self.rules.decay_enabled || oracle.is_active(player) {
            return false;
        }
        let threshold_secs = self.rules.minutes_before_decay.saturating_mul(60);
        let amount = self.rules.decrease_amount;
        match self.records.get_mut(&player) {
            Some(PlayerPowerRecord {
                power,
                last_logout: Some(logout),
                ..
            }) if now.saturating_sub(*logout) > threshold_secs => {
                let before = power.get();
                power.add(-amount);
                power.get() != before
            }
            _ => false,
        }
    }

    /// Run [`Self::increase`] for every known player. Returns how many changed.
    #[tracing::instrument(skip_all, name = "power_increase")]
    pub fn increase_sweep(&mut self, oracle: &dyn ActivityOracle) -> usize {
        let changed = self
            .sorted_players()
            .into_iter()
            .filter(|p| self.increase(*p, oracle))
            .count();
        log::debug!("Power increase sweep raised {} players", changed);
        changed
    }

    /// Run [`Self::decrease`] for every known player. Returns how many changed.
    #[tracing::instrument(skip_all, name = "power_decrease")]
    pub fn decrease_sweep(&mut self, oracle: &dyn ActivityOracle, now: u64) -> usize {
        let changed = self
            .sorted_players()
            .into_iter()
            .filter(|p| self.decrease(*p, oracle, now))
            .count();
        log::debug!("Power decrease sweep lowered {} players", changed);
        changed
    }

    pub fn reset_all(&mut self) {
        let initial = self.rules.initial_power;
        for record in self.records.values_mut() {
            record.power.set(initial);
        }
        log::info!("Reset power of {} players to {}", self.records.len(), initial);
    }

    pub fn sum_for<'a>(&self, players: impl IntoIterator<Item = &'a PlayerId>) -> i64 {
        players
            .into_iter()
            .map(|p| self.current_power(*p) as i64)
            .sum()
    }

    /// All records, sorted by player.
    pub fn records(&self) -> Vec<PlayerPowerRecord> {
        let mut out: Vec<PlayerPowerRecord> = self.records.values().cloned().collect();
        out.sort_by_key(|r| r.player);
        out
    }

    /// Restore a record, re-clamping it under the current ceiling.
    pub fn insert_record(&mut self, mut record: PlayerPowerRecord) {
        record.power.rebound(0, self.rules.max_power);
        self.records.insert(record.player, record);
    }

    fn sorted_players(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.records.keys().copied().collect();
        players.sort();
        players
    }
}
