use factions_core::{PlayerId, WorldState};
use std::collections::HashSet;

/// Maps ticks to epoch seconds. Saturates instead of overflowing.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    pub start_time: u64,
    pub tick_seconds: u64,
}

impl SimClock {
    pub fn at(&self, tick: u64) -> u64 {
        self.start_time
            .saturating_add(tick.saturating_mul(self.tick_seconds))
    }
}

/// Tracks which players are online. Serves as the activity oracle for
/// power sweeps.
#[derive(Debug, Default)]
pub struct SessionTracker {
    online: HashSet<PlayerId>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, state: &mut WorldState, player: PlayerId, now: u64) {
        state.power.record_login(player, now);
        if self.online.insert(player) {
            log::debug!("{} logged in", player);
        }
    }

    pub fn logout(&mut self, state: &mut WorldState, player: PlayerId, now: u64) {
        state.power.record_logout(player, now);
        if self.online.remove(&player) {
            log::debug!("{} logged out at {}", player, now);
        }
    }

    pub fn online(&self) -> &HashSet<PlayerId> {
        &self.online
    }
}
