//! Scoring engine: HP state and the damage model
//!
//! - one-time damage on a confirmed transition into a hitting state
//! - continuous damage while a hit is held past the grace delay
//! - HP clamped to [0, max] on every mutation; the game ends the first
//!   time either side reaches 0 and stays over until `reset`
//! - damage landing in the same poll as a knockout still counts (so both
//!   sides can fall together); `settle` freezes HP at the end of the poll

use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::types::{Settings, Side, SideState, Winner};

/// HP state of a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub left_hp: f64,
    pub right_hp: f64,
    pub max_hp: f64,
    pub is_over: bool,
}

impl GameState {
    /// Both sides at full HP
    pub fn full(max_hp: f64) -> Self {
        Self {
            left_hp: max_hp,
            right_hp: max_hp,
            max_hp,
            is_over: false,
        }
    }

    fn hp_mut(&mut self, side: Side) -> &mut f64 {
        match side {
            Side::Left => &mut self.left_hp,
            Side::Right => &mut self.right_hp,
        }
    }
}

/// Owns HP for one session
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    settings: Settings,
    state: GameState,
    /// No further damage once a finished game is settled
    frozen: bool,
}

impl ScoringEngine {
    /// Create new engine at full HP
    pub fn new(settings: Settings) -> Self {
        Self {
            state: GameState::full(settings.max_hp),
            settings,
            frozen: false,
        }
    }

    /// Apply damage for a confirmed transition of `side` into `new_state`.
    /// Returns true if any HP changed.
    pub fn apply_one_time_damage(&mut self, side: Side, new_state: SideState) -> bool {
        match new_state {
            SideState::HittingOpponent => self.deal(side.opponent(), self.settings.hit_damage),
            SideState::HittingSelf => self.deal(side, self.settings.self_hit_damage),
            _ => false,
        }
    }

    /// Apply time-proportional damage while `side` holds `sustained_state`.
    ///
    /// Only the part of `elapsed` that lies beyond the grace delay accrues,
    /// so the one-time damage at confirmation is never double-counted.
    /// Returns true if any HP changed.
    pub fn apply_continuous_damage(
        &mut self,
        side: Side,
        sustained_state: SideState,
        elapsed: Duration,
        time_since_change: Duration,
    ) -> bool {
        if !sustained_state.is_sustained_hit() {
            return false;
        }
        let grace = self.settings.grace_delay();
        if time_since_change < grace {
            return false;
        }
        let accrued = elapsed.min(time_since_change - grace);
        let damage = accrued.as_secs_f64() * 1000.0 * self.settings.damage_per_ms;
        self.deal(side.opponent(), damage)
    }

    /// Subtract `amount` from `target`, clamped at 0
    fn deal(&mut self, target: Side, amount: f64) -> bool {
        if self.frozen || amount <= 0.0 {
            return false;
        }
        let max_hp = self.state.max_hp;
        let hp = self.state.hp_mut(target);
        if *hp <= 0.0 {
            return false;
        }
        let before = *hp;
        *hp = (before - amount).clamp(0.0, max_hp);
        let after = *hp;
        debug!("{} takes {:.3} ({:.3} → {:.3})", target, amount, before, after);

        if after == 0.0 {
            self.state.is_over = true;
            info!("{} reached 0 HP", target);
        }
        after != before
    }

    /// End of a poll: a finished game accepts no more damage
    pub fn settle(&mut self) {
        if self.state.is_over && !self.frozen {
            debug!("final HP {:?}", self.hp());
            self.frozen = true;
        }
    }

    /// Current HP (left, right)
    pub fn hp(&self) -> (f64, f64) {
        (self.state.left_hp, self.state.right_hp)
    }

    /// True iff either side is at 0 HP
    pub fn is_over(&self) -> bool {
        self.state.is_over
    }

    /// Winner, once the game is over
    pub fn winner(&self) -> Option<Winner> {
        if !self.state.is_over {
            return None;
        }
        Winner::from_knockouts(self.state.left_hp == 0.0, self.state.right_hp == 0.0)
    }

    /// Get settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Restart at full HP under new settings
    pub fn reset(&mut self, settings: Settings) {
        *self = Self::new(settings);
    }
}

// =============================================================================
// TESTS
// =============================================================================
