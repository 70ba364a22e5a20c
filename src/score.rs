//! Scoring, leveling and the gravity speed curve

use crate::config::GameplaySettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Points for clearing 0, 1, 2, 3 or 4 rows in one landing
pub const REWARDS: [u64; 5] = [0, 100, 300, 700, 1500];

/// Reward for a landing that cleared `lines` rows (capped at four)
pub fn reward(lines: usize) -> u64 {
    REWARDS[lines.min(REWARDS.len() - 1)]
}

/// Gravity interval for a level: shrinks by the acceleration each level and
/// stops shrinking at `max_speed_level`. Never drops below 1ms.
pub fn speed_for_level(level: u32, tuning: &GameplaySettings) -> Duration {
    let capped = u64::from(level.min(tuning.max_speed_level));
    let ms = tuning
        .base_speed_ms
        .saturating_sub(capped.saturating_mul(tuning.acceleration_ms))
        .max(1);
    Duration::from_millis(ms)
}

/// Score, level and accumulated run time of one game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub score: u64,
    pub level: u32,
    /// Sum of the gravity intervals elapsed so far
    pub run_time_ms: u64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the reward for a landing; returns the points gained
    pub fn add_clear(&mut self, lines: usize) -> u64 {
        let points = reward(lines);
        self.score += points;
        points
    }

    /// Account for one gravity tick of `speed`.
    /// Returns true when the level went up.
    pub fn advance(&mut self, speed: Duration, tuning: &GameplaySettings) -> bool {
        self.run_time_ms += speed.as_millis() as u64;
        let threshold = (u64::from(self.level) + 1) * tuning.level_interval_ms;
        if self.run_time_ms > threshold {
            self.level += 1;
            return true;
        }
        false
    }

    /// Gravity interval for the current level
    pub fn speed(&self, tuning: &GameplaySettings) -> Duration {
        speed_for_level(self.level, tuning)
    }
}
