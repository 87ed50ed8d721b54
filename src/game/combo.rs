use serde::Serialize;
use tracing::info;

use crate::config::ComboConfig;

/// Outcome of registering a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitEvent {
    Hit,
    Combo,
}

/// Sliding window of recent hit ages.
#[derive(Debug, Clone)]
pub struct ComboTracker {
    config: ComboConfig,
    /// Seconds since each hit in the window, oldest first.
    hit_ages: Vec<f32>,
    time_since_last_combo: f32,
}

impl ComboTracker {
    pub fn new(config: ComboConfig) -> Self {
        Self {
            config,
            hit_ages: Vec::new(),
            time_since_last_combo: f32::INFINITY,
        }
    }

    pub fn recent_hits(&self) -> usize {
        self.hit_ages.len()
    }

    /// Registers a hit and decides whether it completes a combo.
    pub fn on_hit(&mut self) -> HitEvent {
        self.hit_ages.push(0.0);

        if self.hit_ages.len() >= self.config.enemy_combo_amount
            && self.time_since_last_combo > self.config.combo_break_time
        {
            self.time_since_last_combo = 0.0;
            info!(hits = self.hit_ages.len(), "[Combo] Combo!");
            HitEvent::Combo
        } else {
            HitEvent::Hit
        }
    }

    /// Ages the window and drops hits that are too old to count.
    pub fn tick(&mut self, dt: f32) {
        self.time_since_last_combo += dt;
        for age in &mut self.hit_ages {
            *age += dt;
        }
        let max_age = self.config.combo_duration_max;
        self.hit_ages.retain(|&age| age <= max_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ComboTracker {
        ComboTracker::new(ComboConfig {
            combo_duration_max: 2.0,
            enemy_combo_amount: 3,
            combo_break_time: 3.0,
        })
    }

    #[test]
    fn test_combo_fires_on_threshold_hit() {
        let mut combo = tracker();
        assert_eq!(combo.on_hit(), HitEvent::Hit);
        combo.tick(0.5);
        assert_eq!(combo.on_hit(), HitEvent::Hit);
        combo.tick(0.5);
        assert_eq!(combo.on_hit(), HitEvent::Combo);
    }

    #[test]
    fn test_no_back_to_back_combos() {
        let mut combo = tracker();
        for _ in 0..3 {
            combo.on_hit();
        }
        combo.tick(0.5);
        assert_eq!(combo.on_hit(), HitEvent::Hit);
        assert_eq!(combo.on_hit(), HitEvent::Hit);
    }

    #[test]
    fn test_combo_again_after_break() {
        let mut combo = tracker();
        for _ in 0..3 {
            combo.on_hit();
        }
        combo.tick(3.5);
        assert_eq!(combo.recent_hits(), 0);
        assert_eq!(combo.on_hit(), HitEvent::Hit);
        assert_eq!(combo.on_hit(), HitEvent::Hit);
        assert_eq!(combo.on_hit(), HitEvent::Combo);
    }

    #[test]
    fn test_old_hits_expire() {
        let mut combo = tracker();
        combo.on_hit();
        combo.on_hit();
        combo.tick(2.1);
        assert_eq!(combo.recent_hits(), 0);
        assert_eq!(combo.on_hit(), HitEvent::Hit);
    }
}
