use rand::Rng;

use crate::config::DeadNinjaConfig;

use super::levitation::LevitationPhase;

/// Change to a dead body's removal schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathSchedule {
    /// Remove the body after `death_wait_time`.
    Schedule,
    /// Cancel a pending removal.
    Reprieve,
}

/// Removal bookkeeping for the body a killed agent leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadNinja {
    will_die_soon: bool,
}

impl DeadNinja {
    /// Rolls whether the fresh body is scheduled for removal right away.
    pub fn spawn<R: Rng + ?Sized>(config: &DeadNinjaConfig, rng: &mut R) -> (Self, Option<DeathSchedule>) {
        let will_die_soon = rng.gen::<f32>() > config.chance_of_insta_death;
        let schedule = will_die_soon.then_some(DeathSchedule::Schedule);
        (Self { will_die_soon }, schedule)
    }

    pub fn will_die_soon(&self) -> bool {
        self.will_die_soon
    }

    /// Levitating a doomed body saves it; a resting body near the player gets doomed.
    pub fn update(
        &mut self,
        config: &DeadNinjaConfig,
        phase: LevitationPhase,
        distance_to_player: f32,
        speed: f32,
    ) -> Option<DeathSchedule> {
        let levitated = phase == LevitationPhase::Levitated;
        if self.will_die_soon && levitated {
            self.will_die_soon = false;
            return Some(DeathSchedule::Reprieve);
        }
        if !self.will_die_soon
            && !levitated
            && distance_to_player < config.kill_distance_from_player
            && speed < config.kill_max_speed
        {
            self.will_die_soon = true;
            return Some(DeathSchedule::Schedule);
        }
        None
    }
}
