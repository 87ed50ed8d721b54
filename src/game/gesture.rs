//! Head nod (grab) and face jerk (throw) detection.

use nalgebra::Vector3;
use tracing::debug;

use crate::config::GestureConfig;

use super::kinematics::KinematicsTracker;
use super::math::horizontal_mask;

/// A recognized gesture, carrying the head's recent forward direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Downward head nod: lift whatever lies along `forward`.
    Grab { forward: Vector3<f32> },
    /// Sideways face jerk (or manual trigger): throw everything levitated.
    Throw { aim: Vector3<f32> },
}

/// Polls the head and face trackers once per tick.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    config: GestureConfig,
    time_since_last_gesture: f32,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            time_since_last_gesture: f32::INFINITY,
        }
    }

    pub fn time_since_last_gesture(&self) -> f32 {
        self.time_since_last_gesture
    }

    pub fn is_cooling_down(&self) -> bool {
        self.time_since_last_gesture <= self.config.disable_gestures_duration
    }

    /// Advances the cooldown by `dt` and checks for a gesture.
    ///
    /// A grab wins over a throw when both fire on the same tick.
    pub fn update(
        &mut self,
        dt: f32,
        head: &KinematicsTracker,
        face: &KinematicsTracker,
        manual_throw: bool,
    ) -> Option<Gesture> {
        self.time_since_last_gesture += dt;
        if self.is_cooling_down() {
            return None;
        }

        let window = self.config.tracker_window;
        let forward = head.pose_at_time_ago(window).forward;

        let head_velocity = head.average_velocity(window);
        if head_velocity.y < self.config.nod_y_velocity {
            self.time_since_last_gesture = 0.0;
            debug!(vy = head_velocity.y, "[Gesture] Nod");
            return Some(Gesture::Grab { forward });
        }

        if manual_throw || self.is_jerk(face) {
            self.time_since_last_gesture = 0.0;
            debug!(manual_throw, "[Gesture] Jerk");
            return Some(Gesture::Throw { aim: forward });
        }

        None
    }

    fn is_jerk(&self, face: &KinematicsTracker) -> bool {
        let threshold_sq = self.config.jerk_horizontal_speed * self.config.jerk_horizontal_speed;
        let exceeds = |window: f32| {
            horizontal_mask(face.average_velocity(window)).norm_squared() >= threshold_sq
        };

        exceeds(self.config.tracker_window)
            && self.config.jerk_confirm_window.map_or(true, exceeds)
    }
}
