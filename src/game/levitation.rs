//! Inert / Levitated / Thrown state machine for liftable objects.
//!
//! Native gravity is off for every levitatable body; this module is the only
//! thing pushing on it. Transitions are requested from outside (gestures,
//! debug commands) and the per-tick forces are applied in `fixed_update`.

use nalgebra::{Vector2, Vector3};
use rand::Rng;
use tracing::debug;

use crate::config::{LevitationConfig, ThrowingConfig};

use super::math::{horizontal_mask, try_normalize, vertical_mask};

/// Minimal rigid-body surface the gameplay code drives.
pub trait PhysicsBody {
    fn position(&self) -> Vector3<f32>;
    fn velocity(&self) -> Vector3<f32>;
    fn mass(&self) -> f32;
    /// Adds a force for the coming physics step.
    fn apply_force(&mut self, force: Vector3<f32>);
    fn apply_torque_impulse(&mut self, impulse: Vector3<f32>);
    /// Moves the body directly, bypassing integration.
    fn set_position(&mut self, position: Vector3<f32>);
    /// Overrides the linear velocity integrated by the coming step.
    fn set_velocity(&mut self, velocity: Vector3<f32>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevitationPhase {
    Inert,
    Levitated,
    Thrown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevitationState {
    Inert,
    /// Hovering at a fixed bearing from the player.
    Levitated { target_dir: Vector2<f32> },
    Thrown {
        direction: Vector3<f32>,
        time_till_inert: f32,
    },
}

/// A liftable object's gameplay state.
#[derive(Debug, Clone)]
pub struct Levitatable {
    state: LevitationState,
    /// Hover bearing of the last grab, reused when a new one is degenerate.
    last_target_dir: Vector2<f32>,
    levitation: LevitationConfig,
    throwing: ThrowingConfig,
}

impl Levitatable {
    pub fn new(levitation: LevitationConfig, throwing: ThrowingConfig) -> Self {
        Self {
            state: LevitationState::Inert,
            last_target_dir: Vector2::x(),
            levitation,
            throwing,
        }
    }

    pub fn state(&self) -> &LevitationState {
        &self.state
    }

    pub fn phase(&self) -> LevitationPhase {
        match self.state {
            LevitationState::Inert => LevitationPhase::Inert,
            LevitationState::Levitated { .. } => LevitationPhase::Levitated,
            LevitationState::Thrown { .. } => LevitationPhase::Thrown,
        }
    }

    pub fn is_levitated(&self) -> bool {
        self.phase() == LevitationPhase::Levitated
    }

    /// Point the body hovers toward while levitated.
    pub fn hover_target(&self, player_position: Vector3<f32>) -> Option<Vector3<f32>> {
        match self.state {
            LevitationState::Levitated { target_dir } => Some(
                player_position
                    + Vector3::new(target_dir.x, 0.0, target_dir.y)
                        * self.levitation.horizontal.target_distance
                    + Vector3::new(0.0, self.levitation.vertical.target_distance, 0.0),
            ),
            _ => None,
        }
    }

    /// Lifts an inert or thrown object. Returns false, leaving the body
    /// untouched, when it is already levitated.
    pub fn levitate<B: PhysicsBody + ?Sized, R: Rng + ?Sized>(
        &mut self,
        body: &mut B,
        player_position: Vector3<f32>,
        rng: &mut R,
    ) -> bool {
        if self.is_levitated() {
            return false;
        }
        let bearing = try_normalize(horizontal_mask(body.position() - player_position))
            .map(|dir| Vector2::new(dir.x, dir.z))
            .unwrap_or(self.last_target_dir);
        self.last_target_dir = bearing;
        self.state = LevitationState::Levitated { target_dir: bearing };

        let variance = self.levitation.rot_impulse_variance;
        let mut spin = |bound: f32| bound * (rng.gen::<f32>() * 2.0 - 1.0);
        body.apply_torque_impulse(Vector3::new(
            spin(variance[0]),
            spin(variance[1]),
            spin(variance[2]),
        ));
        debug!(?bearing, "[Levitation] Levitated");
        true
    }

    /// Launches the object along `direction` for the configured duration.
    pub fn throw(&mut self, direction: Vector3<f32>) {
        self.state = LevitationState::Thrown {
            direction,
            time_till_inert: self.throwing.acceleration_duration,
        };
        debug!(?direction, "[Levitation] Thrown");
    }

    /// Applies this tick's motion for the current state.
    pub fn fixed_update<B: PhysicsBody + ?Sized>(
        &mut self,
        body: &mut B,
        player_position: Vector3<f32>,
        dt: f32,
    ) {
        match self.state {
            LevitationState::Inert => {
                let gravity = Vector3::new(0.0, -self.levitation.gravity_acceleration, 0.0);
                body.apply_force(gravity * body.mass());
            }
            LevitationState::Levitated { .. } => {
                let Some(target) = self.hover_target(player_position) else {
                    return;
                };
                let towards = target - body.position();

                // Each axis seeks on its own so hover height never feeds into bearing.
                // The velocity is replaced outright, so leftover throw or contact
                // speed never carries into the hover.
                let velocity = horizontal_mask(towards) * self.levitation.horizontal.gain()
                    + vertical_mask(towards) * self.levitation.vertical.gain();
                body.set_velocity(velocity);
            }
            LevitationState::Thrown {
                direction,
                time_till_inert,
            } => {
                let remaining = time_till_inert - dt;
                if remaining <= 0.0 {
                    self.state = LevitationState::Inert;
                    debug!("[Levitation] Throw spent, back to inert");
                } else {
                    self.state = LevitationState::Thrown {
                        direction,
                        time_till_inert: remaining,
                    };
                    body.apply_force(direction * (self.throwing.acceleration * body.mass()));
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Body that integrates nothing and remembers what was asked of it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBody {
        pub position: Vector3<f32>,
        pub velocity: Vector3<f32>,
        pub mass: f32,
        pub forces: Vec<Vector3<f32>>,
        pub torque_impulses: Vec<Vector3<f32>>,
    }

    impl RecordingBody {
        pub(crate) fn at(position: Vector3<f32>) -> Self {
            Self {
                position,
                mass: 2.0,
                ..Default::default()
            }
        }
    }

    impl PhysicsBody for RecordingBody {
        fn position(&self) -> Vector3<f32> {
            self.position
        }
        fn velocity(&self) -> Vector3<f32> {
            self.velocity
        }
        fn mass(&self) -> f32 {
            self.mass
        }
        fn apply_force(&mut self, force: Vector3<f32>) {
            self.forces.push(force);
        }
        fn apply_torque_impulse(&mut self, impulse: Vector3<f32>) {
            self.torque_impulses.push(impulse);
        }
        fn set_position(&mut self, position: Vector3<f32>) {
            self.position = position;
        }
        fn set_velocity(&mut self, velocity: Vector3<f32>) {
            self.velocity = velocity;
        }
    }

    impl RecordingBody {
        /// Stands in for the physics step: explicit Euler, forces ignored.
        fn integrate(&mut self, dt: f32) {
            self.position += self.velocity * dt;
        }
    }

    fn levitatable() -> Levitatable {
        Levitatable::new(LevitationConfig::default(), ThrowingConfig::default())
    }

    #[test]
    fn test_inert_applies_gravity_substitute() {
        let mut lev = levitatable();
        let mut body = RecordingBody::at(Vector3::zeros());
        lev.fixed_update(&mut body, Vector3::zeros(), 0.02);
        assert_eq!(body.forces, vec![Vector3::new(0.0, -9.8 * 2.0, 0.0)]);
    }

    #[test]
    fn test_levitate_from_inert() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(7);
        let mut body = RecordingBody::at(Vector3::new(0.0, 0.0, 4.0));
        lev.levitate(&mut body, Vector3::zeros(), &mut rng);

        assert_eq!(lev.phase(), LevitationPhase::Levitated);
        match lev.state() {
            LevitationState::Levitated { target_dir } => {
                assert!((target_dir.y - 1.0).abs() < 1e-6);
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(body.torque_impulses.len(), 1);
        let torque = body.torque_impulses[0];
        assert!(torque.iter().all(|c| c.abs() <= 100.0));
    }

    #[test]
    fn test_levitate_directly_above_player_keeps_previous_bearing() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(1);
        let mut body = RecordingBody::at(Vector3::new(0.0, 5.0, 0.0));
        lev.levitate(&mut body, Vector3::zeros(), &mut rng);
        assert_eq!(
            lev.state(),
            &LevitationState::Levitated {
                target_dir: Vector2::x()
            }
        );
    }

    #[test]
    fn test_levitated_seeks_hover_point_without_overshoot() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(3);
        let mut body = RecordingBody::at(Vector3::new(3.0, 0.0, 0.0));
        let player = Vector3::zeros();
        lev.levitate(&mut body, player, &mut rng);
        let target = lev.hover_target(player).unwrap();
        assert_eq!(target, Vector3::new(10.0, 10.0, 0.0));

        let mut last_distance = (target - body.position).norm();
        for _ in 0..200 {
            lev.fixed_update(&mut body, player, 0.02);
            body.integrate(0.02);
            let distance = (target - body.position).norm();
            assert!(distance <= last_distance + 1e-5);
            assert!(body.position.x <= target.x + 1e-4);
            last_distance = distance;
        }
        assert!(last_distance < 1e-3, "did not settle: {}", last_distance);
        assert!(body.forces.is_empty());
        assert!(body.velocity.norm() < 1e-2);
    }

    #[test]
    fn test_levitated_discards_leftover_velocity() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(4);
        let mut body = RecordingBody::at(Vector3::new(10.0, 10.0, 0.0));
        body.velocity = Vector3::new(0.0, 0.0, 150.0);
        let player = Vector3::zeros();
        lev.levitate(&mut body, player, &mut rng);

        lev.fixed_update(&mut body, player, 0.02);
        assert!(body.velocity.norm() < 1e-4, "velocity = {:?}", body.velocity);
    }

    #[test]
    fn test_levitate_while_levitated_is_ignored() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(2);
        let mut body = RecordingBody::at(Vector3::new(0.0, 0.0, 4.0));
        assert!(lev.levitate(&mut body, Vector3::zeros(), &mut rng));
        let before = *lev.state();

        body.position = Vector3::new(4.0, 0.0, 0.0);
        assert!(!lev.levitate(&mut body, Vector3::zeros(), &mut rng));
        assert_eq!(lev.state(), &before);
        assert_eq!(body.torque_impulses.len(), 1);
    }

    #[test]
    fn test_throw_returns_to_inert_after_duration() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(5);
        let mut body = RecordingBody::at(Vector3::new(1.0, 0.0, 0.0));
        lev.levitate(&mut body, Vector3::zeros(), &mut rng);
        lev.throw(Vector3::z());
        assert_eq!(lev.phase(), LevitationPhase::Thrown);

        let dt = 0.02;
        let full_ticks = (1.5f32 / dt).round() as usize;
        for _ in 0..full_ticks - 1 {
            lev.fixed_update(&mut body, Vector3::zeros(), dt);
            assert_eq!(lev.phase(), LevitationPhase::Thrown);
        }
        // Floating error may leave a sliver of countdown for one extra tick.
        lev.fixed_update(&mut body, Vector3::zeros(), dt);
        lev.fixed_update(&mut body, Vector3::zeros(), dt);
        assert_eq!(lev.phase(), LevitationPhase::Inert);

        let throw_force = Vector3::new(0.0, 0.0, 300.0 * 2.0);
        assert_eq!(body.forces[0], throw_force);
    }

    #[test]
    fn test_relevitate_thrown_object() {
        let mut lev = levitatable();
        let mut rng = StdRng::seed_from_u64(9);
        let mut body = RecordingBody::at(Vector3::new(0.0, 0.0, -2.0));
        lev.throw(Vector3::x());
        lev.levitate(&mut body, Vector3::zeros(), &mut rng);
        assert!(lev.is_levitated());
    }
}
