//! Player-driven phases: commands, motion tracking, gestures and levitation forces.

use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::game::actions::SessionCommand;
use crate::game::events::GameEvent;
use crate::game::gesture::Gesture;
use crate::game::levitation::LevitationPhase;
use crate::game::math::{from_array, to_array, try_normalize};
use crate::game::targeting::{select_aim_target, sweep_liftables};
use crate::game::EntityId;

use super::GameSession;

impl GameSession {
    /// Applies queued commands and reports whether a manual throw was requested.
    pub(super) fn apply_commands(&mut self) -> bool {
        let mut manual_throw = false;
        for command in self.commands.drain() {
            match command {
                SessionCommand::ManualThrow => manual_throw = true,
                SessionCommand::DebugLevitate { entity } => {
                    if self.levitate_entity(entity) {
                        self.events.push(GameEvent::Grabbed {
                            entities: vec![entity],
                        });
                    }
                }
                SessionCommand::DebugThrow { entity, direction } => {
                    self.debug_throw(entity, from_array(direction));
                }
            }
        }
        manual_throw
    }

    pub(super) fn record_trackers(&mut self, dt: f32) {
        let rig = self.rig;
        self.head
            .record_transform(rig.head.translation, &rig.head.rotation, dt);
        self.face
            .record_transform(rig.face.translation, &rig.face.rotation, dt);
    }

    pub(super) fn process_gestures(&mut self, dt: f32, manual_throw: bool) {
        let Some(gesture) = self
            .gestures
            .update(dt, &self.head, &self.face, manual_throw)
        else {
            return;
        };
        match gesture {
            Gesture::Grab { forward } => self.grab_along(forward),
            Gesture::Throw { aim } => self.throw_levitated(aim),
        }
    }

    pub(super) fn apply_levitation_forces(&mut self, dt: f32) {
        self.physics.reset_forces();
        let player = self.rig.position;
        for (&entity, levitatable) in self.levitatables.iter_mut() {
            if let Some(mut body) = self.physics.body_mut(entity) {
                levitatable.fixed_update(&mut body, player, dt);
            }
        }
    }

    fn grab_along(&mut self, forward: Vector3<f32>) {
        let levitatables = &self.levitatables;
        let sweep = sweep_liftables(
            &self.physics,
            self.rig.camera,
            forward,
            &self.config.targeting,
            |entity| levitatables.contains_key(&entity),
        );

        let grabbed: Vec<EntityId> = sweep
            .targets
            .into_iter()
            .filter(|&entity| self.levitate_entity(entity))
            .collect();
        if grabbed.is_empty() {
            debug!("[Session] Nod found nothing to lift");
            return;
        }
        info!(count = grabbed.len(), "[Session] Grabbed");
        self.events.push(GameEvent::Grabbed { entities: grabbed });
    }

    fn throw_levitated(&mut self, aim: Vector3<f32>) {
        let held = self.in_phase(LevitationPhase::Levitated);
        if held.is_empty() {
            debug!("[Session] Jerk with nothing levitated");
            return;
        }

        let snapshots = self.clusters.snapshots();
        let target = select_aim_target(
            &self.physics,
            self.rig.camera,
            aim,
            &snapshots,
            &self.config.targeting,
        );
        let fallback = try_normalize(aim).unwrap_or_else(Vector3::z);

        for &entity in &held {
            let Some(position) = self.physics.position(entity) else {
                continue;
            };
            let direction = try_normalize(target.point - position).unwrap_or(fallback);
            if let Some(levitatable) = self.levitatables.get_mut(&entity) {
                levitatable.throw(direction);
            }
        }
        info!(count = held.len(), cluster = ?target.cluster, "[Session] Thrown");
        self.events.push(GameEvent::Thrown {
            entities: held,
            target: to_array(target.point),
            cluster: target.cluster,
        });
    }

    fn debug_throw(&mut self, entity: EntityId, direction: Vector3<f32>) {
        let (Some(direction), Some(position)) =
            (try_normalize(direction), self.physics.position(entity))
        else {
            warn!(entity, "[Session] Dropping debug throw");
            return;
        };
        let Some(levitatable) = self.levitatables.get_mut(&entity) else {
            warn!(entity, "[Session] Debug throw target is gone");
            return;
        };
        levitatable.throw(direction);
        let target = position + direction * self.config.targeting.default_target_distance;
        self.events.push(GameEvent::Thrown {
            entities: vec![entity],
            target: to_array(target),
            cluster: None,
        });
    }

    /// Levitates one entity; false when it is already held or has no
    /// levitatable or no body.
    pub(super) fn levitate_entity(&mut self, entity: EntityId) -> bool {
        let player = self.rig.position;
        let (Some(levitatable), Some(mut body)) = (
            self.levitatables.get_mut(&entity),
            self.physics.body_mut(entity),
        ) else {
            warn!(entity, "[Session] Cannot levitate unknown entity");
            return false;
        };
        levitatable.levitate(&mut body, player, &mut self.rng)
    }
}
