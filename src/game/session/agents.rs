//! Agent-side phases: steering, cluster upkeep, kills and dead-body cleanup.

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::game::cluster::{is_lethal_hit, knock_over_torque, steer_agent};
use crate::game::combo::HitEvent;
use crate::game::constants::physics as consts;
use crate::game::dead_ninja::{DeadNinja, DeathSchedule};
use crate::game::events::GameEvent;
use crate::game::levitation::PhysicsBody;
use crate::game::math::from_array;
use crate::game::EntityId;

use super::{DeferredAction, GameSession};

impl GameSession {
    pub(super) fn steer_agents(&mut self, dt: f32) {
        let config = &self.config.clusters;
        let mut moves = Vec::new();
        for cluster in self.clusters.iter() {
            let positions: Vec<(EntityId, Vector3<f32>)> = cluster
                .agents
                .iter()
                .filter_map(|&id| self.physics.position(id).map(|p| (id, p)))
                .collect();
            for &(id, position) in &positions {
                let siblings = positions
                    .iter()
                    .filter(|(other, _)| *other != id)
                    .map(|&(_, p)| p);
                let dir = steer_agent(position, cluster.anchor, siblings, config);
                moves.push((id, position + dir * (config.agent_speed * dt)));
            }
        }
        for (id, next) in moves {
            self.physics.set_kinematic_position(id, next);
        }
    }

    pub(super) fn update_clusters(&mut self) {
        let lerp = self.config.clusters.lerp_towards_agents;
        for cluster in self.clusters.iter_mut() {
            let positions: Vec<Vector3<f32>> = cluster
                .agents
                .iter()
                .filter_map(|&id| self.physics.position(id))
                .collect();
            cluster.update(&positions, lerp);
        }
        for cluster in self.clusters.remove_empty() {
            info!(cluster, "[Session] Cluster wiped out");
            self.events.push(GameEvent::ClusterEmptied { cluster });
        }
    }

    pub(super) fn resolve_lethal_contacts(&mut self) {
        let momentum_to_die = self.config.clusters.momentum_to_die;
        for (killer, agent) in self.physics.detect_agent_overlaps() {
            if !self.agents.contains_key(&agent) || !self.levitatables.contains_key(&killer) {
                continue;
            }
            let (Some(mass), Some(velocity)) =
                (self.physics.mass(killer), self.physics.velocity(killer))
            else {
                continue;
            };
            if is_lethal_hit(mass, velocity, momentum_to_die) {
                self.kill_agent(agent, killer, mass, velocity);
            }
        }
    }

    fn kill_agent(
        &mut self,
        agent: EntityId,
        killer: EntityId,
        killer_mass: f32,
        killer_velocity: Vector3<f32>,
    ) {
        let Some(position) = self.physics.position(agent) else {
            return;
        };
        let Some(ninja) = self.agents.remove(&agent) else {
            return;
        };
        self.physics.remove_entity(agent);
        if let Some(cluster) = self.clusters.get_mut(ninja.cluster) {
            cluster.remove_agent(agent);
        }

        let dead_body = self.add_levitatable(
            position,
            from_array(consts::DEAD_BODY_HALF_EXTENTS),
            consts::DEAD_BODY_DENSITY,
        );
        self.physics
            .apply_impulse(dead_body, killer_velocity * killer_mass);
        if let Some(mut body) = self.physics.body_mut(dead_body) {
            body.apply_torque_impulse(knock_over_torque(killer_mass, killer_velocity));
        }
        let (dead, schedule) = DeadNinja::spawn(&self.config.dead_ninja, &mut self.rng);
        self.dead_bodies.insert(dead_body, dead);
        if let Some(schedule) = schedule {
            self.apply_death_schedule(dead_body, schedule);
        }

        info!(agent, killer, cluster = ninja.cluster, "[Session] Agent killed");
        self.events.push(GameEvent::AgentKilled {
            agent,
            cluster: ninja.cluster,
            killer,
            dead_body,
        });

        let hit = self.combo.on_hit();
        let recent_hits = self.combo.recent_hits();
        let event = match hit {
            HitEvent::Hit => GameEvent::Hit { recent_hits },
            HitEvent::Combo => GameEvent::Combo { recent_hits },
        };
        self.events.push(event);
    }

    fn apply_death_schedule(&mut self, entity: EntityId, schedule: DeathSchedule) {
        match schedule {
            DeathSchedule::Schedule => {
                let deadline = self.elapsed + self.config.dead_ninja.death_wait_time;
                self.deferred.schedule(deadline, DeferredAction::Despawn(entity));
                debug!(entity, deadline, "[Session] Dead body scheduled for removal");
            }
            DeathSchedule::Reprieve => {
                self.deferred.cancel(&DeferredAction::Despawn(entity));
                debug!(entity, "[Session] Dead body reprieved");
            }
        }
    }

    pub(super) fn update_dead_bodies(&mut self) {
        let player = self.rig.position;
        let mut changes = Vec::new();
        for (&entity, dead) in self.dead_bodies.iter_mut() {
            let Some(levitatable) = self.levitatables.get(&entity) else {
                continue;
            };
            let (Some(position), Some(velocity)) =
                (self.physics.position(entity), self.physics.velocity(entity))
            else {
                continue;
            };
            let change = dead.update(
                &self.config.dead_ninja,
                levitatable.phase(),
                (position - player).norm(),
                velocity.norm(),
            );
            if let Some(change) = change {
                changes.push((entity, change));
            }
        }
        for (entity, change) in changes {
            self.apply_death_schedule(entity, change);
        }
    }

    pub(super) fn run_deferred(&mut self) {
        for action in self.deferred.drain_due(self.elapsed) {
            match action {
                DeferredAction::Despawn(entity) => self.despawn(entity),
            }
        }
    }

    fn despawn(&mut self, entity: EntityId) {
        self.levitatables.remove(&entity);
        self.dead_bodies.remove(&entity);
        if self.physics.remove_entity(entity) {
            debug!(entity, "[Session] Despawned");
            self.events.push(GameEvent::Despawned { entity });
        }
    }
}
