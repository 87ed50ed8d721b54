use nalgebra::Vector3;
use rapier3d::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::trace;

use super::constants::physics as consts;
use super::levitation::PhysicsBody;
use super::math::try_normalize;
use super::targeting::{LiftableHit, SceneQuery};
use super::EntityId;

// Collision groups
// Blockers are level geometry; liftables collide with everything; agents are
// sensors so a thrown crate keeps flying through them and can chain kills.
// Note: rapier3d uses InteractionGroups (not CollisionGroups like bevy_rapier)
const GROUP_BLOCKER: Group = Group::GROUP_1;
const GROUP_LIFTABLE: Group = Group::GROUP_2;
const GROUP_AGENT: Group = Group::GROUP_3;

/// What a registered rigid body stands for in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Blocker,
    Liftable,
    Agent,
}

#[derive(Debug, Clone, Copy)]
struct BodyEntry {
    handle: RigidBodyHandle,
    kind: BodyKind,
    /// Mass assigned at creation; rapier only recomputes its own on the next step.
    mass: f32,
}

/// Wrapper around the Rapier3D world the session simulates in.
/// Native gravity is zero: levitatables get their weight from gameplay code.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Maps entity ID to its rigid body
    entities: HashMap<EntityId, BodyEntry>,
    /// Maps Rapier collider handle to entity ID (for queries)
    collider_to_entity: HashMap<ColliderHandle, EntityId>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            gravity: Vector::zeros(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            entities: HashMap::new(),
            collider_to_entity: HashMap::new(),
        }
    }

    /// Steps the physics simulation forward by dt seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Refreshes the query pipeline after bodies were added or moved outside a step.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    fn insert(&mut self, entity: EntityId, kind: BodyKind, body: RigidBody, collider: Collider) {
        self.remove_entity(entity);
        let mass = collider.mass();
        let handle = self.rigid_body_set.insert(body);
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        // Rapier defers mass properties to the next step; impulses need them now.
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.recompute_mass_properties_from_colliders(&self.collider_set);
        }
        self.collider_to_entity.insert(collider_handle, entity);
        self.entities.insert(entity, BodyEntry { handle, kind, mass });
        trace!(entity, ?kind, "[Physics] Added body");
    }

    /// Adds a fixed box of level geometry.
    pub fn add_blocker(&mut self, entity: EntityId, position: Vector3<f32>, half_extents: Vector3<f32>) {
        let body = RigidBodyBuilder::fixed().translation(position).build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(GROUP_BLOCKER, Group::ALL))
            .build();
        self.insert(entity, BodyKind::Blocker, body, collider);
    }

    /// Adds a dynamic box that can be levitated. Its gravity scale is zero.
    pub fn add_liftable(
        &mut self,
        entity: EntityId,
        position: Vector3<f32>,
        half_extents: Vector3<f32>,
        density: f32,
    ) {
        let body = RigidBodyBuilder::dynamic()
            .translation(position)
            .gravity_scale(0.0)
            .ccd_enabled(true)
            .build();
        let volume = 8.0 * half_extents.x * half_extents.y * half_extents.z;
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(density * volume)
            .collision_groups(InteractionGroups::new(GROUP_LIFTABLE, Group::ALL))
            .build();
        self.insert(entity, BodyKind::Liftable, body, collider);
    }

    /// Adds a kinematic capsule for an agent. Agents only sense liftables.
    pub fn add_agent(&mut self, entity: EntityId, position: Vector3<f32>) {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(position)
            .build();
        let collider = ColliderBuilder::capsule_y(consts::AGENT_HALF_HEIGHT, consts::AGENT_RADIUS)
            .sensor(true)
            .collision_groups(InteractionGroups::new(GROUP_AGENT, GROUP_LIFTABLE))
            .build();
        self.insert(entity, BodyKind::Agent, body, collider);
    }

    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        let Some(entry) = self.entities.remove(&entity) else {
            return false;
        };
        // Remove collider mappings before destroying the body
        if let Some(body) = self.rigid_body_set.get(entry.handle) {
            for ch in body.colliders() {
                self.collider_to_entity.remove(ch);
            }
        }
        self.rigid_body_set.remove(
            entry.handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    pub fn entities_of_kind(&self, kind: BodyKind) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .entities
            .iter()
            .filter(|(_, e)| e.kind == kind)
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn position(&self, entity: EntityId) -> Option<Vector3<f32>> {
        let entry = self.entities.get(&entity)?;
        self.rigid_body_set.get(entry.handle).map(|b| *b.translation())
    }

    pub fn velocity(&self, entity: EntityId) -> Option<Vector3<f32>> {
        let entry = self.entities.get(&entity)?;
        self.rigid_body_set.get(entry.handle).map(|b| *b.linvel())
    }

    pub fn angular_velocity(&self, entity: EntityId) -> Option<Vector3<f32>> {
        let entry = self.entities.get(&entity)?;
        self.rigid_body_set.get(entry.handle).map(|b| *b.angvel())
    }

    pub fn mass(&self, entity: EntityId) -> Option<f32> {
        self.entities.get(&entity).map(|e| e.mass)
    }

    /// Moves a kinematic agent to `position` over the next step.
    pub fn set_kinematic_position(&mut self, entity: EntityId, position: Vector3<f32>) {
        let Some(entry) = self.entities.get(&entity) else {
            return;
        };
        if let Some(body) = self.rigid_body_set.get_mut(entry.handle) {
            body.set_next_kinematic_translation(position);
        }
    }

    pub fn apply_impulse(&mut self, entity: EntityId, impulse: Vector3<f32>) {
        let Some(entry) = self.entities.get(&entity) else {
            return;
        };
        if let Some(body) = self.rigid_body_set.get_mut(entry.handle) {
            body.apply_impulse(impulse, true);
        }
    }

    /// Clears forces from the previous tick on every liftable.
    /// Rapier keeps user forces until reset.
    pub fn reset_forces(&mut self) {
        for entry in self.entities.values() {
            if entry.kind != BodyKind::Liftable {
                continue;
            }
            if let Some(body) = self.rigid_body_set.get_mut(entry.handle) {
                body.reset_forces(false);
            }
        }
    }

    /// Borrow a body through the gameplay-facing `PhysicsBody` surface.
    pub fn body_mut(&mut self, entity: EntityId) -> Option<RapierBody<'_>> {
        let entry = *self.entities.get(&entity)?;
        let body = self.rigid_body_set.get_mut(entry.handle)?;
        Some(RapierBody {
            body,
            mass: entry.mass,
        })
    }

    /// Detects (liftable, agent) pairs whose colliders overlap.
    /// Uses intersection queries since agents are sensors and never produce contacts.
    pub fn detect_agent_overlaps(&self) -> BTreeSet<(EntityId, EntityId)> {
        let mut overlaps = BTreeSet::new();
        let filter =
            QueryFilter::default().groups(InteractionGroups::new(Group::ALL, GROUP_LIFTABLE));

        for (&agent, entry) in &self.entities {
            if entry.kind != BodyKind::Agent {
                continue;
            }
            let Some(body) = self.rigid_body_set.get(entry.handle) else {
                continue;
            };
            for ch in body.colliders() {
                let Some(collider) = self.collider_set.get(*ch) else {
                    continue;
                };
                self.query_pipeline.intersections_with_shape(
                    &self.rigid_body_set,
                    &self.collider_set,
                    collider.position(),
                    collider.shape(),
                    filter,
                    |other| {
                        if let Some(&liftable) = self.collider_to_entity.get(&other) {
                            overlaps.insert((liftable, agent));
                        }
                        true // continue searching
                    },
                );
            }
        }
        overlaps
    }
}

fn blocker_filter() -> QueryFilter<'static> {
    QueryFilter::default().groups(InteractionGroups::new(Group::ALL, GROUP_BLOCKER))
}

impl SceneQuery for PhysicsWorld {
    fn cast_blocker(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<f32> {
        let direction = try_normalize(direction)?;
        let ray = Ray::new(Point::from(origin), direction);
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true, // solid
                blocker_filter(),
            )
            .map(|(_, distance)| distance)
    }

    fn cast_liftables(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Vec<LiftableHit> {
        let Some(direction) = try_normalize(direction) else {
            return Vec::new();
        };
        let ray = Ray::new(Point::from(origin), direction);
        let filter =
            QueryFilter::default().groups(InteractionGroups::new(Group::ALL, GROUP_LIFTABLE));

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
            |handle, intersection| {
                if let Some(&entity) = self.collider_to_entity.get(&handle) {
                    hits.push(LiftableHit {
                        entity,
                        distance: intersection.time_of_impact,
                    });
                }
                true
            },
        );
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.entity.cmp(&b.entity))
        });
        hits
    }

    fn has_line_of_sight(&self, from: Vector3<f32>, to: Vector3<f32>) -> bool {
        let direction = to - from;
        let max_dist = direction.norm();
        if max_dist < consts::EPSILON {
            return true; // Same position
        }
        let ray = Ray::new(Point::from(from), direction / max_dist);
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_dist,
                true,
                blocker_filter(),
            )
            .is_none()
    }
}

/// A borrowed rapier body driven through `PhysicsBody`.
pub struct RapierBody<'a> {
    body: &'a mut RigidBody,
    mass: f32,
}

impl PhysicsBody for RapierBody<'_> {
    fn position(&self) -> Vector3<f32> {
        *self.body.translation()
    }

    fn velocity(&self) -> Vector3<f32> {
        *self.body.linvel()
    }

    fn mass(&self) -> f32 {
        self.mass
    }

    fn apply_force(&mut self, force: Vector3<f32>) {
        self.body.add_force(force, true);
    }

    fn apply_torque_impulse(&mut self, impulse: Vector3<f32>) {
        self.body.apply_torque_impulse(impulse, true);
    }

    fn set_position(&mut self, position: Vector3<f32>) {
        self.body.set_translation(position, true);
    }

    fn set_velocity(&mut self, velocity: Vector3<f32>) {
        self.body.set_linvel(velocity, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crate_half() -> Vector3<f32> {
        Vector3::repeat(consts::CRATE_HALF_EXTENT)
    }

    fn wall_world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        // Wall 20 units ahead along +Z
        world.add_blocker(1, Vector3::new(0.0, 0.0, 20.0), Vector3::new(10.0, 5.0, 0.5));
        world.update_query_pipeline();
        world
    }

    #[test]
    fn test_physics_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.gravity, Vector::zeros());
        assert!(world.entities_of_kind(BodyKind::Liftable).is_empty());
    }

    #[test]
    fn test_cast_blocker_hits_wall() {
        let world = wall_world();
        let dist = world
            .cast_blocker(Vector3::zeros(), Vector3::z(), 100.0)
            .expect("Should hit wall");
        assert!((dist - 19.5).abs() < 0.01, "dist = {}", dist);
        assert!(world.cast_blocker(Vector3::zeros(), -Vector3::z(), 100.0).is_none());
    }

    #[test]
    fn test_cast_liftables_sorted_and_ignores_blockers() {
        let mut world = wall_world();
        world.add_liftable(10, Vector3::new(0.0, 0.0, 12.0), crate_half(), 1.0);
        world.add_liftable(11, Vector3::new(0.0, 0.0, 4.0), crate_half(), 1.0);
        world.add_liftable(12, Vector3::new(5.0, 0.0, 8.0), crate_half(), 1.0);
        world.update_query_pipeline();

        let hits = world.cast_liftables(Vector3::zeros(), Vector3::z(), 50.0);
        let ids: Vec<_> = hits.iter().map(|h| h.entity).collect();
        assert_eq!(ids, vec![11, 10]);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_line_of_sight_blocked_by_wall_only() {
        let mut world = wall_world();
        world.add_liftable(10, Vector3::new(0.0, 0.0, 5.0), crate_half(), 1.0);
        world.update_query_pipeline();

        assert!(world.has_line_of_sight(Vector3::zeros(), Vector3::new(0.0, 0.0, 15.0)));
        assert!(!world.has_line_of_sight(Vector3::zeros(), Vector3::new(0.0, 0.0, 30.0)));
    }

    #[test]
    fn test_liftable_ignores_native_gravity() {
        let mut world = PhysicsWorld::new();
        world.gravity = vector![0.0, -9.81, 0.0];
        world.add_liftable(1, Vector3::new(0.0, 10.0, 0.0), crate_half(), 1.0);
        for _ in 0..10 {
            world.step(consts::TIMESTEP);
        }
        let pos = world.position(1).unwrap();
        assert!((pos.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_rapier_body_force_moves_liftable() {
        let mut world = PhysicsWorld::new();
        world.add_liftable(1, Vector3::new(0.0, 10.0, 0.0), crate_half(), 1.0);
        assert!((world.mass(1).unwrap() - 1.0).abs() < 1e-5);

        for _ in 0..10 {
            world.reset_forces();
            let mut body = world.body_mut(1).unwrap();
            let weight = Vector3::new(0.0, -9.8, 0.0) * body.mass();
            body.apply_force(weight);
            world.step(consts::TIMESTEP);
        }
        assert!(world.position(1).unwrap().y < 10.0);
        assert!(world.velocity(1).unwrap().y < 0.0);
    }

    #[test]
    fn test_set_position_teleports() {
        let mut world = PhysicsWorld::new();
        world.add_liftable(1, Vector3::zeros(), crate_half(), 1.0);
        world.body_mut(1).unwrap().set_position(Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(world.position(1), Some(Vector3::new(3.0, 4.0, 5.0)));
    }

    #[test]
    fn test_impulses_act_before_first_step() {
        let mut world = PhysicsWorld::new();
        world.add_liftable(1, Vector3::new(0.0, 5.0, 0.0), crate_half(), 2.0);
        world.apply_impulse(1, Vector3::new(4.0, 0.0, 0.0));
        let velocity = world.velocity(1).unwrap();
        assert!((velocity.x - 2.0).abs() < 1e-4, "velocity = {:?}", velocity);

        world
            .body_mut(1)
            .unwrap()
            .apply_torque_impulse(Vector3::new(1.0, 0.0, 0.0));
        assert!(world.angular_velocity(1).unwrap().x > 0.0);
    }

    #[test]
    fn test_set_velocity_is_integrated_by_step() {
        let mut world = PhysicsWorld::new();
        world.add_liftable(1, Vector3::new(0.0, 5.0, 0.0), crate_half(), 1.0);
        world
            .body_mut(1)
            .unwrap()
            .set_velocity(Vector3::new(2.0, 0.0, 0.0));
        world.step(consts::TIMESTEP);
        let pos = world.position(1).unwrap();
        assert!((pos.x - 2.0 * consts::TIMESTEP).abs() < 1e-4, "pos = {:?}", pos);
        assert!((world.velocity(1).unwrap().x - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_agent_overlap_detection() {
        let mut world = PhysicsWorld::new();
        world.add_agent(100, Vector3::new(0.0, 1.0, 0.0));
        world.add_agent(101, Vector3::new(10.0, 1.0, 0.0));
        world.add_liftable(1, Vector3::new(0.3, 1.0, 0.0), crate_half(), 1.0);
        world.add_blocker(2, Vector3::new(10.0, 1.0, 0.0), crate_half());
        world.step(consts::TIMESTEP);

        let overlaps = world.detect_agent_overlaps();
        assert_eq!(overlaps.into_iter().collect::<Vec<_>>(), vec![(1, 100)]);
    }

    #[test]
    fn test_remove_entity() {
        let mut world = wall_world();
        assert!(world.remove_entity(1));
        assert!(!world.remove_entity(1));
        world.update_query_pipeline();
        assert!(world.cast_blocker(Vector3::zeros(), Vector3::z(), 100.0).is_none());
    }
}
