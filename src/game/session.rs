mod agents;
mod interaction;
mod tick_pipeline;

use crossbeam_channel::Sender;
use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TuningConfig;

use super::actions::{CommandQueue, SessionCommand};
use super::cluster::{ClusterId, ClusterRegistry, NinjaAgent};
use super::combo::ComboTracker;
use super::constants::physics as consts;
use super::dead_ninja::DeadNinja;
use super::deferred::DeferredQueue;
use super::events::GameEvent;
use super::gesture::GestureDetector;
use super::kinematics::{KinematicsTracker, TrackedQuantity};
use super::levitation::{Levitatable, LevitationPhase};
use super::math::{from_array, try_normalize};
use super::physics::PhysicsWorld;
use super::EntityId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("No levitatable with id {entity}")]
    UnknownLevitatable { entity: EntityId },
    #[error("No cluster with id {cluster}")]
    UnknownCluster { cluster: ClusterId },
    #[error("Throw direction {direction:?} has no length")]
    DegenerateDirection { direction: [f32; 3] },
}

/// A tracked transform of the player rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigTransform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl RigTransform {
    pub fn new(translation: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            translation,
            rotation,
        }
    }
}

/// Where the player is this tick, as reported by the headset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRig {
    /// Body position; levitated objects hover relative to it.
    pub position: Vector3<f32>,
    pub head: RigTransform,
    pub face: RigTransform,
    /// Origin of liftable sweeps and auto-aim rays.
    pub camera: Vector3<f32>,
}

impl Default for PlayerRig {
    fn default() -> Self {
        let eyes = Vector3::new(0.0, 1.7, 0.0);
        Self {
            position: Vector3::zeros(),
            head: RigTransform::new(eyes, UnitQuaternion::identity()),
            face: RigTransform::new(eyes, UnitQuaternion::identity()),
            camera: eyes,
        }
    }
}

/// Pending work for the deferred queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredAction {
    Despawn(EntityId),
}

/// One player's levitation sandbox: physics, trackers, gameplay state.
///
/// All mutation happens inside `tick`; spawning happens between ticks.
pub struct GameSession {
    config: TuningConfig,
    physics: PhysicsWorld,
    rng: StdRng,
    rig: PlayerRig,
    head: KinematicsTracker,
    face: KinematicsTracker,
    gestures: GestureDetector,
    levitatables: BTreeMap<EntityId, Levitatable>,
    clusters: ClusterRegistry,
    agents: BTreeMap<EntityId, NinjaAgent>,
    dead_bodies: BTreeMap<EntityId, DeadNinja>,
    combo: ComboTracker,
    deferred: DeferredQueue<DeferredAction>,
    commands: CommandQueue,
    events: Vec<GameEvent>,
    next_entity: EntityId,
    elapsed: f32,
    tick: u64,
}

impl GameSession {
    pub fn new(config: TuningConfig, seed: u64) -> Self {
        Self {
            head: KinematicsTracker::new(TrackedQuantity::Translation),
            face: KinematicsTracker::new(TrackedQuantity::Translation),
            gestures: GestureDetector::new(config.gestures.clone()),
            combo: ComboTracker::new(config.combo.clone()),
            config,
            physics: PhysicsWorld::new(),
            rng: StdRng::seed_from_u64(seed),
            rig: PlayerRig::default(),
            levitatables: BTreeMap::new(),
            clusters: ClusterRegistry::new(),
            agents: BTreeMap::new(),
            dead_bodies: BTreeMap::new(),
            deferred: DeferredQueue::new(),
            commands: CommandQueue::new(),
            events: Vec::new(),
            next_entity: 0,
            elapsed: 0.0,
            tick: 0,
        }
    }

    fn allocate_entity(&mut self) -> EntityId {
        self.next_entity += 1;
        self.next_entity
    }

    /// Adds a fixed box of level geometry.
    pub fn add_blocker(&mut self, position: Vector3<f32>, half_extents: Vector3<f32>) -> EntityId {
        let id = self.allocate_entity();
        self.physics.add_blocker(id, position, half_extents);
        self.physics.update_query_pipeline();
        id
    }

    /// Adds a liftable box with its levitation state.
    pub fn add_levitatable(
        &mut self,
        position: Vector3<f32>,
        half_extents: Vector3<f32>,
        density: f32,
    ) -> EntityId {
        let id = self.allocate_entity();
        self.physics.add_liftable(id, position, half_extents, density);
        self.physics.update_query_pipeline();
        self.levitatables.insert(
            id,
            Levitatable::new(self.config.levitation.clone(), self.config.throwing.clone()),
        );
        id
    }

    /// Adds a liftable-tagged body that has no levitation state.
    /// Sweeps report it as a configuration error and skip it.
    pub fn add_bare_liftable(&mut self, position: Vector3<f32>, half_extents: Vector3<f32>) -> EntityId {
        let id = self.allocate_entity();
        self.physics
            .add_liftable(id, position, half_extents, consts::CRATE_DENSITY);
        self.physics.update_query_pipeline();
        id
    }

    /// Creates a cluster anchored at `anchor` with one agent per position.
    pub fn spawn_cluster(
        &mut self,
        anchor: Vector3<f32>,
        agent_positions: &[Vector3<f32>],
    ) -> ClusterId {
        let cluster = self.clusters.create(anchor);
        for &position in agent_positions {
            let id = self.allocate_entity();
            self.physics.add_agent(id, position);
            self.agents.insert(id, NinjaAgent { id, cluster });
            if let Some(c) = self.clusters.get_mut(cluster) {
                c.agents.push(id);
            }
        }
        self.physics.update_query_pipeline();
        info!(cluster, agents = agent_positions.len(), "[Session] Spawned cluster");
        cluster
    }

    pub fn add_agent(
        &mut self,
        cluster: ClusterId,
        position: Vector3<f32>,
    ) -> Result<EntityId, SessionError> {
        if self.clusters.get(cluster).is_none() {
            return Err(SessionError::UnknownCluster { cluster });
        }
        let id = self.allocate_entity();
        self.physics.add_agent(id, position);
        self.physics.update_query_pipeline();
        self.agents.insert(id, NinjaAgent { id, cluster });
        if let Some(c) = self.clusters.get_mut(cluster) {
            c.agents.push(id);
        }
        Ok(id)
    }

    /// Sets the player pose used by the next tick.
    pub fn set_player_rig(&mut self, rig: PlayerRig) {
        self.rig = rig;
    }

    /// Queues a command for the next tick, rejecting ids and directions it could never apply.
    pub fn queue_command(&self, command: SessionCommand) -> Result<(), SessionError> {
        match &command {
            SessionCommand::ManualThrow => {}
            SessionCommand::DebugLevitate { entity } => {
                self.require_levitatable(*entity)?;
            }
            SessionCommand::DebugThrow { entity, direction } => {
                self.require_levitatable(*entity)?;
                if try_normalize(from_array(*direction)).is_none() {
                    return Err(SessionError::DegenerateDirection {
                        direction: *direction,
                    });
                }
            }
        }
        debug!(?command, "[Session] Queued command");
        self.commands.push(command);
        Ok(())
    }

    /// Channel end for feeding commands from another thread. Commands sent
    /// this way skip validation and are dropped with a warning if stale.
    pub fn command_sender(&self) -> Sender<SessionCommand> {
        self.commands.sender()
    }

    fn require_levitatable(&self, entity: EntityId) -> Result<(), SessionError> {
        if self.levitatables.contains_key(&entity) {
            Ok(())
        } else {
            Err(SessionError::UnknownLevitatable { entity })
        }
    }

    /// Advances the simulation by `dt` seconds and returns what happened.
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        if !(dt > 0.0 && dt.is_finite()) {
            warn!(dt, "[Session] Ignoring tick with non-positive delta time");
            return Vec::new();
        }
        self.elapsed += dt;
        tick_pipeline::run_tick_phases(self, dt);
        self.tick += 1;
        std::mem::take(&mut self.events)
    }

    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn rig(&self) -> &PlayerRig {
        &self.rig
    }

    pub fn head_tracker(&self) -> &KinematicsTracker {
        &self.head
    }

    pub fn face_tracker(&self) -> &KinematicsTracker {
        &self.face
    }

    pub fn gestures(&self) -> &GestureDetector {
        &self.gestures
    }

    pub fn levitatable(&self, entity: EntityId) -> Option<&Levitatable> {
        self.levitatables.get(&entity)
    }

    pub fn levitatable_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.levitatables.keys().copied()
    }

    /// Ids of the levitatables currently in `phase`.
    pub fn in_phase(&self, phase: LevitationPhase) -> Vec<EntityId> {
        self.levitatables
            .iter()
            .filter(|(_, l)| l.phase() == phase)
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn clusters(&self) -> &ClusterRegistry {
        &self.clusters
    }

    pub fn agents(&self) -> impl Iterator<Item = &NinjaAgent> {
        self.agents.values()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn is_dead_body(&self, entity: EntityId) -> bool {
        self.dead_bodies.contains_key(&entity)
    }

    pub fn dead_body_count(&self) -> usize {
        self.dead_bodies.len()
    }

    pub fn combo(&self) -> &ComboTracker {
        &self.combo
    }

    pub fn pending_removals(&self) -> usize {
        self.deferred.len()
    }

    /// Simulated seconds since the session started.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(TuningConfig::default(), 1)
    }

    #[test]
    fn test_entity_ids_are_unique_and_increasing() {
        let mut s = session();
        let wall = s.add_blocker(Vector3::new(0.0, 0.0, 10.0), Vector3::repeat(1.0));
        let crate_id = s.add_levitatable(Vector3::zeros(), Vector3::repeat(0.5), 1.0);
        let cluster = s.spawn_cluster(Vector3::zeros(), &[Vector3::x(), Vector3::z()]);
        assert!(wall < crate_id);
        let agent_ids: Vec<_> = s.agents().map(|a| a.id).collect();
        assert_eq!(agent_ids, vec![crate_id + 1, crate_id + 2]);
        assert_eq!(s.clusters().get(cluster).unwrap().agents, agent_ids);
    }

    #[test]
    fn test_queue_command_validates() {
        let mut s = session();
        let id = s.add_levitatable(Vector3::zeros(), Vector3::repeat(0.5), 1.0);
        assert_eq!(
            s.queue_command(SessionCommand::DebugLevitate { entity: 99 }),
            Err(SessionError::UnknownLevitatable { entity: 99 })
        );
        assert_eq!(
            s.queue_command(SessionCommand::DebugThrow {
                entity: id,
                direction: [0.0; 3],
            }),
            Err(SessionError::DegenerateDirection { direction: [0.0; 3] })
        );
        assert!(s.queue_command(SessionCommand::DebugLevitate { entity: id }).is_ok());
        assert!(s.queue_command(SessionCommand::ManualThrow).is_ok());
    }

    #[test]
    fn test_add_agent_to_unknown_cluster() {
        let mut s = session();
        assert_eq!(
            s.add_agent(42, Vector3::zeros()),
            Err(SessionError::UnknownCluster { cluster: 42 })
        );
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut s = session();
        assert!(s.tick(0.0).is_empty());
        assert!(s.tick(f32::NAN).is_empty());
        assert_eq!(s.tick_count(), 0);
        assert_eq!(s.elapsed(), 0.0);
    }
}
