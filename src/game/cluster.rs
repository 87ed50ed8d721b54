//! Groups of AI agents that move and get targeted together.

use nalgebra::Vector3;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::ClusterConfig;

use super::math::{horizontal_mask, try_normalize};
use super::targeting::ClusterSnapshot;
use super::EntityId;

pub type ClusterId = u64;

/// A group of agents sharing one anchor point.
#[derive(Debug, Clone)]
pub struct NinjaCluster {
    pub id: ClusterId,
    pub anchor: Vector3<f32>,
    pub agents: Vec<EntityId>,
    /// Largest horizontal agent distance from the anchor, refreshed by `update`.
    pub radius: f32,
}

impl NinjaCluster {
    pub fn new(id: ClusterId, anchor: Vector3<f32>) -> Self {
        Self {
            id,
            anchor,
            agents: Vec::new(),
            radius: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn remove_agent(&mut self, agent: EntityId) -> bool {
        let before = self.agents.len();
        self.agents.retain(|&a| a != agent);
        self.agents.len() != before
    }

    /// Refreshes the radius and pulls the anchor toward the agents' average.
    pub fn update(&mut self, agent_positions: &[Vector3<f32>], lerp_towards_agents: f32) {
        if agent_positions.is_empty() {
            self.radius = 0.0;
            return;
        }

        let average =
            agent_positions.iter().sum::<Vector3<f32>>() / agent_positions.len() as f32;
        self.anchor = self.anchor.lerp(&average, lerp_towards_agents);

        self.radius = agent_positions
            .iter()
            .map(|p| horizontal_mask(p - self.anchor).norm())
            .fold(0.0, f32::max);
    }

    pub fn snapshot(&self) -> ClusterSnapshot {
        ClusterSnapshot {
            id: self.id,
            center: self.anchor,
            radius: self.radius,
        }
    }
}

/// Shared registry of live clusters, iterated in creation order.
#[derive(Debug, Default)]
pub struct ClusterRegistry {
    clusters: BTreeMap<ClusterId, NinjaCluster>,
    next_id: ClusterId,
}

impl ClusterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, anchor: Vector3<f32>) -> ClusterId {
        self.next_id += 1;
        let id = self.next_id;
        self.clusters.insert(id, NinjaCluster::new(id, anchor));
        id
    }

    pub fn get(&self, id: ClusterId) -> Option<&NinjaCluster> {
        self.clusters.get(&id)
    }

    pub fn get_mut(&mut self, id: ClusterId) -> Option<&mut NinjaCluster> {
        self.clusters.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NinjaCluster> {
        self.clusters.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NinjaCluster> {
        self.clusters.values_mut()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn snapshots(&self) -> Vec<ClusterSnapshot> {
        self.clusters.values().map(NinjaCluster::snapshot).collect()
    }

    /// Drops clusters whose agent list is empty and returns their ids.
    pub fn remove_empty(&mut self) -> Vec<ClusterId> {
        let empty: Vec<ClusterId> = self
            .clusters
            .values()
            .filter(|c| c.is_empty())
            .map(|c| c.id)
            .collect();
        for id in &empty {
            self.clusters.remove(id);
            debug!(cluster = id, "[Cluster] Emptied");
        }
        empty
    }
}

/// An AI agent belonging to a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NinjaAgent {
    pub id: EntityId,
    pub cluster: ClusterId,
}

/// Horizontal move direction for an agent: toward the anchor, away from siblings.
///
/// Returns a unit vector in the XZ plane, or zero when the forces cancel.
pub fn steer_agent(
    position: Vector3<f32>,
    anchor: Vector3<f32>,
    siblings: impl IntoIterator<Item = Vector3<f32>>,
    config: &ClusterConfig,
) -> Vector3<f32> {
    let towards_cluster = try_normalize(horizontal_mask(anchor - position))
        .map(|dir| dir * config.agent_cluster_force)
        .unwrap_or_else(Vector3::zeros);

    let mut away_from_siblings = Vector3::zeros();
    for sibling in siblings {
        let away = horizontal_mask(position - sibling);
        let dist = away.norm();
        if dist <= f32::EPSILON {
            continue;
        }
        let falloff = (1.0 - dist / config.max_separation_force_distance).clamp(0.0, 1.0);
        away_from_siblings += (away / dist)
            * (falloff.powf(config.separation_force_distance_power) * config.max_separation_force);
    }

    try_normalize(towards_cluster + away_from_siblings).unwrap_or_else(Vector3::zeros)
}

/// True when a hit with this mass and velocity is lethal to an agent.
pub fn is_lethal_hit(mass: f32, velocity: Vector3<f32>, momentum_to_die: f32) -> bool {
    mass * velocity.norm() >= momentum_to_die
}

/// Torque impulse that tips a dead body over along the killer's horizontal
/// travel: about the axis rotating +Y onto that direction, scaled by the
/// killer's mass. Zero when the killer moved straight up or down.
pub fn knock_over_torque(killer_mass: f32, killer_velocity: Vector3<f32>) -> Vector3<f32> {
    try_normalize(Vector3::y().cross(&horizontal_mask(killer_velocity)))
        .map(|axis| axis * killer_mass)
        .unwrap_or_else(Vector3::zeros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_radius_is_max_horizontal_distance() {
        let mut cluster = NinjaCluster::new(1, Vector3::zeros());
        let agents = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 5.0, -3.0),
            Vector3::new(-2.0, 0.0, 0.0),
        ];
        cluster.update(&agents, 0.0);
        assert_eq!(cluster.anchor, Vector3::zeros());
        assert!((cluster.radius - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_update_lerps_anchor_toward_average() {
        let mut cluster = NinjaCluster::new(1, Vector3::zeros());
        cluster.update(&[Vector3::new(4.0, 0.0, 0.0), Vector3::new(8.0, 0.0, 0.0)], 0.5);
        assert!((cluster.anchor.x - 3.0).abs() < 1e-6);
        assert!((cluster.radius - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_registry_removes_empty_clusters_in_order() {
        let mut registry = ClusterRegistry::new();
        let a = registry.create(Vector3::zeros());
        let b = registry.create(Vector3::x());
        let c = registry.create(Vector3::z());
        registry.get_mut(b).unwrap().agents.push(10);

        assert_eq!(registry.remove_empty(), vec![a, c]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshots()[0].id, b);
    }

    #[test]
    fn test_registry_ids_follow_creation_order() {
        let mut registry = ClusterRegistry::new();
        let ids: Vec<_> = (0..4).map(|_| registry.create(Vector3::zeros())).collect();
        let listed: Vec<_> = registry.iter().map(|c| c.id).collect();
        assert_eq!(ids, listed);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_remove_agent() {
        let mut cluster = NinjaCluster::new(1, Vector3::zeros());
        cluster.agents = vec![1, 2, 3];
        assert!(cluster.remove_agent(2));
        assert!(!cluster.remove_agent(2));
        assert_eq!(cluster.agents, vec![1, 3]);
    }

    #[test]
    fn test_steer_toward_anchor_when_alone() {
        let dir = steer_agent(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 3.0, 0.0),
            std::iter::empty(),
            &ClusterConfig::default(),
        );
        assert!((dir - Vector3::x()).norm() < 1e-6);
    }

    #[test]
    fn test_steer_separates_from_close_sibling() {
        let dir = steer_agent(
            Vector3::zeros(),
            Vector3::zeros(),
            [Vector3::new(1.0, 0.0, 0.0)],
            &ClusterConfig::default(),
        );
        assert!((dir - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_steer_ignores_coincident_sibling() {
        let dir = steer_agent(
            Vector3::zeros(),
            Vector3::zeros(),
            [Vector3::zeros()],
            &ClusterConfig::default(),
        );
        assert_eq!(dir, Vector3::zeros());
    }

    #[test]
    fn test_lethal_hit_threshold() {
        assert!(is_lethal_hit(2.0, Vector3::new(5.0, 0.0, 0.0), 10.0));
        assert!(!is_lethal_hit(2.0, Vector3::new(4.9, 0.0, 0.0), 10.0));
    }

    #[test]
    fn test_knock_over_torque_tips_along_travel() {
        let torque = knock_over_torque(3.0, Vector3::new(0.0, -2.0, 20.0));
        assert!((torque - Vector3::new(3.0, 0.0, 0.0)).norm() < 1e-5);

        let torque = knock_over_torque(1.0, Vector3::new(5.0, 0.0, 0.0));
        assert!((torque - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-5);

        assert_eq!(knock_over_torque(1.0, Vector3::new(0.0, -9.0, 0.0)), Vector3::zeros());
    }
}
