//! Ray sweeps for liftable objects and auto-aim selection among clusters.

use nalgebra::Vector3;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::TargetingConfig;

use super::cluster::ClusterId;
use super::constants::aim as consts;
use super::math::{horizontal_mask, try_normalize};
use super::EntityId;

/// Scene queries the targeting code needs from the physics layer.
pub trait SceneQuery {
    /// Distance to the first level blocker along the ray, if any.
    fn cast_blocker(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<f32>;

    /// Every liftable-tagged body along the ray, nearest first.
    fn cast_liftables(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Vec<LiftableHit>;

    /// True when no level blocker sits between the two points.
    fn has_line_of_sight(&self, from: Vector3<f32>, to: Vector3<f32>) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftableHit {
    pub entity: EntityId,
    pub distance: f32,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetingError {
    #[error("Body {entity} is tagged liftable but has no levitatable attached")]
    MissingLevitatable { entity: EntityId },
}

/// Result of a liftable sweep.
#[derive(Debug, Default, Clone)]
pub struct LiftableSweep {
    /// Levitatable entities in hit order.
    pub targets: Vec<EntityId>,
    /// Misconfigured bodies skipped during the sweep.
    pub errors: Vec<TargetingError>,
}

/// Finds liftable objects along `direction`, up to the first wall plus a margin.
///
/// The wall ray is cast along the flattened direction; the liftable sweep uses the
/// true direction so looking down picks up objects on the floor.
pub fn sweep_liftables<Q, F>(
    query: &Q,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    config: &TargetingConfig,
    has_levitatable: F,
) -> LiftableSweep
where
    Q: SceneQuery + ?Sized,
    F: Fn(EntityId) -> bool,
{
    let mut sweep = LiftableSweep::default();

    let (Some(flat), Some(direction)) = (
        try_normalize(horizontal_mask(direction)),
        try_normalize(direction),
    ) else {
        debug!("[Targeting] Degenerate sweep direction, nothing to lift");
        return sweep;
    };

    let Some(wall_distance) = query.cast_blocker(origin, flat, config.blocker_max_distance) else {
        error!(
            ?origin,
            ?flat,
            "[Targeting] Blocker ray hit nothing; the player is looking into the abyss"
        );
        return sweep;
    };

    let reach = wall_distance + config.blocker_margin;
    for hit in query.cast_liftables(origin, direction, reach) {
        if sweep.targets.len() >= config.max_levitations {
            break;
        }
        if has_levitatable(hit.entity) {
            sweep.targets.push(hit.entity);
        } else {
            let err = TargetingError::MissingLevitatable { entity: hit.entity };
            error!("[Targeting] {}", err);
            sweep.errors.push(err);
        }
    }
    sweep
}

/// Read-only view of a cluster for auto-aim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSnapshot {
    pub id: ClusterId,
    pub center: Vector3<f32>,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimTarget {
    pub point: Vector3<f32>,
    /// Cluster the point belongs to, `None` for the straight-ahead fallback.
    pub cluster: Option<ClusterId>,
}

/// Left edge, center and right edge of a cluster as seen from `viewer`.
fn candidate_points(
    viewer: Vector3<f32>,
    cluster: &ClusterSnapshot,
) -> Option<[Vector3<f32>; consts::CANDIDATES_PER_CLUSTER]> {
    let to_cluster = try_normalize(horizontal_mask(cluster.center - viewer))?;
    let side = to_cluster.cross(&Vector3::y()) * cluster.radius;
    let center = cluster.center + Vector3::new(0.0, consts::AIM_POINT_HEIGHT, 0.0);
    Some([center + side, center, center - side])
}

/// Picks the visible cluster best aligned with `aim`.
///
/// Highest horizontal dot wins; exact ties go to the cluster listed first
/// (creation order). Falls back to a point far along `aim`.
pub fn select_aim_target<Q: SceneQuery + ?Sized>(
    query: &Q,
    viewer: Vector3<f32>,
    aim: Vector3<f32>,
    clusters: &[ClusterSnapshot],
    config: &TargetingConfig,
) -> AimTarget {
    let aim_dir = try_normalize(aim).unwrap_or_else(Vector3::z);
    let fallback = AimTarget {
        point: viewer + aim_dir * config.default_target_distance,
        cluster: None,
    };
    let Some(flat_aim) = try_normalize(horizontal_mask(aim_dir)) else {
        return fallback;
    };

    let mut best: Option<(f32, &ClusterSnapshot)> = None;
    for cluster in clusters {
        let Some(to_cluster) = try_normalize(horizontal_mask(cluster.center - viewer)) else {
            continue;
        };
        let score = flat_aim.dot(&to_cluster);
        if score < config.auto_aim_min_dot {
            continue;
        }
        if best.is_some_and(|(best_score, _)| score <= best_score) {
            continue;
        }
        let Some(candidates) = candidate_points(viewer, cluster) else {
            continue;
        };
        if candidates.iter().any(|&p| query.has_line_of_sight(viewer, p)) {
            best = Some((score, cluster));
        }
    }

    match best {
        Some((score, cluster)) => {
            debug!(cluster = cluster.id, score, "[Targeting] Auto-aim locked");
            AimTarget {
                point: cluster.center + Vector3::new(0.0, consts::AIM_POINT_HEIGHT, 0.0),
                cluster: Some(cluster.id),
            }
        }
        None => fallback,
    }
}
