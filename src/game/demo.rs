//! Scripted sandbox used by `levitate simulate`: a walled arena, a column of
//! crates in front of the player, two clusters and a canned nod-then-jerk.

use nalgebra::{UnitQuaternion, Vector3};

use super::cluster::ClusterId;
use super::constants::physics as consts;
use super::session::{GameSession, PlayerRig, RigTransform};
use super::EntityId;

const ARENA_HALF_SIZE: f32 = 30.0;
const WALL_HEIGHT: f32 = 6.0;
/// Head pitch (radians, downward) that points the nod at the crate column.
const HEAD_PITCH: f32 = 0.25;
const NOD_SPEED: f32 = 5.0;
const JERK_SPEED: f32 = 12.0;

pub const NOD_START_TICK: u64 = 25;
pub const JERK_START_TICK: u64 = 100;
const MOTION_TICKS: u64 = 6;

/// What `build_arena` placed in the session.
#[derive(Debug, Clone)]
pub struct DemoArena {
    pub walls: Vec<EntityId>,
    /// Crates lined up along the player's view.
    pub crates_in_view: Vec<EntityId>,
    /// Crates off to the side that a straight nod misses.
    pub side_crates: Vec<EntityId>,
    /// Cluster in front of the player, then the one behind.
    pub clusters: [ClusterId; 2],
}

pub fn build_arena(session: &mut GameSession) -> DemoArena {
    let h = ARENA_HALF_SIZE;
    let mut walls = vec![session.add_blocker(
        Vector3::new(0.0, -0.5, 0.0),
        Vector3::new(h, 0.5, h),
    )];
    let y = WALL_HEIGHT / 2.0;
    for (center, half) in [
        (Vector3::new(0.0, y, h), Vector3::new(h, y, 0.5)),
        (Vector3::new(0.0, y, -h), Vector3::new(h, y, 0.5)),
        (Vector3::new(h, y, 0.0), Vector3::new(0.5, y, h)),
        (Vector3::new(-h, y, 0.0), Vector3::new(0.5, y, h)),
    ] {
        walls.push(session.add_blocker(center, half));
    }

    let half = Vector3::repeat(consts::CRATE_HALF_EXTENT);
    let crates_in_view = [3.0, 4.5, 6.0]
        .into_iter()
        .map(|z| session.add_levitatable(Vector3::new(0.0, half.y, z), half, consts::CRATE_DENSITY))
        .collect();
    let side_crates = [-4.0, 4.0]
        .into_iter()
        .map(|x| session.add_levitatable(Vector3::new(x, half.y, 5.0), half, consts::CRATE_DENSITY))
        .collect();

    let agent_y = consts::AGENT_HALF_HEIGHT + consts::AGENT_RADIUS;
    let ahead = session.spawn_cluster(
        Vector3::new(0.0, 0.0, 22.0),
        &[
            Vector3::new(-1.5, agent_y, 22.0),
            Vector3::new(0.0, agent_y, 21.0),
            Vector3::new(1.5, agent_y, 22.0),
        ],
    );
    let behind = session.spawn_cluster(
        Vector3::new(-18.0, 0.0, -6.0),
        &[
            Vector3::new(-18.0, agent_y, -5.0),
            Vector3::new(-17.0, agent_y, -7.0),
        ],
    );

    DemoArena {
        walls,
        crates_in_view,
        side_crates,
        clusters: [ahead, behind],
    }
}

/// Canned headset motion: idle, a downward nod, a pause, then a sideways face jerk.
#[derive(Debug, Clone)]
pub struct DemoScript {
    tick: u64,
    rig: PlayerRig,
}

impl Default for DemoScript {
    fn default() -> Self {
        let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), HEAD_PITCH);
        let mut rig = PlayerRig::default();
        rig.head = RigTransform::new(rig.head.translation, pitch);
        rig.face = RigTransform::new(rig.face.translation, pitch);
        Self { tick: 0, rig }
    }
}

impl DemoScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rig pose for the next tick.
    pub fn next_rig(&mut self, dt: f32) -> PlayerRig {
        let head_vy = phase_velocity(self.tick, NOD_START_TICK, -NOD_SPEED);
        let face_vx = phase_velocity(self.tick, JERK_START_TICK, JERK_SPEED);
        self.rig.head.translation.y += head_vy * dt;
        self.rig.face.translation.x += face_vx * dt;
        self.tick += 1;
        self.rig
    }
}

/// Out-and-back motion: `speed` for a few ticks from `start`, then `-speed` as long.
fn phase_velocity(tick: u64, start: u64, speed: f32) -> f32 {
    if (start..start + MOTION_TICKS).contains(&tick) {
        speed
    } else if (start + MOTION_TICKS..start + 2 * MOTION_TICKS).contains(&tick) {
        -speed
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_returns_to_rest() {
        let mut script = DemoScript::new();
        let dt = consts::TIMESTEP;
        let start = script.next_rig(dt);
        let mut lowest = start.head.translation.y;
        let mut last = start;
        for _ in 0..200 {
            last = script.next_rig(dt);
            lowest = lowest.min(last.head.translation.y);
        }
        assert!((last.head.translation - start.head.translation).norm() < 1e-4);
        assert!((last.face.translation - start.face.translation).norm() < 1e-4);
        assert!(lowest < start.head.translation.y - 0.5);
    }
}
