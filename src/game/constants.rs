//! Gameplay and physics constants.
//! Tunables live in `TuningConfig`; these are the fixed values the tuning is built around.

/// Physics constants
pub mod physics {
    /// Fixed timestep for the simulation tick (50 Hz)
    pub const TIMESTEP: f32 = 1.0 / 50.0;

    /// Small epsilon for float comparisons and direction normalization
    pub const EPSILON: f32 = 0.001;

    /// Half extent of a default liftable crate
    pub const CRATE_HALF_EXTENT: f32 = 0.5;

    /// Default crate density (mass = density * volume)
    pub const CRATE_DENSITY: f32 = 1.0;

    /// Agent capsule radius
    pub const AGENT_RADIUS: f32 = 0.4;

    /// Agent capsule half height of the cylindrical part
    pub const AGENT_HALF_HEIGHT: f32 = 0.6;

    /// Half extents of the box left behind by a killed agent
    pub const DEAD_BODY_HALF_EXTENTS: [f32; 3] = [0.3, 0.9, 0.3];

    pub const DEAD_BODY_DENSITY: f32 = 1.0;
}

/// Motion tracking constants
pub mod tracking {
    /// Number of samples held by every kinematics tracker
    pub const LOG_BUFFER_SIZE: usize = 300;

    /// Delta time stored in slots that have never been written
    pub const UNFILLED_DT: f32 = -1.0;
}

/// Auto-aim constants
pub mod aim {
    /// Number of candidate aim points sampled per cluster (left, center, right)
    pub const CANDIDATES_PER_CLUSTER: usize = 3;

    /// Height offset of aim points above a cluster anchor
    pub const AIM_POINT_HEIGHT: f32 = 1.0;
}
