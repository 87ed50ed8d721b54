pub mod actions;
pub mod cluster;
pub mod combo;
pub mod constants;
pub mod dead_ninja;
pub mod demo;
pub mod deferred;
pub mod events;
pub mod gesture;
pub mod kinematics;
pub mod levitation;
pub mod math;
pub mod physics;
pub mod session;
pub mod targeting;

/// Identifier shared by a physics body and the gameplay state attached to it.
pub type EntityId = u64;

pub use actions::SessionCommand;
pub use cluster::ClusterId;
pub use events::GameEvent;
pub use session::{GameSession, PlayerRig, RigTransform, SessionError};
