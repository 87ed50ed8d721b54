//! Levitate gameplay library
//!
//! Head-gesture levitation and auto-aimed throwing on top of a Rapier world:
//! motion tracking, gesture detection, liftable sweeps, the levitation state
//! machine, enemy clusters and combos, driven by `game::GameSession`.

pub mod config;
pub mod game;
pub mod logging;
