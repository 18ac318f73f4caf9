//! ECS components shared by several subsystems.
//!
//! The simulation is planar: positions live in `Transform::translation.xy()`,
//! `z` is left untouched.

pub mod actor;
pub mod movement;

pub use actor::*;
pub use movement::*;
