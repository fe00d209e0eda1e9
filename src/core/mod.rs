//! Geometry primitives shared by the planner, the mission controller and the simulator.
//!
//! Arena coordinates are continuous (`f32`, arena units as reported by the overhead
//! camera). Grid coordinates are integer cell indices of a planning grid.

mod math;
mod point;
mod pose;

pub use math::normalize_angle;
pub use point::{GridCoord, WorldPoint};
pub use pose::{Pose2D, Velocity2D};
