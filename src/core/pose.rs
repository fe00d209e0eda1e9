//! Robot pose as reported by the overhead vision system.

use serde::{Deserialize, Serialize};

use super::math::normalize_angle;
use super::point::WorldPoint;

/// Position and heading in arena coordinates.
///
/// Theta is the heading in radians, CCW positive from the +X axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose; theta is normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Position part of the pose.
    #[inline]
    pub fn position(&self) -> WorldPoint {
        WorldPoint::new(self.x, self.y)
    }

    /// Straight-line distance to a target point.
    #[inline]
    pub fn distance_to(&self, target: WorldPoint) -> f32 {
        self.position().distance(&target)
    }

    /// Signed heading error towards a target, in [-π, π].
    ///
    /// Positive means the target lies to the left (CCW turn needed).
    #[inline]
    pub fn heading_error_to(&self, target: WorldPoint) -> f32 {
        normalize_angle(self.position().angle_to(&target) - self.theta)
    }
}

/// Forward and angular velocity of a differential drive robot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity2D {
    /// Forward speed (arena units per second)
    pub linear: f32,
    /// Turn rate (rad/s, CCW positive)
    pub angular: f32,
}
