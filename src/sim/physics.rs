//! Differential-drive kinematics for the simulated robot.
//!
//! Wheel speeds are in arena units per second. The actuator saturates: when
//! either wheel exceeds the limit both are scaled by the same factor, which
//! keeps the commanded turning ratio.

use crate::core::{Pose2D, Velocity2D, normalize_angle};

/// Simulated robot body
#[derive(Clone, Debug)]
pub struct DiffDriveBody {
    pose: Pose2D,
    velocity: Velocity2D,
    wheel_base: f32,
    max_wheel_speed: f32,
    /// Reachable area, (width, height)
    bounds: (f32, f32),
}

impl DiffDriveBody {
    pub fn new(pose: Pose2D, wheel_base: f32, max_wheel_speed: f32, bounds: (f32, f32)) -> Self {
        Self {
            pose,
            velocity: Velocity2D::default(),
            wheel_base,
            max_wheel_speed,
            bounds,
        }
    }

    #[inline]
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    #[inline]
    pub fn velocity(&self) -> Velocity2D {
        self.velocity
    }

    /// Apply wheel speeds, saturated to the actuator limit.
    pub fn set_wheel_speeds(&mut self, left: f32, right: f32) {
        let (left, right) = self.desaturate(left, right);
        self.velocity = Velocity2D {
            linear: (left + right) / 2.0,
            angular: (right - left) / self.wheel_base,
        };
    }

    pub fn stop(&mut self) {
        self.velocity = Velocity2D::default();
    }

    fn desaturate(&self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        if peak <= self.max_wheel_speed || peak == 0.0 {
            return (left, right);
        }
        let scale = self.max_wheel_speed / peak;
        (left * scale, right * scale)
    }

    /// Advance the pose by `dt` seconds at the current velocity.
    pub fn update(&mut self, dt: f32) {
        let Velocity2D { linear, angular } = self.velocity;
        let theta = self.pose.theta;

        let (x, y, new_theta) = if angular.abs() < 1e-6 {
            // Straight line motion
            (
                self.pose.x + linear * theta.cos() * dt,
                self.pose.y + linear * theta.sin() * dt,
                theta,
            )
        } else {
            // Arc motion
            let r = linear / angular;
            let new_theta = theta + angular * dt;
            (
                self.pose.x + r * (new_theta.sin() - theta.sin()),
                self.pose.y + r * (theta.cos() - new_theta.cos()),
                new_theta,
            )
        };

        // Arena walls
        self.pose = Pose2D {
            x: x.clamp(0.0, self.bounds.0),
            y: y.clamp(0.0, self.bounds.1),
            theta: normalize_angle(new_theta),
        };
    }
}
