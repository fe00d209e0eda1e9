//! PID regulator driving a signed error towards zero.
//!
//! The setpoint is fixed at zero: callers pass the error itself (heading error,
//! remaining distance) as the regulated quantity. The integral accumulator is
//! clamped for anti-windup; the output is not saturated here, actuator limits are
//! applied downstream.

use serde::Deserialize;

/// Gains and integral limit for one control axis.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    #[serde(default)]
    pub ki: f32,
    #[serde(default)]
    pub kd: f32,
    /// Bound on the accumulated integral, applied symmetrically
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f32,
}

fn default_integral_limit() -> f32 {
    100.0
}

impl PidGains {
    /// Proportional-only gains.
    pub fn proportional(kp: f32) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
            integral_limit: default_integral_limit(),
        }
    }
}

/// Stateful single-axis PID controller.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: PidGains,
    integral: f32,
    previous_error: f32,
    output: f32,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            previous_error: 0.0,
            output: 0.0,
        }
    }

    /// Compute the correction for `error` after `dt` seconds.
    ///
    /// `dt` must be strictly positive.
    pub fn update(&mut self, error: f32, dt: f32) -> f32 {
        debug_assert!(dt > 0.0, "PID update requires dt > 0, got {}", dt);

        let limit = self.gains.integral_limit.abs();
        self.integral = (self.integral + error * dt).clamp(-limit, limit);

        let proportional = self.gains.kp * error;
        let integral = self.gains.ki * self.integral;
        let derivative = self.gains.kd * (error - self.previous_error) / dt;
        self.previous_error = error;

        self.output = proportional + integral + derivative;
        self.output
    }

    /// Drop integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.output = 0.0;
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Accumulated (clamped) integral.
    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }

    /// Output of the last `update` call.
    pub fn output(&self) -> f32 {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_proportional_only_is_constant() {
        let mut pid = PidController::new(PidGains::proportional(2.5));
        for _ in 0..50 {
            assert_relative_eq!(pid.update(4.0, 0.05), 10.0);
        }
    }

    #[test]
    fn test_integral_is_clamped() {
        let gains = PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
            integral_limit: 2.0,
        };
        let mut pid = PidController::new(gains);

        // 10 * 0.1 per cycle, raw integral would reach 100
        let mut last = 0.0;
        for _ in 0..100 {
            last = pid.update(10.0, 0.1);
        }
        assert_relative_eq!(pid.integral(), 2.0);
        assert_relative_eq!(last, 2.0);

        for _ in 0..10 {
            assert_relative_eq!(pid.update(10.0, 0.1), last);
        }
    }

    #[test]
    fn test_negative_windup_clamped() {
        let gains = PidGains {
            kp: 0.0,
            ki: 0.5,
            kd: 0.0,
            integral_limit: 1.0,
        };
        let mut pid = PidController::new(gains);
        for _ in 0..100 {
            pid.update(-5.0, 0.1);
        }
        assert_relative_eq!(pid.integral(), -1.0);
        assert_relative_eq!(pid.output(), -0.5);
    }

    #[test]
    fn test_derivative_uses_previous_error() {
        let gains = PidGains {
            kp: 0.0,
            ki: 0.0,
            kd: 1.0,
            integral_limit: 10.0,
        };
        let mut pid = PidController::new(gains);
        assert_relative_eq!(pid.update(1.0, 0.5), 2.0);
        assert_relative_eq!(pid.update(2.0, 0.5), 2.0);
        assert_relative_eq!(pid.update(2.0, 0.5), 0.0);
    }

    #[test]
    fn test_reset_clears_history() {
        let gains = PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 1.0,
            integral_limit: 10.0,
        };
        let mut pid = PidController::new(gains);
        for _ in 0..5 {
            pid.update(3.0, 0.1);
        }
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.previous_error(), 0.0);

        // Derivative behaves as if there were no prior session: (0.5 - 0) / 0.1
        let out = pid.update(0.5, 0.1);
        assert_relative_eq!(out, 0.05 + 5.0, epsilon = 1e-5);
    }
}
