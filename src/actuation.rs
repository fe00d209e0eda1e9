//! Motor command output.
//!
//! Commands carry raw controller output. Saturation to the motors' range is the
//! sink's job.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One actuation request per control cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotorCommand {
    /// Signed wheel speeds
    Drive { left: f32, right: f32 },
    /// Brake both wheels
    Stop,
}

impl MotorCommand {
    /// Mix a forward speed and a CCW turn correction into wheel speeds.
    pub fn forward_with_turn(forward: f32, turn: f32) -> Self {
        MotorCommand::Drive {
            left: forward - turn,
            right: forward + turn,
        }
    }

    /// Rotate in place; positive `turn` is CCW.
    pub fn rotate(turn: f32) -> Self {
        Self::forward_with_turn(0.0, turn)
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, MotorCommand::Stop)
    }

    /// Wheel speeds, zero for `Stop`.
    pub fn wheel_speeds(&self) -> (f32, f32) {
        match *self {
            MotorCommand::Drive { left, right } => (left, right),
            MotorCommand::Stop => (0.0, 0.0),
        }
    }
}

/// Accepts motor commands.
pub trait ActuationSink {
    fn apply(&mut self, command: MotorCommand) -> Result<()>;
}

/// Recording sink.
impl ActuationSink for Vec<MotorCommand> {
    fn apply(&mut self, command: MotorCommand) -> Result<()> {
        self.push(command);
        Ok(())
    }
}
