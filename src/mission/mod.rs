//! Mission sequencing: acquire a hive, turn, drive, deliver, repeat.

mod controller;
mod state;
mod tolerance;

pub use controller::{ControllerConfig, CycleReport, MissionController, MissionEvent};
pub use state::{EnterAction, Leg, MissionState, Transition};
pub use tolerance::{ArrivalTracker, Tolerances};
