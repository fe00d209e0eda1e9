//! # Madhu-Nav: Navigation and Control Core for a Hive-Collection Robot
//!
//! Drives a differential-drive robot around a bounded arena using pose samples
//! from an overhead camera. The robot collects healthy hives for its own goal
//! zone and diseased hives for the opponent's.
//!
//! ## Architecture
//!
//! - [`control`]: PID regulator with integral anti-windup
//! - [`planning`]: grid discretization and best-first route search around hives
//! - [`mission`]: finite-state mission controller sequencing acquire, turn,
//!   drive and deliver legs
//! - [`runner`]: cooperative control loop with stop flag and fault skipping
//! - [`sim`]: headless kinematic simulator standing in for camera and motors
//! - [`world`] / [`actuation`]: interfaces to the vision system and motor driver
//!
//! ## Coordinate Frame
//!
//! Arena coordinates in millimeters, origin at the bottom-left corner, X to the
//! right, Y up. Headings are radians, counter-clockwise positive from +X.

pub mod actuation;
pub mod config;
pub mod control;
pub mod core;
pub mod error;
pub mod mission;
pub mod planning;
pub mod runner;
pub mod sim;
pub mod world;

pub use actuation::{ActuationSink, MotorCommand};
pub use config::MadhuConfig;
pub use error::{MadhuError, Result};
pub use mission::{ControllerConfig, CycleReport, MissionController, MissionEvent, MissionState};
pub use planning::{GridPlanner, PlannerConfig, Waypoints};
pub use runner::{ControlLoop, CycleOutcome};
pub use world::{WorldSnapshot, WorldSource};
