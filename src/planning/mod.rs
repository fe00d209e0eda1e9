//! Grid-based path planning.
//!
//! This module provides:
//! - A planning grid rebuilt per request, with obstacle inflation
//! - A best-first (A*) planner over a square neighbourhood window
//! - A waypoint stack consumed one waypoint per navigation request

mod grid;
mod planner;

pub use grid::{Cell, CellState, PlanningGrid};
pub use planner::{GridPlanner, PlannerConfig, Waypoints};
