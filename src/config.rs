//! Configuration loading for MadhuNav

use crate::control::PidGains;
use crate::core::WorldPoint;
use crate::error::{MadhuError, Result};
use crate::mission::{ControllerConfig, Tolerances};
use crate::planning::PlannerConfig;
use crate::world::{GoalZone, Hive, HiveKind, Team};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MadhuConfig {
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub planner: PlannerSection,
    #[serde(default)]
    pub pid: PidConfig,
    #[serde(default)]
    pub tolerance: Tolerances,
    #[serde(default)]
    pub mission: MissionConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

/// Arena extent in millimeters
#[derive(Clone, Debug, Deserialize)]
pub struct ArenaConfig {
    #[serde(default = "default_arena_width")]
    pub width: f32,
    #[serde(default = "default_arena_height")]
    pub height: f32,
}

/// Robot identity and footprint
#[derive(Clone, Debug, Deserialize)]
pub struct RobotConfig {
    /// Marker id reported by the vision system
    #[serde(default = "default_robot_id")]
    pub id: u32,

    /// Half of the chassis width (mm)
    #[serde(default = "default_half_width")]
    pub half_width: f32,
}

/// Grid planner settings
#[derive(Clone, Debug, Deserialize)]
pub struct PlannerSection {
    /// Route legs around other hives (default: false, direct approach)
    #[serde(default)]
    pub enabled: bool,

    /// Grid cell edge (mm)
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,

    /// Cells blocked around each obstacle
    #[serde(default = "default_inflation_radius")]
    pub inflation_radius: i32,

    /// Expansion window radius in cells
    #[serde(default = "default_neighbor_radius")]
    pub neighbor_radius: i32,
}

/// Gains per control axis
#[derive(Clone, Debug, Deserialize)]
pub struct PidConfig {
    #[serde(default = "default_turn_gains")]
    pub turn: PidGains,
    #[serde(default = "default_straight_gains")]
    pub straight: PidGains,
    /// Steering correction while driving
    #[serde(default = "default_steer_gains")]
    pub steer: Option<PidGains>,
}

/// Mission sequencing settings
#[derive(Clone, Debug, Deserialize)]
pub struct MissionConfig {
    /// Seconds allowed inside NEAR before realigning
    #[serde(default = "default_near_target_timeout")]
    pub near_target_timeout: f32,

    /// Control period (seconds)
    #[serde(default = "default_cycle_delay")]
    pub cycle_delay: f32,

    #[serde(default = "default_delivery_offset_x")]
    pub delivery_offset_x: f32,

    #[serde(default = "default_delivery_offset_y")]
    pub delivery_offset_y: f32,

    #[serde(default = "default_max_transitions")]
    pub max_transitions_per_cycle: usize,
}

/// Headless simulator settings
#[derive(Clone, Debug, Deserialize)]
pub struct SimConfig {
    /// Noise seed, 0 for entropy
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Wheel speed saturation (mm/s)
    #[serde(default = "default_max_wheel_speed")]
    pub max_wheel_speed: f32,

    /// Distance between wheels (mm)
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f32,

    /// Std dev of reported position (mm)
    #[serde(default)]
    pub position_noise: f32,

    /// Std dev of reported heading (rad)
    #[serde(default)]
    pub heading_noise: f32,

    /// Probability a sample is unavailable
    #[serde(default)]
    pub dropout_probability: f32,

    /// Match length (seconds)
    #[serde(default = "default_match_duration")]
    pub match_duration: f32,

    /// Gripper reach when stopped next to a hive (mm)
    #[serde(default = "default_collect_radius")]
    pub collect_radius: f32,

    /// Drop-off reach around a delivery point (mm)
    #[serde(default = "default_deliver_radius")]
    pub deliver_radius: f32,

    #[serde(default = "default_start_x")]
    pub start_x: f32,
    #[serde(default = "default_start_y")]
    pub start_y: f32,
    #[serde(default)]
    pub start_theta: f32,

    #[serde(default = "default_hives")]
    pub hives: Vec<Hive>,

    #[serde(default = "default_teams")]
    pub teams: [Team; 2],
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: default_arena_width(),
            height: default_arena_height(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            id: default_robot_id(),
            half_width: default_half_width(),
        }
    }
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_size: default_cell_size(),
            inflation_radius: default_inflation_radius(),
            neighbor_radius: default_neighbor_radius(),
        }
    }
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            turn: default_turn_gains(),
            straight: default_straight_gains(),
            steer: default_steer_gains(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            near_target_timeout: default_near_target_timeout(),
            cycle_delay: default_cycle_delay(),
            delivery_offset_x: default_delivery_offset_x(),
            delivery_offset_y: default_delivery_offset_y(),
            max_transitions_per_cycle: default_max_transitions(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_wheel_speed: default_max_wheel_speed(),
            wheel_base: default_wheel_base(),
            position_noise: 0.0,
            heading_noise: 0.0,
            dropout_probability: 0.0,
            match_duration: default_match_duration(),
            collect_radius: default_collect_radius(),
            deliver_radius: default_deliver_radius(),
            start_x: default_start_x(),
            start_y: default_start_y(),
            start_theta: 0.0,
            hives: default_hives(),
            teams: default_teams(),
        }
    }
}

// Default value functions
fn default_arena_width() -> f32 {
    3500.0
}
fn default_arena_height() -> f32 {
    2000.0
}
fn default_robot_id() -> u32 {
    1
}
fn default_half_width() -> f32 {
    90.0
}
fn default_cell_size() -> f32 {
    250.0
}
fn default_inflation_radius() -> i32 {
    1
}
fn default_neighbor_radius() -> i32 {
    2
}

// PID defaults
fn default_turn_gains() -> PidGains {
    PidGains {
        kp: 300.0,
        ki: 5.0,
        kd: 2.0,
        integral_limit: 1.0,
    }
}
fn default_straight_gains() -> PidGains {
    PidGains {
        kp: 1.5,
        ki: 0.02,
        kd: 0.02,
        integral_limit: 200.0,
    }
}
fn default_steer_gains() -> Option<PidGains> {
    Some(PidGains::proportional(250.0))
}

// Mission defaults
fn default_near_target_timeout() -> f32 {
    2.0
}
fn default_cycle_delay() -> f32 {
    0.05
}
fn default_delivery_offset_x() -> f32 {
    270.0
}
fn default_delivery_offset_y() -> f32 {
    -515.0
}
fn default_max_transitions() -> usize {
    6
}

// Simulator defaults
fn default_seed() -> u64 {
    42
}
fn default_max_wheel_speed() -> f32 {
    400.0
}
fn default_wheel_base() -> f32 {
    150.0
}
fn default_match_duration() -> f32 {
    300.0
}
fn default_collect_radius() -> f32 {
    120.0
}
fn default_deliver_radius() -> f32 {
    150.0
}
fn default_start_x() -> f32 {
    300.0
}
fn default_start_y() -> f32 {
    300.0
}
fn default_hives() -> Vec<Hive> {
    let hive = |id, x, y, kind| Hive {
        id,
        position: WorldPoint::new(x, y),
        kind,
    };
    vec![
        hive(1, 1000.0, 700.0, HiveKind::Healthy),
        hive(2, 1800.0, 1000.0, HiveKind::Healthy),
        hive(3, 2600.0, 500.0, HiveKind::Healthy),
        hive(4, 700.0, 1200.0, HiveKind::Diseased),
        hive(5, 2000.0, 300.0, HiveKind::Diseased),
    ]
}
fn default_teams() -> [Team; 2] {
    [
        Team {
            id: 1,
            zone: GoalZone::new(WorldPoint::new(500.0, 1500.0), WorldPoint::new(1100.0, 2000.0)),
        },
        Team {
            id: 2,
            zone: GoalZone::new(
                WorldPoint::new(2400.0, 1500.0),
                WorldPoint::new(3000.0, 2000.0),
            ),
        },
    ]
}

impl MadhuConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MadhuError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MadhuConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MadhuError::Config(msg));

        if self.arena.width <= 0.0 || self.arena.height <= 0.0 {
            return invalid(format!(
                "arena must have a positive extent, got {}x{}",
                self.arena.width, self.arena.height
            ));
        }
        if self.planner.cell_size <= 0.0 {
            return invalid(format!(
                "planner.cell_size must be positive, got {}",
                self.planner.cell_size
            ));
        }
        if self.planner.neighbor_radius < 1 {
            return invalid(format!(
                "planner.neighbor_radius must be at least 1, got {}",
                self.planner.neighbor_radius
            ));
        }
        let clearance = self.planner.inflation_radius as f32 * self.planner.cell_size;
        if clearance <= self.robot.half_width {
            return invalid(format!(
                "obstacle inflation ({} mm) must exceed robot.half_width ({} mm)",
                clearance, self.robot.half_width
            ));
        }
        if self.mission.cycle_delay <= 0.0 {
            return invalid(format!(
                "mission.cycle_delay must be positive, got {}",
                self.mission.cycle_delay
            ));
        }
        if self.mission.near_target_timeout < 0.0 {
            return invalid("mission.near_target_timeout must not be negative".to_string());
        }
        if self.mission.max_transitions_per_cycle == 0 {
            return invalid("mission.max_transitions_per_cycle must be at least 1".to_string());
        }

        let tol = &self.tolerance;
        if [tol.eps_distance, tol.eps_heading, tol.hist_hold]
            .iter()
            .any(|v| *v < 0.0)
        {
            return invalid("tolerances must not be negative".to_string());
        }
        if tol.near_distance < tol.hist_distance {
            return invalid(format!(
                "tolerance.near_distance ({}) must not be below hist_distance ({})",
                tol.near_distance, tol.hist_distance
            ));
        }
        if tol.hist_release_distance < tol.hist_distance {
            return invalid(format!(
                "tolerance.hist_release_distance ({}) must not be below hist_distance ({})",
                tol.hist_release_distance, tol.hist_distance
            ));
        }

        let axes = [
            ("turn", Some(&self.pid.turn)),
            ("straight", Some(&self.pid.straight)),
            ("steer", self.pid.steer.as_ref()),
        ];
        for (name, gains) in axes {
            if let Some(g) = gains
                && [g.kp, g.ki, g.kd, g.integral_limit].iter().any(|v| *v < 0.0)
            {
                return invalid(format!("pid.{} gains must not be negative", name));
            }
        }

        if self.sim.max_wheel_speed <= 0.0 || self.sim.wheel_base <= 0.0 {
            return invalid("sim.max_wheel_speed and sim.wheel_base must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.sim.dropout_probability) {
            return invalid(format!(
                "sim.dropout_probability must be within [0, 1], got {}",
                self.sim.dropout_probability
            ));
        }

        Ok(())
    }

    /// Planner settings for the configured arena
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            arena_width: self.arena.width,
            arena_height: self.arena.height,
            cell_size: self.planner.cell_size,
            inflation_radius: self.planner.inflation_radius,
            neighbor_radius: self.planner.neighbor_radius,
        }
    }

    /// Mission controller settings
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            tolerances: self.tolerance,
            turn: self.pid.turn,
            straight: self.pid.straight,
            steer: self.pid.steer,
            near_target_timeout: self.mission.near_target_timeout,
            delivery_offset: WorldPoint::new(
                self.mission.delivery_offset_x,
                self.mission.delivery_offset_y,
            ),
            max_transitions_per_cycle: self.mission.max_transitions_per_cycle,
            planner: self.planner.enabled.then(|| self.planner_config()),
        }
    }
}
