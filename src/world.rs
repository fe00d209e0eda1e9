//! World model snapshot supplied by the overhead vision system.
//!
//! The core only reads snapshots. Transport and parsing belong to the
//! `WorldSource` implementation.

use serde::{Deserialize, Serialize};

use crate::core::{Pose2D, Velocity2D, WorldPoint};
use crate::error::{MadhuError, Result};

/// Hive classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiveKind {
    /// Acquirable now, delivered to the home zone
    Healthy,
    /// Acquirable later, delivered to the opponent zone
    Diseased,
}

/// A target object on the field.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hive {
    pub id: u32,
    pub position: WorldPoint,
    pub kind: HiveKind,
}

/// Rectangular goal zone, axis aligned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalZone {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl GoalZone {
    pub fn new(min: WorldPoint, max: WorldPoint) -> Self {
        Self { min, max }
    }

    /// Corner with the largest X and Y.
    pub fn top_right(&self) -> WorldPoint {
        self.max
    }

    /// Delivery point: the top-right corner shifted by `offset`.
    pub fn delivery_point(&self, offset: WorldPoint) -> WorldPoint {
        self.top_right() + offset
    }

    pub fn contains(&self, point: WorldPoint) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// A competing team and its goal zone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub zone: GoalZone,
}

/// Goal zones seen from this robot's side.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamSides {
    pub home: GoalZone,
    pub opponent: GoalZone,
}

impl TeamSides {
    /// Pick home and opponent zones for `robot_id` out of the two registered teams.
    pub fn resolve(teams: &[Team; 2], robot_id: u32) -> Result<Self> {
        let [first, second] = teams;
        if first.id == robot_id {
            Ok(Self {
                home: first.zone,
                opponent: second.zone,
            })
        } else if second.id == robot_id {
            Ok(Self {
                home: second.zone,
                opponent: first.zone,
            })
        } else {
            Err(MadhuError::NotCompeting(robot_id))
        }
    }
}

/// Robot pose and motion as observed by the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub pose: Pose2D,
    #[serde(default)]
    pub velocity: Velocity2D,
}

/// One world-state sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub robot: RobotState,
    /// Robot marker visible to the camera
    pub robot_visible: bool,
    /// Match clock running
    pub match_active: bool,
    /// Referee has disabled the robot
    #[serde(default)]
    pub robot_disabled: bool,
    pub hives: Vec<Hive>,
    pub sides: TeamSides,
}

impl WorldSnapshot {
    /// Nearest hive of `kind` to `from`. Ties go to the lower id.
    pub fn nearest_hive(&self, kind: HiveKind, from: WorldPoint) -> Option<&Hive> {
        self.hives
            .iter()
            .filter(|hive| hive.kind == kind)
            .min_by(|a, b| {
                a.position
                    .distance(&from)
                    .total_cmp(&b.position.distance(&from))
                    .then_with(|| a.id.cmp(&b.id))
            })
    }

    /// Positions of every hive except `exclude`, used as planning obstacles.
    pub fn obstacles_except(&self, exclude: Option<u32>) -> Vec<WorldPoint> {
        self.hives
            .iter()
            .filter(|hive| Some(hive.id) != exclude)
            .map(|hive| hive.position)
            .collect()
    }
}

/// Polled once per control cycle.
pub trait WorldSource {
    /// Fetch the latest snapshot. `MadhuError::Snapshot` marks a transient fault.
    fn sample(&mut self) -> Result<WorldSnapshot>;
}
