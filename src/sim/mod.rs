//! Headless arena simulator.
//!
//! Stands in for the overhead camera and the motor driver so the control loop
//! can run without hardware. A [`Simulator`] hands out two views of one shared
//! state: [`SimWorld`] (a [`WorldSource`]) and [`SimMotors`] (an
//! [`ActuationSink`]). Every sample advances the simulation by one control
//! period at the last commanded wheel speeds.
//!
//! The robot picks up a hive when it is stopped within `collect_radius` of one
//! and drops what it carries when stopped within `deliver_radius` of a goal
//! zone's delivery point.

mod noise;
mod physics;

pub use noise::CameraModel;
pub use physics::DiffDriveBody;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::actuation::{ActuationSink, MotorCommand};
use crate::config::{MadhuConfig, SimConfig};
use crate::core::{Pose2D, WorldPoint};
use crate::error::{MadhuError, Result};
use crate::world::{Hive, RobotState, TeamSides, WorldSnapshot, WorldSource};

/// Goal zone a hive was dropped in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneSide {
    Home,
    Opponent,
}

/// A hive dropped at a delivery point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Delivery {
    pub hive: Hive,
    pub zone: ZoneSide,
    /// Simulation time of the drop (seconds)
    pub time: f32,
}

struct SimState {
    config: SimConfig,
    sides: TeamSides,
    delivery_points: [(ZoneSide, WorldPoint); 2],
    dt: f32,
    body: DiffDriveBody,
    camera: CameraModel,
    hives: Vec<Hive>,
    carrying: Option<Hive>,
    deliveries: Vec<Delivery>,
    clock: f32,
    stopped: bool,
    disabled: bool,
}

impl SimState {
    fn advance(&mut self) {
        self.body.update(self.dt);
        self.clock += self.dt;
        if self.stopped {
            self.handle_gripper();
        }
    }

    fn handle_gripper(&mut self) {
        let position = self.body.pose().position();

        if let Some(hive) = self.carrying {
            let drop_zone = self
                .delivery_points
                .iter()
                .find(|(_, point)| point.distance(&position) <= self.config.deliver_radius);
            if let Some(&(zone, _)) = drop_zone {
                info!(
                    "Delivered {:?} hive {} to {:?} zone at t={:.1}s",
                    hive.kind, hive.id, zone, self.clock
                );
                self.deliveries.push(Delivery {
                    hive,
                    zone,
                    time: self.clock,
                });
                self.carrying = None;
            }
            return;
        }

        let reachable = self
            .hives
            .iter()
            .enumerate()
            .map(|(i, hive)| (i, hive.position.distance(&position)))
            .filter(|(_, d)| *d <= self.config.collect_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((index, distance)) = reachable {
            let hive = self.hives.remove(index);
            debug!("Picked up hive {} from {:.0} away", hive.id, distance);
            self.carrying = Some(hive);
        }
    }

    fn snapshot(&mut self) -> WorldSnapshot {
        let observed = self.camera.observe(self.body.pose());

        WorldSnapshot {
            robot: RobotState {
                pose: observed,
                velocity: self.body.velocity(),
            },
            robot_visible: true,
            match_active: self.clock < self.config.match_duration,
            robot_disabled: self.disabled,
            hives: self.hives.clone(),
            sides: self.sides,
        }
    }
}

/// Owner of the simulated arena.
pub struct Simulator {
    state: Arc<Mutex<SimState>>,
}

impl Simulator {
    /// Build the arena described by `config`.
    ///
    /// Fails with [`MadhuError::NotCompeting`] when the robot id is not one of
    /// the configured teams.
    pub fn new(config: &MadhuConfig) -> Result<Self> {
        let sim = config.sim.clone();
        let sides = TeamSides::resolve(&sim.teams, config.robot.id)?;
        let offset = WorldPoint::new(
            config.mission.delivery_offset_x,
            config.mission.delivery_offset_y,
        );
        let start = Pose2D::new(sim.start_x, sim.start_y, sim.start_theta);

        info!(
            "Simulated arena {}x{}, {} hives, robot {} at ({:.0}, {:.0})",
            config.arena.width,
            config.arena.height,
            sim.hives.len(),
            config.robot.id,
            start.x,
            start.y
        );

        let state = SimState {
            delivery_points: [
                (ZoneSide::Home, sides.home.delivery_point(offset)),
                (ZoneSide::Opponent, sides.opponent.delivery_point(offset)),
            ],
            sides,
            dt: config.mission.cycle_delay,
            body: DiffDriveBody::new(
                start,
                sim.wheel_base,
                sim.max_wheel_speed,
                (config.arena.width, config.arena.height),
            ),
            camera: CameraModel::new(&sim),
            hives: sim.hives.clone(),
            carrying: None,
            deliveries: Vec::new(),
            clock: 0.0,
            stopped: true,
            disabled: false,
            config: sim,
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Camera view of the arena.
    pub fn world(&self) -> SimWorld {
        SimWorld {
            state: Arc::clone(&self.state),
        }
    }

    /// Motor driver of the simulated robot.
    pub fn motors(&self) -> SimMotors {
        SimMotors {
            state: Arc::clone(&self.state),
        }
    }

    /// Referee disable; reported in every following sample.
    pub fn disable(&self) {
        self.state.lock().disabled = true;
    }

    /// True pose, without sensor noise.
    pub fn pose(&self) -> Pose2D {
        self.state.lock().body.pose()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.state.lock().deliveries.clone()
    }

    /// Hives still lying on the field.
    pub fn remaining_hives(&self) -> Vec<Hive> {
        self.state.lock().hives.clone()
    }

    pub fn carrying(&self) -> Option<Hive> {
        self.state.lock().carrying
    }

    /// Simulation time in seconds.
    pub fn clock(&self) -> f32 {
        self.state.lock().clock
    }
}

/// [`WorldSource`] half of the simulator.
pub struct SimWorld {
    state: Arc<Mutex<SimState>>,
}

impl WorldSource for SimWorld {
    fn sample(&mut self) -> Result<WorldSnapshot> {
        let mut state = self.state.lock();
        state.advance();

        if state.camera.frame_dropped() {
            return Err(MadhuError::Snapshot(format!(
                "simulated frame drop at t={:.2}s",
                state.clock
            )));
        }

        Ok(state.snapshot())
    }
}

/// [`ActuationSink`] half of the simulator.
pub struct SimMotors {
    state: Arc<Mutex<SimState>>,
}

impl ActuationSink for SimMotors {
    fn apply(&mut self, command: MotorCommand) -> Result<()> {
        let mut state = self.state.lock();
        match command {
            MotorCommand::Drive { left, right } => {
                state.body.set_wheel_speeds(left, right);
                state.stopped = false;
            }
            MotorCommand::Stop => {
                state.body.stop();
                state.stopped = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::HiveKind;

    fn config_with(hives: Vec<Hive>) -> MadhuConfig {
        let mut config = MadhuConfig::default();
        config.sim.hives = hives;
        config
    }

    #[test]
    fn test_unknown_robot_is_rejected() {
        let mut config = MadhuConfig::default();
        config.robot.id = 99;
        assert!(matches!(
            Simulator::new(&config),
            Err(MadhuError::NotCompeting(99))
        ));
    }

    #[test]
    fn test_sample_advances_clock_and_pose() {
        let sim = Simulator::new(&MadhuConfig::default()).unwrap();
        let mut world = sim.world();
        let mut motors = sim.motors();

        motors.apply(MotorCommand::forward_with_turn(200.0, 0.0)).unwrap();
        let snapshot = world.sample().unwrap();

        assert!((sim.clock() - 0.05).abs() < 1e-6);
        assert!((snapshot.robot.pose.x - 310.0).abs() < 1e-3);
        assert!(snapshot.match_active);
        assert_eq!(snapshot.sides.home.max, WorldPoint::new(1100.0, 2000.0));
    }

    #[test]
    fn test_stopped_robot_collects_then_delivers() {
        let hive = Hive {
            id: 1,
            position: WorldPoint::new(350.0, 300.0),
            kind: HiveKind::Healthy,
        };
        let sim = Simulator::new(&config_with(vec![hive])).unwrap();
        let mut world = sim.world();

        let snapshot = world.sample().unwrap();
        assert!(snapshot.hives.is_empty());
        assert_eq!(sim.carrying(), Some(hive));

        // Teleport next to the home delivery point
        sim.state.lock().body =
            DiffDriveBody::new(Pose2D::new(1370.0, 1450.0, 0.0), 150.0, 400.0, (3500.0, 2000.0));
        world.sample().unwrap();

        let deliveries = sim.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].zone, ZoneSide::Home);
        assert_eq!(sim.carrying(), None);
    }

    #[test]
    fn test_moving_robot_does_not_collect() {
        let hive = Hive {
            id: 1,
            position: WorldPoint::new(350.0, 300.0),
            kind: HiveKind::Diseased,
        };
        let sim = Simulator::new(&config_with(vec![hive])).unwrap();
        let mut motors = sim.motors();
        motors.apply(MotorCommand::rotate(10.0)).unwrap();

        let snapshot = sim.world().sample().unwrap();
        assert_eq!(snapshot.hives.len(), 1);
        assert_eq!(sim.carrying(), None);
    }

    #[test]
    fn test_dropout_is_transient() {
        let mut config = MadhuConfig::default();
        config.sim.dropout_probability = 1.0;
        let sim = Simulator::new(&config).unwrap();

        let err = sim.world().sample().unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_disable_is_reported() {
        let sim = Simulator::new(&MadhuConfig::default()).unwrap();
        sim.disable();
        assert!(sim.world().sample().unwrap().robot_disabled);
    }
}
