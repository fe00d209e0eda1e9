//! Mission controller.
//!
//! Owns the three PID axes (turn in place, forward speed, steering while
//! driving), the current mission state and the near-target safety countdown.
//! Each call to [`MissionController::step`] handles one control cycle: states
//! that only select a target chain straight into the next state, and the cycle
//! ends as soon as a state emits a motor command.

use tracing::{debug, info, warn};

use crate::actuation::MotorCommand;
use crate::control::{PidController, PidGains};
use crate::core::WorldPoint;
use crate::planning::{GridPlanner, PlannerConfig, Waypoints};
use crate::world::{HiveKind, WorldSnapshot};

use super::state::{EnterAction, Leg, MissionState, Transition};
use super::tolerance::{ArrivalTracker, Tolerances};

/// Configuration for the mission controller.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub tolerances: Tolerances,
    /// Turn-in-place axis, fed the heading error
    pub turn: PidGains,
    /// Forward speed axis, fed the along-track distance
    pub straight: PidGains,
    /// Steering correction while driving, fed the heading error
    pub steer: Option<PidGains>,
    /// Seconds allowed inside NEAR before falling back to realignment
    pub near_target_timeout: f32,
    /// Delivery point offset from a goal zone's top-right corner
    pub delivery_offset: WorldPoint,
    /// Upper bound on state changes within one cycle
    pub max_transitions_per_cycle: usize,
    /// Route legs through the grid planner when set
    pub planner: Option<PlannerConfig>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            turn: PidGains {
                kp: 300.0,
                ki: 5.0,
                kd: 2.0,
                integral_limit: 1.0,
            },
            straight: PidGains {
                kp: 1.5,
                ki: 0.02,
                kd: 0.02,
                integral_limit: 200.0,
            },
            steer: Some(PidGains::proportional(250.0)),
            near_target_timeout: 2.0,
            delivery_offset: WorldPoint::new(270.0, -515.0),
            max_transitions_per_cycle: 6,
            planner: None,
        }
    }
}

/// Something worth reporting that happened during a cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum MissionEvent {
    Transition {
        from: MissionState,
        to: MissionState,
    },
    /// A leg started towards `target`
    TargetSelected { leg: Leg, target: WorldPoint },
    /// No hive of this kind is left on the field
    NoEligibleTarget(HiveKind),
    /// The planner found no route; the leg approaches directly
    Unreachable { target: WorldPoint },
    /// Intermediate waypoint reached
    RouteAdvanced { remaining: usize },
    /// Near-target countdown expired before arrival
    Stalled { target: WorldPoint },
    Disabled(String),
    /// Too many state changes in one cycle, motors stopped
    TransitionLimit,
}

/// What one cycle did.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    /// State at cycle start followed by every state entered, in order
    pub states: Vec<MissionState>,
    pub command: MotorCommand,
    pub events: Vec<MissionEvent>,
}

impl CycleReport {
    fn new(start: MissionState) -> Self {
        Self {
            states: vec![start],
            command: MotorCommand::Stop,
            events: Vec::new(),
        }
    }

    /// State the controller is in after the cycle.
    pub fn final_state(&self) -> MissionState {
        // states always holds the starting state
        self.states[self.states.len() - 1]
    }

    pub fn transitioned(&self) -> bool {
        self.states.len() > 1
    }
}

/// Result of handling the current state once.
struct Step {
    command: Option<MotorCommand>,
    transition: Option<Transition>,
}

impl Step {
    fn emit(command: MotorCommand) -> Self {
        Self {
            command: Some(command),
            transition: None,
        }
    }

    fn go(next: MissionState) -> Self {
        Self {
            command: None,
            transition: Some(Transition::to(next)),
        }
    }

    fn emit_and_go(command: MotorCommand, next: MissionState) -> Self {
        Self {
            command: Some(command),
            transition: Some(Transition::to(next)),
        }
    }
}

/// Finite-state mission controller.
pub struct MissionController {
    config: ControllerConfig,
    state: MissionState,
    /// Point the current turn/drive pair is heading for
    target: Option<WorldPoint>,
    /// Remaining waypoints of a planned leg
    route: Option<Waypoints>,
    turn_pid: PidController,
    straight_pid: PidController,
    steer_pid: Option<PidController>,
    near_timer: f32,
    was_near: bool,
    arrival: ArrivalTracker,
    planner: Option<GridPlanner>,
}

impl MissionController {
    /// Create a controller starting in `AcquirePrimaryTarget`.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            turn_pid: PidController::new(config.turn),
            straight_pid: PidController::new(config.straight),
            steer_pid: config.steer.map(PidController::new),
            planner: config.planner.clone().and_then(|planner| {
                GridPlanner::new(planner)
                    .map_err(|e| warn!("Route planning disabled: {}", e))
                    .ok()
            }),
            near_timer: config.near_target_timeout,
            was_near: false,
            arrival: ArrivalTracker::default(),
            state: MissionState::AcquirePrimaryTarget,
            target: None,
            route: None,
            config,
        }
    }

    /// Start from a different state.
    pub fn with_state(mut self, state: MissionState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state.is_dead()
    }

    pub fn target(&self) -> Option<WorldPoint> {
        self.target
    }

    pub fn route(&self) -> Option<&Waypoints> {
        self.route.as_ref()
    }

    /// Remaining near-target countdown in seconds.
    pub fn near_timer(&self) -> f32 {
        self.near_timer
    }

    pub fn turn_pid(&self) -> &PidController {
        &self.turn_pid
    }

    pub fn straight_pid(&self) -> &PidController {
        &self.straight_pid
    }

    pub fn steer_pid(&self) -> Option<&PidController> {
        self.steer_pid.as_ref()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run one control cycle against `snapshot`, `dt` seconds after the previous one.
    pub fn step(&mut self, snapshot: &WorldSnapshot, dt: f32) -> CycleReport {
        let mut report = CycleReport::new(self.state);

        for _ in 0..self.config.max_transitions_per_cycle.max(1) {
            let step = self.dispatch(snapshot, dt, &mut report.events);

            if let Some(transition) = step.transition {
                self.apply(transition, &mut report);
            }

            match step.command {
                Some(command) => {
                    report.command = command;
                    return report;
                }
                None if step.transition.is_none() => break,
                None => {}
            }
        }

        warn!(
            "Transition limit reached in {} without a motor command, stopping",
            self.state
        );
        report.events.push(MissionEvent::TransitionLimit);
        report.command = MotorCommand::Stop;
        report
    }

    /// Force the terminal state. Irreversible.
    pub fn disable(&mut self, reason: &str) -> CycleReport {
        let mut report = CycleReport::new(self.state);
        if !self.state.is_dead() {
            warn!("Robot disabled in {}: {}", self.state, reason);
            report.events.push(MissionEvent::Disabled(reason.to_string()));
            self.apply(Transition::to(MissionState::Dead), &mut report);
        }
        report
    }

    fn dispatch(
        &mut self,
        snapshot: &WorldSnapshot,
        dt: f32,
        events: &mut Vec<MissionEvent>,
    ) -> Step {
        match self.state {
            MissionState::AcquirePrimaryTarget => {
                self.acquire(HiveKind::Healthy, snapshot, events)
            }
            MissionState::AcquireSecondaryTarget => {
                self.acquire(HiveKind::Diseased, snapshot, events)
            }
            MissionState::ReturnHome => {
                let goal = snapshot
                    .sides
                    .home
                    .delivery_point(self.config.delivery_offset);
                self.begin_leg(Leg::Home, goal, None, snapshot, events)
            }
            MissionState::DeliverToOpponentZone => {
                let goal = snapshot
                    .sides
                    .opponent
                    .delivery_point(self.config.delivery_offset);
                self.begin_leg(Leg::OpponentZone, goal, None, snapshot, events)
            }
            MissionState::TurnToTarget { leg } => self.turn(leg, snapshot, dt),
            MissionState::DriveToTarget { leg } => self.drive(leg, snapshot, dt, events),
            MissionState::Dead => Step::emit(MotorCommand::Stop),
        }
    }

    fn acquire(
        &mut self,
        kind: HiveKind,
        snapshot: &WorldSnapshot,
        events: &mut Vec<MissionEvent>,
    ) -> Step {
        let position = snapshot.robot.pose.position();
        let (leg, fallback) = match kind {
            HiveKind::Healthy => (Leg::PrimaryHive, MissionState::AcquireSecondaryTarget),
            HiveKind::Diseased => (Leg::SecondaryHive, MissionState::Dead),
        };

        match snapshot.nearest_hive(kind, position) {
            Some(hive) => {
                let (id, goal) = (hive.id, hive.position);
                self.begin_leg(leg, goal, Some(id), snapshot, events)
            }
            None => {
                events.push(MissionEvent::NoEligibleTarget(kind));
                if fallback.is_dead() {
                    warn!("No {:?} hive left, mission cannot continue", kind);
                    self.clear_target();
                    Step::emit_and_go(MotorCommand::Stop, fallback)
                } else {
                    info!("No {:?} hive left, falling through to {}", kind, fallback);
                    Step::go(fallback)
                }
            }
        }
    }

    /// Start a navigation leg towards `goal`, skipping it if already there.
    fn begin_leg(
        &mut self,
        leg: Leg,
        goal: WorldPoint,
        hive: Option<u32>,
        snapshot: &WorldSnapshot,
        events: &mut Vec<MissionEvent>,
    ) -> Step {
        let pose = snapshot.robot.pose;

        if self
            .config
            .tolerances
            .within_eps_distance(pose.distance_to(goal))
        {
            debug!(
                "Already at ({:.0}, {:.0}), skipping {:?} leg",
                goal.x, goal.y, leg
            );
            self.clear_target();
            return Step::go(leg.on_arrival());
        }

        self.route = self.plan_route(pose.position(), goal, hive, snapshot, events);
        let first = self.route.as_mut().and_then(Waypoints::pop).unwrap_or(goal);
        self.target = Some(first);

        info!(
            "{:?} leg to ({:.0}, {:.0}), {} waypoint(s)",
            leg,
            goal.x,
            goal.y,
            1 + self.route.as_ref().map_or(0, Waypoints::len)
        );
        events.push(MissionEvent::TargetSelected { leg, target: goal });

        Step::go(MissionState::TurnToTarget { leg })
    }

    fn plan_route(
        &self,
        start: WorldPoint,
        goal: WorldPoint,
        hive: Option<u32>,
        snapshot: &WorldSnapshot,
        events: &mut Vec<MissionEvent>,
    ) -> Option<Waypoints> {
        let planner = self.planner.as_ref()?;
        let obstacles = snapshot.obstacles_except(hive);

        match planner.plan(start, goal, &obstacles) {
            Some(mut route) => {
                route.set_goal(goal);
                debug!(
                    "Planned {} waypoints, {:.0} long",
                    route.len(),
                    route.length_from(start)
                );
                Some(route)
            }
            None => {
                warn!(
                    "No path to ({:.0}, {:.0}) around {} obstacles, approaching directly",
                    goal.x,
                    goal.y,
                    obstacles.len()
                );
                events.push(MissionEvent::Unreachable { target: goal });
                None
            }
        }
    }

    fn turn(&mut self, leg: Leg, snapshot: &WorldSnapshot, dt: f32) -> Step {
        let Some(target) = self.target else {
            warn!("Turning without a target, reselecting");
            return Step::go(leg.selecting_state());
        };

        let heading_error = snapshot.robot.pose.heading_error_to(target);
        if self.config.tolerances.within_eps_heading(heading_error) {
            return Step::go(MissionState::DriveToTarget { leg });
        }

        let turn = self.turn_pid.update(heading_error, dt);
        debug!(
            "turn: error={:.1}°, output={:.1}",
            heading_error.to_degrees(),
            turn
        );
        Step::emit(MotorCommand::rotate(turn))
    }

    fn drive(
        &mut self,
        leg: Leg,
        snapshot: &WorldSnapshot,
        dt: f32,
        events: &mut Vec<MissionEvent>,
    ) -> Step {
        let Some(target) = self.target else {
            warn!("Driving without a target, reselecting");
            return Step::emit_and_go(MotorCommand::Stop, leg.selecting_state());
        };

        let pose = snapshot.robot.pose;
        let distance = pose.distance_to(target);
        let heading_error = pose.heading_error_to(target);
        let tolerances = self.config.tolerances;

        let near = tolerances.within_near(distance);
        if near && !self.was_near {
            self.near_timer = self.config.near_target_timeout;
        }
        if near {
            self.near_timer -= dt;
        }
        self.was_near = near;

        if self.arrival.update(&tolerances, distance, dt) {
            if let Some(next) = self.route.as_mut().and_then(Waypoints::pop) {
                let remaining = self.route.as_ref().map_or(0, Waypoints::len);
                debug!(
                    "Waypoint reached, next ({:.0}, {:.0}), {} remaining",
                    next.x, next.y, remaining
                );
                self.target = Some(next);
                events.push(MissionEvent::RouteAdvanced { remaining });
                return Step::emit_and_go(MotorCommand::Stop, MissionState::TurnToTarget { leg });
            }

            info!(
                "Arrived at ({:.0}, {:.0}), {:.0} off",
                target.x, target.y, distance
            );
            self.clear_target();
            return Step::emit_and_go(MotorCommand::Stop, leg.on_arrival());
        }

        if self.near_timer < 0.0 {
            warn!(
                "Near-target countdown expired {:.0} from ({:.0}, {:.0}), realigning",
                distance, target.x, target.y
            );
            events.push(MissionEvent::Stalled { target });
            return Step::emit_and_go(MotorCommand::Stop, MissionState::TurnToTarget { leg });
        }

        // Signed along-track distance, negative once the target is behind
        let along_track = distance * heading_error.cos();
        let forward = self.straight_pid.update(along_track, dt);
        let turn = self
            .steer_pid
            .as_mut()
            .map_or(0.0, |pid| pid.update(heading_error, dt));

        debug!(
            "drive: dist={:.0}, heading_err={:.1}°, forward={:.1}, turn={:.1}, timer={:.2}",
            distance,
            heading_error.to_degrees(),
            forward,
            turn,
            self.near_timer
        );
        Step::emit(MotorCommand::forward_with_turn(forward, turn))
    }

    fn apply(&mut self, transition: Transition, report: &mut CycleReport) {
        let from = self.state;
        self.state = transition.next;

        for action in transition.actions {
            match action {
                EnterAction::ResetTurnPid => self.turn_pid.reset(),
                EnterAction::ResetDrivePids => {
                    self.straight_pid.reset();
                    if let Some(pid) = self.steer_pid.as_mut() {
                        pid.reset();
                    }
                }
                EnterAction::ArmNearTargetTimer => {
                    self.near_timer = self.config.near_target_timeout;
                    self.was_near = false;
                }
                EnterAction::ResetArrival => self.arrival.reset(),
            }
        }

        if transition.next.is_dead() {
            self.clear_target();
        }

        info!("{} -> {}", from, transition.next);
        report.states.push(transition.next);
        report.events.push(MissionEvent::Transition {
            from,
            to: transition.next,
        });
    }

    fn clear_target(&mut self) {
        self.target = None;
        self.route = None;
    }
}
