//! Cooperative control loop.
//!
//! One cycle: honour the stop flag, sample the world, run the mission
//! controller, send at most one motor command. A failed sample skips the cycle
//! without touching mission state; its elapsed time is credited to the next
//! processed cycle so the PID and countdown clocks stay honest.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::actuation::{ActuationSink, MotorCommand};
use crate::error::Result;
use crate::mission::{CycleReport, MissionController};
use crate::world::WorldSource;

/// Shortest `dt` handed to the controller in wall-clock mode.
const MIN_DT: f32 = 0.001;

/// Why a cycle stopped the motors without running mission logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleReason {
    /// Mission already terminated
    Dead,
    /// Match clock not running
    MatchInactive,
    /// Robot marker not seen this cycle
    RobotHidden,
}

/// What a single cycle did.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Sample unavailable, nothing was sent
    Skipped,
    /// Motors stopped, mission state untouched
    Idle(IdleReason),
    /// Mission controller ran (or was disabled) and its command was sent
    Stepped(CycleReport),
}

impl CycleOutcome {
    /// Command sent to the motors this cycle, if any.
    pub fn command(&self) -> Option<MotorCommand> {
        match self {
            CycleOutcome::Skipped => None,
            CycleOutcome::Idle(_) => Some(MotorCommand::Stop),
            CycleOutcome::Stepped(report) => Some(report.command),
        }
    }
}

/// Drives a [`MissionController`] against a world source and an actuation sink.
pub struct ControlLoop {
    controller: MissionController,
    stop: Arc<AtomicBool>,
    cycle_delay: f32,
    /// Time from skipped cycles not yet seen by the controller
    pending_dt: f32,
    /// A sample has reported the match clock running
    match_started: bool,
    /// The match clock stopped after having run
    match_over: bool,
    cycles: u64,
    skipped: u64,
}

impl ControlLoop {
    /// Create a loop running every `cycle_delay` seconds.
    pub fn new(controller: MissionController, cycle_delay: f32) -> Self {
        Self {
            controller,
            stop: Arc::new(AtomicBool::new(false)),
            cycle_delay,
            pending_dt: 0.0,
            match_started: false,
            match_over: false,
            cycles: 0,
            skipped: 0,
        }
    }

    /// Flag that, once set, disables the robot at the start of the next cycle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn controller(&self) -> &MissionController {
        &self.controller
    }

    /// Cycles run so far, skipped ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// True once the mission is dead or the match clock has run out.
    ///
    /// A match that has not started yet does not count as over.
    pub fn is_finished(&self) -> bool {
        self.controller.is_dead() || self.match_over
    }

    /// Run exactly one control cycle, `dt` seconds after the previous one.
    ///
    /// Transient sample faults are absorbed. Any other sample error and every
    /// sink error is returned.
    pub fn run_cycle<W, S>(&mut self, world: &mut W, sink: &mut S, dt: f32) -> Result<CycleOutcome>
    where
        W: WorldSource + ?Sized,
        S: ActuationSink + ?Sized,
    {
        self.cycles += 1;

        if self.stop.load(Ordering::Relaxed) && !self.controller.is_dead() {
            let report = self.controller.disable("stop requested");
            sink.apply(MotorCommand::Stop)?;
            return Ok(CycleOutcome::Stepped(report));
        }

        if self.controller.is_dead() {
            sink.apply(MotorCommand::Stop)?;
            return Ok(CycleOutcome::Idle(IdleReason::Dead));
        }

        let snapshot = match world.sample() {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transient() => {
                warn!("Skipping cycle {}: {}", self.cycles, e);
                self.skipped += 1;
                self.pending_dt += dt;
                return Ok(CycleOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };
        let dt = dt + std::mem::take(&mut self.pending_dt);

        if snapshot.robot_disabled {
            let report = self.controller.disable("disabled by referee");
            sink.apply(MotorCommand::Stop)?;
            return Ok(CycleOutcome::Stepped(report));
        }

        if snapshot.match_active {
            self.match_started = true;
        } else if self.match_started && !self.match_over {
            info!("Match clock stopped in {}", self.controller.state());
            self.match_over = true;
        }

        if !snapshot.match_active || !snapshot.robot_visible {
            let reason = if snapshot.match_active {
                IdleReason::RobotHidden
            } else {
                IdleReason::MatchInactive
            };
            debug!("Holding in {}: {:?}", self.controller.state(), reason);
            sink.apply(MotorCommand::Stop)?;
            return Ok(CycleOutcome::Idle(reason));
        }

        let report = self.controller.step(&snapshot, dt);
        sink.apply(report.command)?;
        Ok(CycleOutcome::Stepped(report))
    }

    /// Run up to `steps` cycles with the configured fixed period as `dt`.
    ///
    /// Returns early once the loop is finished (see [`Self::is_finished`]);
    /// the motors have been stopped by then.
    pub fn run_steps<W, S>(
        &mut self,
        world: &mut W,
        sink: &mut S,
        steps: usize,
    ) -> Result<Vec<CycleOutcome>>
    where
        W: WorldSource + ?Sized,
        S: ActuationSink + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(steps.min(4096));
        for _ in 0..steps {
            let outcome = self.run_cycle(world, sink, self.cycle_delay)?;
            outcomes.push(outcome);
            if self.is_finished() {
                break;
            }
        }
        Ok(outcomes)
    }

    /// Wall-clock loop. Returns once the controller is dead or the match clock
    /// has run out, with the motors stopped.
    pub fn run<W, S>(&mut self, world: &mut W, sink: &mut S) -> Result<()>
    where
        W: WorldSource + ?Sized,
        S: ActuationSink + ?Sized,
    {
        info!("Control loop started, period {:.0} ms", self.cycle_delay * 1000.0);

        let period = Duration::from_secs_f32(self.cycle_delay);
        let mut last = Instant::now();

        loop {
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32().max(MIN_DT);
            last = now;

            self.run_cycle(world, sink, dt)?;
            if self.is_finished() {
                break;
            }

            let elapsed = now.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }

        info!(
            "Control loop finished after {} cycles ({} skipped)",
            self.cycles, self.skipped
        );
        Ok(())
    }
}
