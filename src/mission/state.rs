//! Mission states and transitions.
//!
//! Entering a state can carry side effects (PID resets, timer arming). They are
//! returned with the transition instead of being signalled through a flag.

use std::fmt;

/// Navigation leg a turn/drive pair is serving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Leg {
    PrimaryHive,
    SecondaryHive,
    Home,
    OpponentZone,
}

impl Leg {
    /// State that follows arrival at the end of this leg.
    pub fn on_arrival(self) -> MissionState {
        match self {
            Leg::PrimaryHive => MissionState::ReturnHome,
            Leg::SecondaryHive => MissionState::DeliverToOpponentZone,
            Leg::Home | Leg::OpponentZone => MissionState::AcquirePrimaryTarget,
        }
    }

    /// State that selects this leg's target.
    pub fn selecting_state(self) -> MissionState {
        match self {
            Leg::PrimaryHive => MissionState::AcquirePrimaryTarget,
            Leg::SecondaryHive => MissionState::AcquireSecondaryTarget,
            Leg::Home => MissionState::ReturnHome,
            Leg::OpponentZone => MissionState::DeliverToOpponentZone,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MissionState {
    AcquirePrimaryTarget,
    AcquireSecondaryTarget,
    ReturnHome,
    DeliverToOpponentZone,
    TurnToTarget { leg: Leg },
    DriveToTarget { leg: Leg },
    /// Terminal: motors off, no further transitions
    Dead,
}

impl MissionState {
    /// Side effects owed on entry.
    pub fn entry_actions(&self) -> &'static [EnterAction] {
        match self {
            MissionState::TurnToTarget { .. } => &[EnterAction::ResetTurnPid],
            MissionState::DriveToTarget { .. } => &[
                EnterAction::ResetDrivePids,
                EnterAction::ArmNearTargetTimer,
                EnterAction::ResetArrival,
            ],
            _ => &[],
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, MissionState::Dead)
    }

    pub fn name(&self) -> &'static str {
        match self {
            MissionState::AcquirePrimaryTarget => "ACQUIRE_PRIMARY_TARGET",
            MissionState::AcquireSecondaryTarget => "ACQUIRE_SECONDARY_TARGET",
            MissionState::ReturnHome => "RETURN_HOME",
            MissionState::DeliverToOpponentZone => "DELIVER_TO_OPPONENT_ZONE",
            MissionState::TurnToTarget { .. } => "TURN_TO_TARGET",
            MissionState::DriveToTarget { .. } => "DRIVE_TO_TARGET",
            MissionState::Dead => "DEAD",
        }
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionState::TurnToTarget { leg } | MissionState::DriveToTarget { leg } => {
                write!(f, "{}({:?})", self.name(), leg)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Entry side effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnterAction {
    /// Clear turn-in-place PID history
    ResetTurnPid,
    /// Clear forward and steering PID history
    ResetDrivePids,
    /// Reload the near-target safety countdown
    ArmNearTargetTimer,
    /// Forget accumulated arrival hysteresis
    ResetArrival,
}

/// A state change together with its entry actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: MissionState,
    pub actions: &'static [EnterAction],
}

impl Transition {
    pub fn to(next: MissionState) -> Self {
        Self {
            next,
            actions: next.entry_actions(),
        }
    }
}
