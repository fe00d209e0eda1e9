//! Proximity and alignment predicates.
//!
//! - EPS: tight band deciding whether a turn or drive is needed at all
//! - NEAR: looser band arming the near-target safety countdown
//! - HIST: arrival confirmed only after staying inside the arrival radius for
//!   `hist_hold` seconds; leaving the release radius starts over

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Tolerances {
    #[serde(default = "default_eps_distance")]
    pub eps_distance: f32,
    /// Radians
    #[serde(default = "default_eps_heading")]
    pub eps_heading: f32,
    #[serde(default = "default_near_distance")]
    pub near_distance: f32,
    /// Arrival radius
    #[serde(default = "default_hist_distance")]
    pub hist_distance: f32,
    /// Leaving this radius discards accumulated arrival time
    #[serde(default = "default_hist_release_distance")]
    pub hist_release_distance: f32,
    /// Seconds inside the arrival radius before arrival is confirmed
    #[serde(default = "default_hist_hold")]
    pub hist_hold: f32,
}

fn default_eps_distance() -> f32 {
    50.0
}
fn default_eps_heading() -> f32 {
    0.08
}
fn default_near_distance() -> f32 {
    150.0
}
fn default_hist_distance() -> f32 {
    80.0
}
fn default_hist_release_distance() -> f32 {
    150.0
}
fn default_hist_hold() -> f32 {
    0.15
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            eps_distance: default_eps_distance(),
            eps_heading: default_eps_heading(),
            near_distance: default_near_distance(),
            hist_distance: default_hist_distance(),
            hist_release_distance: default_hist_release_distance(),
            hist_hold: default_hist_hold(),
        }
    }
}

impl Tolerances {
    #[inline]
    pub fn within_eps_distance(&self, distance: f32) -> bool {
        distance <= self.eps_distance
    }

    #[inline]
    pub fn within_eps_heading(&self, heading_error: f32) -> bool {
        heading_error.abs() <= self.eps_heading
    }

    #[inline]
    pub fn within_near(&self, distance: f32) -> bool {
        distance <= self.near_distance
    }
}

/// Hysteresis state behind the HIST predicate.
#[derive(Clone, Debug, Default)]
pub struct ArrivalTracker {
    engaged: bool,
    held: f32,
}

impl ArrivalTracker {
    pub fn reset(&mut self) {
        self.engaged = false;
        self.held = 0.0;
    }

    /// Feed one distance sample; returns whether arrival is confirmed.
    pub fn update(&mut self, tolerances: &Tolerances, distance: f32, dt: f32) -> bool {
        if distance <= tolerances.hist_distance {
            self.engaged = true;
        } else if distance > tolerances.hist_release_distance {
            self.reset();
        }

        if self.engaged {
            self.held += dt;
        }

        self.engaged && self.held >= tolerances.hist_hold
    }

    /// Seconds accumulated since engaging.
    pub fn held(&self) -> f32 {
        self.held
    }
}
