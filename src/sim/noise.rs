//! Overhead camera model: pose jitter and dropped frames.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_distr::{Bernoulli, Distribution, Normal};

use crate::config::SimConfig;
use crate::core::{Pose2D, normalize_angle};

/// Seeded camera error model for the simulated arena.
///
/// A seed of 0 draws from entropy; any other seed replays the same jitter and
/// the same dropped frames.
pub struct CameraModel {
    rng: SmallRng,
    position: Option<Normal<f32>>,
    heading: Option<Normal<f32>>,
    dropout: Option<Bernoulli>,
}

impl CameraModel {
    pub fn new(config: &SimConfig) -> Self {
        let rng = match config.seed {
            0 => SmallRng::from_entropy(),
            seed => SmallRng::seed_from_u64(seed),
        };

        Self {
            rng,
            position: jitter(config.position_noise),
            heading: jitter(config.heading_noise),
            dropout: (config.dropout_probability > 0.0)
                .then(|| Bernoulli::new(config.dropout_probability as f64).ok())
                .flatten(),
        }
    }

    /// Pose as the camera reports it.
    pub fn observe(&mut self, pose: Pose2D) -> Pose2D {
        let dx = sample(&self.position, &mut self.rng);
        let dy = sample(&self.position, &mut self.rng);
        let dtheta = sample(&self.heading, &mut self.rng);
        Pose2D::new(pose.x + dx, pose.y + dy, normalize_angle(pose.theta + dtheta))
    }

    /// Whether the next frame is lost.
    pub fn frame_dropped(&mut self) -> bool {
        match &self.dropout {
            Some(dropout) => dropout.sample(&mut self.rng),
            None => false,
        }
    }
}

fn sample(dist: &Option<Normal<f32>>, rng: &mut SmallRng) -> f32 {
    dist.as_ref().map_or(0.0, |d| d.sample(rng))
}

/// Zero-mean normal with the given spread, or nothing when the spread is off.
fn jitter(stddev: f32) -> Option<Normal<f32>> {
    if stddev > 0.0 {
        Normal::new(0.0, stddev).ok()
    } else {
        None
    }
}
