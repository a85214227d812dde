//! Bounded-random interval sampling and cooperative sleeping
//!
//! All pacing in the engine flows through one [`DelayGenerator`] per
//! dispatcher, so a sequence's timing can be made deterministic in tests by
//! seeding it.

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep, Duration};

use crate::errors::InteractionError;
use crate::types::{DelayWindow, StepRange};

/// Uniform sampler over millisecond windows, plus cooperative sleeps.
pub struct DelayGenerator {
    rng: Mutex<SmallRng>,
}

impl DelayGenerator {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    /// Generator with a fixed seed; timing stays randomized in shape but
    /// reproducible across runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    /// Uniform draw from `[min_ms, max_ms]`.
    ///
    /// An inverted range is a configuration error, never a silent swap.
    pub fn sample_range(&self, min_ms: u64, max_ms: u64) -> Result<u64, InteractionError> {
        if min_ms > max_ms {
            return Err(InteractionError::validation(format!(
                "sample range inverted: min {}ms > max {}ms",
                min_ms, max_ms
            )));
        }
        Ok(self.rng.lock().gen_range(min_ms..=max_ms))
    }

    /// Uniform draw from a delay window.
    pub fn sample(&self, window: DelayWindow) -> Result<u64, InteractionError> {
        self.sample_range(window.min_ms, window.max_ms)
    }

    /// Uniform step count from a step range.
    ///
    /// A range that admits zero steps is a configuration error, never a
    /// silent clamp to 1.
    pub fn sample_steps(&self, range: StepRange) -> Result<u32, InteractionError> {
        if range.min > range.max {
            return Err(InteractionError::validation(format!(
                "step range inverted: min {} > max {}",
                range.min, range.max
            )));
        }
        if range.min == 0 {
            return Err(InteractionError::validation(
                "step range must admit at least one step".to_string(),
            ));
        }
        Ok(self.rng.lock().gen_range(range.min..=range.max))
    }

    /// Symmetric pixel jitter in `[-magnitude, magnitude]`.
    pub fn jitter(&self, magnitude_px: f64) -> f64 {
        if magnitude_px <= 0.0 {
            return 0.0;
        }
        self.rng.lock().gen_range(-magnitude_px..=magnitude_px)
    }

    /// Cooperatively suspend the caller for `ms`.
    pub async fn sleep(&self, ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    /// Sample a window, sleep it, and report the sampled duration.
    pub async fn pause(&self, window: DelayWindow) -> Result<u64, InteractionError> {
        let ms = self.sample(window)?;
        self.sleep(ms).await;
        Ok(ms)
    }
}

impl Default for DelayGenerator {
    fn default() -> Self {
        Self::new()
    }
}
