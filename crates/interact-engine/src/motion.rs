//! Interpolated, randomized pointer paths
//!
//! The planner walks the pointer from its last known position (viewport
//! center on the first move of a sequence) toward a jittered point near the
//! target element's center, one move primitive per interpolation step with a
//! randomized pause between steps. Steps are strictly sequential; no two
//! move primitives of one path are ever in flight together.

use parking_lot::Mutex;
use surface_port::{ControlSurface, Point};
use tracing::debug;

use crate::config::MotionTunables;
use crate::errors::InteractionError;
use crate::tempo::DelayGenerator;

/// Plans and executes one pointer path at a time for a single sequence.
pub struct MotionPlanner {
    tunables: MotionTunables,

    /// Last position the planner moved the pointer to, if any.
    position: Mutex<Option<Point>>,
}

impl MotionPlanner {
    pub fn new(tunables: MotionTunables) -> Self {
        Self {
            tunables,
            position: Mutex::new(None),
        }
    }

    /// Last known pointer position.
    pub fn position(&self) -> Option<Point> {
        *self.position.lock()
    }

    /// Move the pointer toward the element at `target`.
    ///
    /// Fails with an element-not-found or no-bounding-box error before any
    /// move primitive is issued; on success returns the final pointer
    /// position.
    pub async fn move_to(
        &self,
        surface: &dyn ControlSurface,
        tempo: &DelayGenerator,
        target: &str,
    ) -> Result<Point, InteractionError> {
        let handle = surface
            .query_element(target)
            .await
            .map_err(|err| InteractionError::surface("move", Some(target), err))?
            .ok_or_else(|| InteractionError::element_not_found(target))?;

        let rect = surface
            .bounding_box(&handle)
            .await
            .map_err(|err| InteractionError::surface("move", Some(target), err))?
            .ok_or_else(|| InteractionError::no_bounding_box(target))?;

        // Jitter keeps repeated motions toward the same element from being
        // pixel-identical.
        let center = rect.center();
        let dest = Point {
            x: center.x + tempo.jitter(self.tunables.jitter_px),
            y: center.y + tempo.jitter(self.tunables.jitter_px),
        };

        let start = match self.position() {
            Some(point) => point,
            None => surface
                .viewport_size()
                .await
                .map_err(|err| InteractionError::surface("move", Some(target), err))?
                .center(),
        };

        let steps = tempo.sample_steps(self.tunables.steps)?;
        debug!(target, steps, "moving pointer");

        for i in 1..=steps {
            // Interpolation at t == 1.0 is not bit-exact, so the last step
            // issues the destination coordinates directly.
            let (x, y) = if i == steps {
                (dest.x, dest.y)
            } else {
                let t = f64::from(i) / f64::from(steps);
                (
                    start.x + (dest.x - start.x) * t,
                    start.y + (dest.y - start.y) * t,
                )
            };
            surface
                .move_pointer(x, y)
                .await
                .map_err(|err| InteractionError::surface("move", Some(target), err))?;
            if i < steps {
                tempo.pause(self.tunables.step_delay).await?;
            }
        }

        *self.position.lock() = Some(dest);
        Ok(dest)
    }
}
