//! Read-only engine tunables and stateless bounds validation
//!
//! Tunables are fixed at process start and injected into the dispatcher;
//! nothing in the engine mutates them afterwards. [`ConfigValidator`]
//! bounds-checks externally loaded partial configuration before it is turned
//! into tunables, through an open registry of named checkers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{DelayWindow, RetryPolicy, StepRange, ValidationResult};

/// Pointer-motion pacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionTunables {
    /// Interpolation step count range.
    pub steps: StepRange,

    /// Destination jitter magnitude in pixels, both axes.
    pub jitter_px: f64,

    /// Pause between interpolation steps.
    pub step_delay: DelayWindow,
}

impl Default for MotionTunables {
    fn default() -> Self {
        Self {
            steps: StepRange { min: 3, max: 7 },
            jitter_px: 3.0,
            step_delay: DelayWindow {
                min_ms: 15,
                max_ms: 45,
            },
        }
    }
}

/// Incremental scrolling pacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollTunables {
    /// Increment count range per scroll action.
    pub steps: StepRange,

    /// Pause between increments.
    pub step_pause: DelayWindow,

    /// Distance used when a descriptor does not carry one.
    pub default_distance_px: u32,
}

impl Default for ScrollTunables {
    fn default() -> Self {
        Self {
            steps: StepRange { min: 2, max: 5 },
            step_pause: DelayWindow {
                min_ms: 80,
                max_ms: 220,
            },
            default_distance_px: 600,
        }
    }
}

/// Process-wide, read-only pacing and retry defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTunables {
    /// Per-character typing window.
    pub typing: DelayWindow,

    /// Pause between pointer arrival and the click itself.
    pub pre_click: DelayWindow,

    /// Hold time between button down and up.
    pub click_hold: DelayWindow,

    /// Pause before a submitting Enter keypress.
    pub pre_submit: DelayWindow,

    /// Pause inserted after each dispatched action.
    pub post_action: DelayWindow,

    /// Window used by wait actions without an explicit one.
    pub default_wait: DelayWindow,

    /// Surface-enforced wait-for-selector timeout.
    pub selector_timeout_ms: u64,

    /// Route pointer motion through the planner before clicking.
    pub move_pointer: bool,

    pub motion: MotionTunables,

    pub scroll: ScrollTunables,

    /// Retry policy applied when a descriptor has no override.
    pub default_retry: RetryPolicy,

    /// Fixed RNG seed for reproducible pacing; `None` uses OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for EngineTunables {
    fn default() -> Self {
        Self {
            typing: DelayWindow {
                min_ms: 60,
                max_ms: 180,
            },
            pre_click: DelayWindow {
                min_ms: 120,
                max_ms: 340,
            },
            click_hold: DelayWindow {
                min_ms: 30,
                max_ms: 120,
            },
            pre_submit: DelayWindow {
                min_ms: 250,
                max_ms: 600,
            },
            post_action: DelayWindow {
                min_ms: 400,
                max_ms: 1200,
            },
            default_wait: DelayWindow {
                min_ms: 800,
                max_ms: 2000,
            },
            selector_timeout_ms: 10_000,
            move_pointer: true,
            motion: MotionTunables::default(),
            scroll: ScrollTunables::default(),
            default_retry: RetryPolicy {
                max_attempts: 3,
                base_delay: DelayWindow {
                    min_ms: 500,
                    max_ms: 1500,
                },
                backoff_multiplier: 2.0,
            },
            rng_seed: None,
        }
    }
}

/// Single bounds-checking contract for one named tunable.
///
/// New tunables register new checkers; existing checkers are never touched.
pub trait BoundsCheck: Send + Sync {
    /// Check a raw value, returning violation messages (empty = ok).
    fn check(&self, name: &str, value: &Value) -> Vec<String>;
}

/// Inclusive integer bounds with an optional unit suffix for messages.
pub struct IntBounds {
    pub min: i64,
    pub max: i64,
    pub unit: &'static str,
}

impl BoundsCheck for IntBounds {
    fn check(&self, name: &str, value: &Value) -> Vec<String> {
        let Some(v) = value.as_i64() else {
            return vec![format!("{} must be an integer, got {}", name, value)];
        };
        if v < self.min || v > self.max {
            return vec![format!(
                "{} must be between {}{} and {}{}, got {}",
                name, self.min, self.unit, self.max, self.unit, v
            )];
        }
        Vec::new()
    }
}

/// Registry of named bounds checkers, applied to partial config maps.
pub struct ConfigValidator {
    checks: Vec<(String, Box<dyn BoundsCheck>)>,
}

impl ConfigValidator {
    /// Validator carrying the built-in engine bounds.
    pub fn new() -> Self {
        let mut validator = Self { checks: Vec::new() };
        validator.register(
            "retries",
            IntBounds {
                min: 0,
                max: 10,
                unit: "",
            },
        );
        validator.register(
            "timeout",
            IntBounds {
                min: 1000,
                max: 60_000,
                unit: "ms",
            },
        );
        validator.register(
            "delay",
            IntBounds {
                min: 0,
                max: 5000,
                unit: "ms",
            },
        );
        validator
    }

    /// Add or replace the checker for `name`.
    pub fn register(&mut self, name: impl Into<String>, check: impl BoundsCheck + 'static) {
        let name = name.into();
        self.checks.retain(|(existing, _)| existing != &name);
        self.checks.push((name, Box::new(check)));
    }

    /// Check only the keys present in `config`; absent keys are neither
    /// defaulted nor required at this layer.
    pub fn validate(&self, config: &Map<String, Value>) -> ValidationResult {
        let mut errors = Vec::new();
        for (name, check) in &self.checks {
            if let Some(value) = config.get(name) {
                errors.extend(check.check(name, value));
            }
        }
        ValidationResult::invalid(errors)
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
