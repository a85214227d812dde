//! Human-like interaction and retry execution engine.
//!
//! Turns an ordered list of abstract UI actions (click, type, scroll, wait)
//! into timed, randomized, retried primitive operations against a
//! caller-supplied [`surface_port::ControlSurface`]. The engine owns pacing
//! (randomized windows, interpolated pointer motion, exponential backoff)
//! and the structured error taxonomy; navigation, scraping, and persistence
//! live with the caller.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod motion;
pub mod redact;
pub mod retry;
pub mod tempo;
pub mod types;

pub use config::{BoundsCheck, ConfigValidator, EngineTunables, IntBounds, MotionTunables, ScrollTunables};
pub use dispatch::ActionDispatcher;
pub use errors::{ErrorKind, InteractionError};
pub use motion::MotionPlanner;
pub use tempo::DelayGenerator;
pub use types::{
    ActionDescriptor, ActionKind, ActionOutcome, DelayWindow, DispatchReport, RetryPolicy,
    ScrollDirection, StepRange, ValidationResult,
};
