//! Core data types for the interaction engine

use serde::{Deserialize, Serialize};
use surface_port::MouseButton;

use crate::errors::InteractionError;

/// Inclusive interval, in milliseconds, from which randomized pauses are
/// sampled.
///
/// Invariant: `min_ms <= max_ms`. [`DelayWindow::new`] enforces it; callers
/// building the struct literally (or deserializing one) are re-checked at
/// sampling time, where an inverted window is a configuration error rather
/// than a silent swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayWindow {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayWindow {
    /// Create a window, rejecting an inverted range.
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, InteractionError> {
        if min_ms > max_ms {
            return Err(InteractionError::validation(format!(
                "delay window inverted: min {}ms > max {}ms",
                min_ms, max_ms
            )));
        }
        Ok(Self { min_ms, max_ms })
    }

    /// A degenerate window that always yields `ms`.
    pub const fn fixed(ms: u64) -> Self {
        Self {
            min_ms: ms,
            max_ms: ms,
        }
    }
}

/// Inclusive step-count range for interpolated motion and scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub min: u32,
    pub max: u32,
}

impl StepRange {
    pub fn new(min: u32, max: u32) -> Result<Self, InteractionError> {
        if min > max {
            return Err(InteractionError::validation(format!(
                "step range inverted: min {} > max {}",
                min, max
            )));
        }
        if min == 0 {
            return Err(InteractionError::validation(
                "step range must admit at least one step".to_string(),
            ));
        }
        Ok(Self { min, max })
    }
}

/// Retry budget and backoff shape for one primitive handler.
///
/// The backoff base is sampled fresh from `base_delay` on every failed
/// attempt and then scaled by `backoff_multiplier^attempt_index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total invocation budget, at least 1.
    pub max_attempts: u32,

    /// Window the backoff base is drawn from.
    pub base_delay: DelayWindow,

    /// Exponential growth factor applied per attempt index.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        base_delay: DelayWindow,
        backoff_multiplier: f64,
    ) -> Result<Self, InteractionError> {
        if max_attempts == 0 {
            return Err(InteractionError::validation(
                "retry policy requires max_attempts >= 1",
            ));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier <= 0.0 {
            return Err(InteractionError::validation(format!(
                "retry policy backoff_multiplier must be finite and positive, got {}",
                backoff_multiplier
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            backoff_multiplier,
        })
    }

    /// A single attempt, no backoff. Useful for non-idempotent primitives.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            base_delay: DelayWindow::fixed(0),
            backoff_multiplier: 1.0,
        }
    }
}

/// Scroll direction for scroll descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl Default for ScrollDirection {
    fn default() -> Self {
        ScrollDirection::Down
    }
}

/// Kind of abstract UI action the dispatcher understands.
///
/// `Custom` keeps externally loaded plans representable when they carry a
/// kind this engine does not implement; dispatching one fails with a
/// non-retryable invalid-action error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Type,
    Scroll,
    Wait,
    Custom(String),
}

impl ActionKind {
    /// Stable name used for operation labels and log fields.
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Scroll => "scroll",
            ActionKind::Wait => "wait",
            ActionKind::Custom(kind) => kind.as_str(),
        }
    }
}

/// One abstract UI action consumed by the dispatcher.
///
/// Descriptors are immutable, built per call, and never retained by the
/// engine beyond the dispatch call that consumed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub kind: ActionKind,

    /// Target selector; required for click and type.
    #[serde(default)]
    pub target: Option<String>,

    /// Text payload; required for type.
    #[serde(default)]
    pub text: Option<String>,

    /// Explicit pause window. For `Wait` this is the wait duration; for
    /// `Type` it overrides the per-character typing window.
    #[serde(default)]
    pub delay_window: Option<DelayWindow>,

    /// Per-descriptor retry policy; falls back to the engine default.
    #[serde(default)]
    pub retry_override: Option<RetryPolicy>,

    /// Clear the field (select-all then delete) before typing.
    #[serde(default)]
    pub clear_first: bool,

    /// Press Enter after the text has been typed.
    #[serde(default)]
    pub press_enter: bool,

    /// 1 = plain click, 2 = double click. Defaults to 1.
    #[serde(default)]
    pub click_count: Option<u8>,

    /// Mouse button for click. Defaults to left.
    #[serde(default)]
    pub button: Option<MouseButton>,

    /// Scroll direction. Defaults to down.
    #[serde(default)]
    pub direction: ScrollDirection,

    /// Total scroll distance in pixels; falls back to the engine default.
    #[serde(default)]
    pub distance_px: Option<u32>,
}

impl ActionDescriptor {
    fn bare(kind: ActionKind) -> Self {
        Self {
            kind,
            target: None,
            text: None,
            delay_window: None,
            retry_override: None,
            clear_first: false,
            press_enter: false,
            click_count: None,
            button: None,
            direction: ScrollDirection::default(),
            distance_px: None,
        }
    }

    /// Click the element at `target`.
    pub fn click(target: impl Into<String>) -> Self {
        let mut action = Self::bare(ActionKind::Click);
        action.target = Some(target.into());
        action
    }

    /// Type `text` into the element at `target`.
    pub fn type_text(target: impl Into<String>, text: impl Into<String>) -> Self {
        let mut action = Self::bare(ActionKind::Type);
        action.target = Some(target.into());
        action.text = Some(text.into());
        action
    }

    /// Scroll `distance_px` pixels in `direction`.
    pub fn scroll(direction: ScrollDirection, distance_px: u32) -> Self {
        let mut action = Self::bare(ActionKind::Scroll);
        action.direction = direction;
        action.distance_px = Some(distance_px);
        action
    }

    /// Sleep a duration sampled from `window`.
    pub fn wait(window: DelayWindow) -> Self {
        let mut action = Self::bare(ActionKind::Wait);
        action.delay_window = Some(window);
        action
    }

    /// Sleep the engine's default wait window.
    pub fn wait_default() -> Self {
        Self::bare(ActionKind::Wait)
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_override = Some(policy);
        self
    }

    pub fn with_delay_window(mut self, window: DelayWindow) -> Self {
        self.delay_window = Some(window);
        self
    }

    pub fn with_clear_first(mut self) -> Self {
        self.clear_first = true;
        self
    }

    pub fn with_press_enter(mut self) -> Self {
        self.press_enter = true;
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = Some(button);
        self
    }

    pub fn with_click_count(mut self, count: u8) -> Self {
        self.click_count = Some(count);
        self
    }
}

/// Outcome of a bounds-validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,

    /// Violation messages in check order; empty when valid.
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Per-action outcome recorded by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Position in the submitted sequence.
    pub index: usize,

    /// Operation label ("click", "type", ...).
    pub operation: String,

    /// Target selector, when the action had one.
    pub target: Option<String>,

    /// Invocations the retry wrapper spent on this action.
    pub attempts: u32,

    /// Wall time spent on the action, including pacing.
    pub latency_ms: u64,
}

/// Report for a completed dispatch call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Correlates log lines for this sequence.
    pub sequence_id: String,

    pub actions: Vec<ActionOutcome>,

    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_window_rejects_inverted_range() {
        assert!(DelayWindow::new(200, 100).is_err());
        let window = DelayWindow::new(100, 200).unwrap();
        assert_eq!(window.min_ms, 100);
        assert_eq!(window.max_ms, 200);
    }

    #[test]
    fn step_range_rejects_inverted_and_zero_minimum() {
        assert!(StepRange::new(5, 2).is_err());
        assert!(StepRange::new(0, 5).is_err());
        let range = StepRange::new(2, 5).unwrap();
        assert_eq!(range.min, 2);
        assert_eq!(range.max, 5);
    }

    #[test]
    fn retry_policy_requires_at_least_one_attempt() {
        let window = DelayWindow::fixed(10);
        assert!(RetryPolicy::new(0, window, 2.0).is_err());
        assert!(RetryPolicy::new(1, window, 0.0).is_err());
        assert!(RetryPolicy::new(3, window, 2.0).is_ok());
    }

    #[test]
    fn click_builder_sets_target() {
        let action = ActionDescriptor::click("#submit").with_click_count(2);
        assert_eq!(action.kind, ActionKind::Click);
        assert_eq!(action.target.as_deref(), Some("#submit"));
        assert_eq!(action.click_count, Some(2));
    }

    #[test]
    fn descriptor_deserializes_with_defaults() {
        let action: ActionDescriptor =
            serde_json::from_str(r##"{"kind":"click","target":"#a"}"##).unwrap();
        assert_eq!(action.kind, ActionKind::Click);
        assert!(!action.clear_first);
        assert!(action.retry_override.is_none());
    }

    #[test]
    fn unknown_kind_deserializes_as_custom() {
        let action: ActionDescriptor =
            serde_json::from_str(r##"{"kind":{"custom":"hover"},"target":"#a"}"##).unwrap();
        assert_eq!(action.kind, ActionKind::Custom("hover".into()));
        assert_eq!(action.kind.as_str(), "hover");
    }
}
