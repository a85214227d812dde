//! Action dispatcher - resolves descriptors to primitive handlers
//!
//! Descriptors execute strictly in input order; the ordering is a causal
//! dependency (a click must precede a type into the same field) and is never
//! reordered or parallelized. Every suspension point is a cooperative yield,
//! so a sequence has exactly one primitive in flight at any moment. One
//! dispatcher may be shared across sequences: it holds only read-only
//! tunables and the sampler; per-sequence pointer state lives in a planner
//! created per call.

use std::time::Instant;

use surface_port::{ClickOpts, ControlSurface, WaitForOpts};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::EngineTunables;
use crate::errors::InteractionError;
use crate::motion::MotionPlanner;
use crate::retry;
use crate::tempo::DelayGenerator;
use crate::types::{
    ActionDescriptor, ActionKind, ActionOutcome, DispatchReport, ScrollDirection,
    ValidationResult,
};

/// Sequences abstract UI actions into timed, randomized, retried primitives.
pub struct ActionDispatcher {
    tunables: EngineTunables,
    tempo: DelayGenerator,
}

impl ActionDispatcher {
    pub fn new(tunables: EngineTunables) -> Self {
        let tempo = match tunables.rng_seed {
            Some(seed) => DelayGenerator::seeded(seed),
            None => DelayGenerator::new(),
        };
        Self { tunables, tempo }
    }

    pub fn tunables(&self) -> &EngineTunables {
        &self.tunables
    }

    pub fn tempo(&self) -> &DelayGenerator {
        &self.tempo
    }

    /// Structural validation of a descriptor list: per-kind required fields,
    /// checked before any primitive is issued.
    pub fn validate(&self, descriptors: &[ActionDescriptor]) -> ValidationResult {
        let mut errors = Vec::new();
        for (index, action) in descriptors.iter().enumerate() {
            let label = action.kind.as_str();
            match &action.kind {
                ActionKind::Click => {
                    if selector_missing(&action.target) {
                        errors.push(format!("action {} ({}): missing target", index, label));
                    }
                    if action.click_count == Some(0) {
                        errors.push(format!(
                            "action {} ({}): click_count must be >= 1",
                            index, label
                        ));
                    }
                }
                ActionKind::Type => {
                    if selector_missing(&action.target) {
                        errors.push(format!("action {} ({}): missing target", index, label));
                    }
                    if action.text.as_deref().map_or(true, str::is_empty) {
                        errors.push(format!("action {} ({}): missing text", index, label));
                    }
                }
                ActionKind::Scroll => {
                    if action.distance_px == Some(0) {
                        errors.push(format!(
                            "action {} ({}): distance_px must be >= 1",
                            index, label
                        ));
                    }
                }
                ActionKind::Wait | ActionKind::Custom(_) => {}
            }
        }
        ValidationResult::invalid(errors)
    }

    /// Execute `descriptors` against `surface`, in order.
    ///
    /// Success is silent; failure surfaces exactly one [`InteractionError`].
    pub async fn run(
        &self,
        surface: &dyn ControlSurface,
        descriptors: &[ActionDescriptor],
    ) -> Result<(), InteractionError> {
        self.run_with_report(surface, descriptors).await.map(|_| ())
    }

    /// Like [`ActionDispatcher::run`], returning per-action latency and
    /// attempt counts.
    #[instrument(skip_all, fields(actions = descriptors.len()))]
    pub async fn run_with_report(
        &self,
        surface: &dyn ControlSurface,
        descriptors: &[ActionDescriptor],
    ) -> Result<DispatchReport, InteractionError> {
        let validation = self.validate(descriptors);
        if !validation.is_valid {
            return Err(InteractionError::validation(validation.errors.join("; ")));
        }

        let sequence_id = Uuid::new_v4().to_string();
        let sequence_start = Instant::now();
        info!(sequence = %sequence_id, count = descriptors.len(), "dispatching action sequence");

        // Pointer state is per sequence, not per dispatcher.
        let planner = MotionPlanner::new(self.tunables.motion);
        let planner_ref = &planner;

        let mut outcomes = Vec::with_capacity(descriptors.len());
        for (index, action) in descriptors.iter().enumerate() {
            let operation = action.kind.as_str().to_string();
            debug!(
                sequence = %sequence_id,
                index,
                operation = %operation,
                target = %crate::redact::text(action.target.as_deref().unwrap_or(""), 64),
                "executing action"
            );

            let policy = action
                .retry_override
                .unwrap_or(self.tunables.default_retry);
            let action_start = Instant::now();

            let (_, attempts) = retry::run_counted(
                &self.tempo,
                &policy,
                &operation,
                action.target.as_deref(),
                move || self.execute_action(surface, planner_ref, action),
            )
            .await?;

            outcomes.push(ActionOutcome {
                index,
                operation,
                target: action.target.clone(),
                attempts,
                latency_ms: action_start.elapsed().as_millis() as u64,
            });

            // One randomized pause between consecutive actions, none after
            // the last.
            if index + 1 < descriptors.len() {
                self.tempo.pause(self.tunables.post_action).await?;
            }
        }

        let report = DispatchReport {
            sequence_id: sequence_id.clone(),
            actions: outcomes,
            total_ms: sequence_start.elapsed().as_millis() as u64,
        };
        info!(sequence = %sequence_id, total_ms = report.total_ms, "action sequence completed");
        Ok(report)
    }

    async fn execute_action(
        &self,
        surface: &dyn ControlSurface,
        planner: &MotionPlanner,
        action: &ActionDescriptor,
    ) -> Result<(), InteractionError> {
        match &action.kind {
            ActionKind::Click => self.handle_click(surface, planner, action).await,
            ActionKind::Type => self.handle_type(surface, action).await,
            ActionKind::Scroll => self.handle_scroll(surface, action).await,
            ActionKind::Wait => self.handle_wait(action).await,
            ActionKind::Custom(kind) => Err(InteractionError::invalid_action(kind)),
        }
    }

    async fn handle_click(
        &self,
        surface: &dyn ControlSurface,
        planner: &MotionPlanner,
        action: &ActionDescriptor,
    ) -> Result<(), InteractionError> {
        let target = required_target(action)?;

        if self.tunables.move_pointer {
            planner.move_to(surface, &self.tempo, target).await?;
        }

        self.tempo.pause(self.tunables.pre_click).await?;

        let opts = ClickOpts {
            delay_ms: self.tempo.sample(self.tunables.click_hold)?,
            click_count: action.click_count.unwrap_or(1),
            button: action.button.unwrap_or_default(),
        };
        surface
            .click(target, opts)
            .await
            .map_err(|err| InteractionError::surface("click", Some(target), err))
    }

    async fn handle_type(
        &self,
        surface: &dyn ControlSurface,
        action: &ActionDescriptor,
    ) -> Result<(), InteractionError> {
        let target = required_target(action)?;
        let text = action.text.as_deref().unwrap_or_default();

        surface
            .wait_for_selector(
                target,
                WaitForOpts {
                    visible: true,
                    timeout_ms: self.tunables.selector_timeout_ms,
                },
            )
            .await
            .map_err(|err| InteractionError::surface("type", Some(target), err))?;

        surface
            .focus(target)
            .await
            .map_err(|err| InteractionError::surface("type", Some(target), err))?;

        if action.clear_first {
            self.clear_field(surface, target).await?;
        }

        let window = action.delay_window.unwrap_or(self.tunables.typing);
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            surface
                .type_char(ch)
                .await
                .map_err(|err| InteractionError::surface("type", Some(target), err))?;
            if chars.peek().is_some() {
                self.tempo.pause(window).await?;
            }
        }

        if action.press_enter {
            self.tempo.pause(self.tunables.pre_submit).await?;
            surface
                .key_press("Enter")
                .await
                .map_err(|err| InteractionError::surface("type", Some(target), err))?;
        }

        Ok(())
    }

    /// Select-all then delete, the way a person clears a field.
    async fn clear_field(
        &self,
        surface: &dyn ControlSurface,
        target: &str,
    ) -> Result<(), InteractionError> {
        let map = |err| InteractionError::surface("type", Some(target), err);
        surface.key_down("Control").await.map_err(map)?;
        surface.key_press("a").await.map_err(map)?;
        surface.key_up("Control").await.map_err(map)?;
        surface.key_press("Backspace").await.map_err(map)?;
        Ok(())
    }

    async fn handle_scroll(
        &self,
        surface: &dyn ControlSurface,
        action: &ActionDescriptor,
    ) -> Result<(), InteractionError> {
        let distance = action
            .distance_px
            .unwrap_or(self.tunables.scroll.default_distance_px);
        let steps = self.tempo.sample_steps(self.tunables.scroll.steps)?;
        let base = distance / steps;
        let remainder = distance % steps;

        for i in 0..steps {
            // Remainder lands on the last increment so the distances sum
            // exactly.
            let mut step_px = base;
            if i + 1 == steps {
                step_px += remainder;
            }
            let delta = match action.direction {
                ScrollDirection::Down => f64::from(step_px),
                ScrollDirection::Up => -f64::from(step_px),
            };
            surface
                .scroll_by(delta)
                .await
                .map_err(|err| InteractionError::surface("scroll", None, err))?;
            if i + 1 < steps {
                self.tempo.pause(self.tunables.scroll.step_pause).await?;
            }
        }

        Ok(())
    }

    async fn handle_wait(&self, action: &ActionDescriptor) -> Result<(), InteractionError> {
        let window = action.delay_window.unwrap_or(self.tunables.default_wait);
        let slept = self.tempo.pause(window).await?;
        debug!(slept_ms = slept, "wait action completed");
        Ok(())
    }
}

fn selector_missing(target: &Option<String>) -> bool {
    target.as_deref().map_or(true, |s| s.trim().is_empty())
}

fn required_target(action: &ActionDescriptor) -> Result<&str, InteractionError> {
    action
        .target
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            InteractionError::validation(format!(
                "{} action requires a target selector",
                action.kind.as_str()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::types::{DelayWindow, RetryPolicy};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use surface_port::{ElementRef, MouseButton, Rect, SurfaceError, Viewport};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        WaitFor(String),
        Focus(String),
        Click(String, u8, MouseButton),
        TypeChar(char),
        KeyDown(String),
        KeyPress(String),
        KeyUp(String),
        Move,
        ScrollBy(f64),
    }

    struct RecordingSurface {
        calls: Mutex<Vec<Call>>,
        boxes: HashMap<String, Rect>,
        click_failures: AtomicU32,
    }

    impl RecordingSurface {
        fn new(selectors: &[&str]) -> Self {
            let rect = Rect {
                x: 10.0,
                y: 10.0,
                width: 80.0,
                height: 30.0,
            };
            Self {
                calls: Mutex::new(Vec::new()),
                boxes: selectors.iter().map(|s| (s.to_string(), rect)).collect(),
                click_failures: AtomicU32::new(0),
            }
        }

        /// Fail the first `n` clicks with a transient I/O error.
        fn failing_clicks(self, n: u32) -> Self {
            self.click_failures.store(n, Ordering::SeqCst);
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ControlSurface for RecordingSurface {
        async fn wait_for_selector(
            &self,
            selector: &str,
            _opts: WaitForOpts,
        ) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::WaitFor(selector.to_string()));
            Ok(())
        }

        async fn focus(&self, selector: &str) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::Focus(selector.to_string()));
            Ok(())
        }

        async fn click(&self, selector: &str, opts: ClickOpts) -> Result<(), SurfaceError> {
            let remaining = self.click_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.click_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SurfaceError::Io("transient".to_string()));
            }
            self.calls
                .lock()
                .push(Call::Click(selector.to_string(), opts.click_count, opts.button));
            Ok(())
        }

        async fn type_char(&self, ch: char) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::TypeChar(ch));
            Ok(())
        }

        async fn key_down(&self, key: &str) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::KeyDown(key.to_string()));
            Ok(())
        }

        async fn key_press(&self, key: &str) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::KeyPress(key.to_string()));
            Ok(())
        }

        async fn key_up(&self, key: &str) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::KeyUp(key.to_string()));
            Ok(())
        }

        async fn move_pointer(&self, _x: f64, _y: f64) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::Move);
            Ok(())
        }

        async fn scroll_by(&self, delta_y: f64) -> Result<(), SurfaceError> {
            self.calls.lock().push(Call::ScrollBy(delta_y));
            Ok(())
        }

        async fn query_element(&self, selector: &str) -> Result<Option<ElementRef>, SurfaceError> {
            Ok(self
                .boxes
                .contains_key(selector)
                .then(|| ElementRef(selector.to_string())))
        }

        async fn bounding_box(&self, element: &ElementRef) -> Result<Option<Rect>, SurfaceError> {
            Ok(self.boxes.get(&element.0).copied())
        }

        async fn viewport_size(&self) -> Result<Viewport, SurfaceError> {
            Ok(Viewport {
                width: 1280.0,
                height: 800.0,
            })
        }
    }

    fn fast_tunables() -> EngineTunables {
        let zero = DelayWindow::fixed(0);
        EngineTunables {
            typing: zero,
            pre_click: zero,
            click_hold: zero,
            pre_submit: zero,
            post_action: zero,
            default_wait: zero,
            default_retry: RetryPolicy {
                max_attempts: 3,
                base_delay: zero,
                backoff_multiplier: 2.0,
            },
            ..EngineTunables::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn type_action_focuses_then_types_in_order() {
        let surface = RecordingSurface::new(&["#field"]);
        let dispatcher = ActionDispatcher::new(fast_tunables());

        dispatcher
            .run(
                &surface,
                &[ActionDescriptor::type_text("#field", "hi")
                    .with_clear_first()
                    .with_press_enter()],
            )
            .await
            .unwrap();

        let calls = surface.calls();
        assert_eq!(
            calls,
            vec![
                Call::WaitFor("#field".to_string()),
                Call::Focus("#field".to_string()),
                Call::KeyDown("Control".to_string()),
                Call::KeyPress("a".to_string()),
                Call::KeyUp("Control".to_string()),
                Call::KeyPress("Backspace".to_string()),
                Call::TypeChar('h'),
                Call::TypeChar('i'),
                Call::KeyPress("Enter".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn click_moves_pointer_before_clicking() {
        let surface = RecordingSurface::new(&["#a"]);
        let dispatcher = ActionDispatcher::new(fast_tunables());

        dispatcher
            .run(&surface, &[ActionDescriptor::click("#a")])
            .await
            .unwrap();

        let calls = surface.calls();
        let click_pos = calls
            .iter()
            .position(|c| matches!(c, Call::Click(..)))
            .unwrap();
        assert!(click_pos > 0);
        assert!(calls[..click_pos].iter().all(|c| matches!(c, Call::Move)));
    }

    #[tokio::test(start_paused = true)]
    async fn scroll_increments_sum_to_distance_and_respect_direction() {
        let surface = RecordingSurface::new(&[]);
        let dispatcher = ActionDispatcher::new(fast_tunables());

        dispatcher
            .run(
                &surface,
                &[ActionDescriptor::scroll(ScrollDirection::Up, 500)],
            )
            .await
            .unwrap();

        let deltas: Vec<f64> = surface
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::ScrollBy(d) => Some(*d),
                _ => None,
            })
            .collect();
        let steps = dispatcher.tunables().scroll.steps;
        assert!(deltas.len() as u32 >= steps.min && deltas.len() as u32 <= steps.max);
        assert!(deltas.iter().all(|d| *d < 0.0));
        assert_eq!(deltas.iter().sum::<f64>(), -500.0);
    }

    #[tokio::test(start_paused = true)]
    async fn actions_execute_in_input_order() {
        let surface = RecordingSurface::new(&["#a", "#b"]);
        let dispatcher = ActionDispatcher::new(fast_tunables());

        dispatcher
            .run(
                &surface,
                &[
                    ActionDescriptor::click("#a"),
                    ActionDescriptor::type_text("#b", "x"),
                    ActionDescriptor::scroll(ScrollDirection::Down, 100),
                ],
            )
            .await
            .unwrap();

        let calls = surface.calls();
        let click = calls
            .iter()
            .position(|c| matches!(c, Call::Click(..)))
            .unwrap();
        let key = calls
            .iter()
            .position(|c| matches!(c, Call::TypeChar(_)))
            .unwrap();
        let scroll = calls
            .iter()
            .position(|c| matches!(c, Call::ScrollBy(_)))
            .unwrap();
        assert!(click < key && key < scroll);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_descriptor_fails_before_any_primitive() {
        let surface = RecordingSurface::new(&["#a"]);
        let dispatcher = ActionDispatcher::new(fast_tunables());

        let err = dispatcher
            .run(
                &surface,
                &[
                    ActionDescriptor::click("#a"),
                    ActionDescriptor::bare_type_for_test(),
                ],
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(surface.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn custom_kind_is_a_non_retryable_invalid_action() {
        let surface = RecordingSurface::new(&[]);
        let dispatcher = ActionDispatcher::new(fast_tunables());

        let mut action = ActionDescriptor::wait_default();
        action.kind = ActionKind::Custom("hover".to_string());

        let err = dispatcher.run(&surface, &[action]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAction);
        assert!(surface.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retry_override_governs_attempt_budget() {
        let surface = RecordingSurface::new(&["#a"]).failing_clicks(1);
        let mut tunables = fast_tunables();
        tunables.move_pointer = false;
        let dispatcher = ActionDispatcher::new(tunables);

        let report = dispatcher
            .run_with_report(
                &surface,
                &[ActionDescriptor::click("#a").with_retry(RetryPolicy {
                    max_attempts: 2,
                    base_delay: DelayWindow::fixed(0),
                    backoff_multiplier: 2.0,
                })],
            )
            .await
            .unwrap();

        assert_eq!(report.actions.len(), 1);
        assert_eq!(report.actions[0].attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_one_structured_error() {
        let surface = RecordingSurface::new(&["#a"]).failing_clicks(10);
        let mut tunables = fast_tunables();
        tunables.move_pointer = false;
        let dispatcher = ActionDispatcher::new(tunables);

        let err = dispatcher
            .run(&surface, &[ActionDescriptor::click("#a")])
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::RetriesExhausted);
        assert_eq!(err.attempts, Some(3));
        assert_eq!(err.target.as_deref(), Some("#a"));
        assert!(err.cause.is_some());
    }

    impl ActionDescriptor {
        /// Type descriptor with no target/text, for validation tests.
        fn bare_type_for_test() -> Self {
            let mut action = ActionDescriptor::wait_default();
            action.kind = ActionKind::Type;
            action
        }
    }
}
