//! Structured error taxonomy for the interaction engine
//!
//! One [`InteractionError`] crosses the dispatch boundary per failure chain.
//! Diagnostic detail lives in [`InteractionError::to_log_context`]; the
//! operator-facing [`InteractionError::user_message`] deliberately omits
//! technical detail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use surface_port::SurfaceError;
use thiserror::Error;

use crate::redact;

/// Classification of an interaction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed descriptor, config, or misuse of the engine API.
    Validation,

    /// Selector lookup returned no element.
    ElementNotFound,

    /// Element resolved but exposed no bounding rectangle.
    NoBoundingBox,

    /// Surface-reported wait timeout.
    Timeout,

    /// Underlying surface I/O or protocol failure.
    Surface,

    /// Retry budget exhausted; wraps the last cause.
    RetriesExhausted,

    /// Action kind the dispatcher does not implement.
    InvalidAction,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ElementNotFound => "element_not_found",
            ErrorKind::NoBoundingBox => "no_bounding_box",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Surface => "surface",
            ErrorKind::RetriesExhausted => "retries_exhausted",
            ErrorKind::InvalidAction => "invalid_action",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured interaction failure.
///
/// Immutable once constructed; built through the named constructors below
/// and enriched with the `with_*` builders before it escapes the engine.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {kind}")]
pub struct InteractionError {
    pub kind: ErrorKind,

    /// Operation label, never blank.
    pub operation: String,

    pub target: Option<String>,

    /// Invocations spent before the failure became terminal.
    pub attempts: Option<u32>,

    /// Rendered cause chain of the underlying failure.
    pub cause: Option<String>,

    /// Free-form diagnostic payload; redacted before logging.
    pub context: Option<Map<String, Value>>,

    pub timestamp: DateTime<Utc>,
}

impl InteractionError {
    /// Build an error with the given classification and operation label.
    ///
    /// A blank operation is itself a programmer error: the result is a
    /// validation-kind error naming the misuse, so the defect is observable
    /// without panicking mid-sequence.
    pub fn new(kind: ErrorKind, operation: impl Into<String>) -> Self {
        let operation = operation.into();
        if operation.trim().is_empty() {
            return Self {
                kind: ErrorKind::Validation,
                operation: "error.construct".to_string(),
                target: None,
                attempts: None,
                cause: Some("blank operation name passed to InteractionError".to_string()),
                context: None,
                timestamp: Utc::now(),
            };
        }
        Self {
            kind,
            operation,
            target: None,
            attempts: None,
            cause: None,
            context: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn with_cause(mut self, cause: impl std::fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Malformed descriptor or configuration.
    pub fn validation(message: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::Validation, "validate").with_cause(message)
    }

    /// Selector lookup returned no element.
    pub fn element_not_found(target: impl Into<String>) -> Self {
        Self::new(ErrorKind::ElementNotFound, "locate").with_target(target)
    }

    /// Element resolved but exposed no bounding rectangle.
    pub fn no_bounding_box(target: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoBoundingBox, "locate").with_target(target)
    }

    /// Surface-reported wait timeout.
    pub fn timeout(
        operation: impl Into<String>,
        target: Option<&str>,
        timeout_ms: Option<u64>,
    ) -> Self {
        let mut err = Self::new(ErrorKind::Timeout, operation);
        if let Some(target) = target {
            err = err.with_target(target);
        }
        if let Some(ms) = timeout_ms {
            let mut context = Map::new();
            context.insert("timeout_ms".to_string(), Value::from(ms));
            err = err.with_context(context);
        }
        err
    }

    /// Retry budget exhausted; wraps the last attempt's failure.
    pub fn retries_exhausted(
        operation: impl Into<String>,
        target: Option<&str>,
        attempts: u32,
        cause: Option<&InteractionError>,
    ) -> Self {
        let mut err = Self::new(ErrorKind::RetriesExhausted, operation).with_attempts(attempts);
        if let Some(target) = target {
            err = err.with_target(target);
        }
        if let Some(cause) = cause {
            err = err.with_cause(cause);
        }
        err
    }

    /// Action kind the dispatcher does not implement.
    pub fn invalid_action(kind: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidAction, "dispatch")
            .with_cause(format!("unsupported action kind '{}'", kind))
    }

    /// Convert a raw surface failure into the engine taxonomy.
    pub fn surface(operation: impl Into<String>, target: Option<&str>, err: SurfaceError) -> Self {
        let operation = operation.into();
        match err {
            SurfaceError::Timeout {
                ref selector,
                timeout_ms,
            } => Self::timeout(operation, Some(selector.as_str()), Some(timeout_ms))
                .with_cause(&err),
            SurfaceError::TargetNotFound(ref selector) => {
                Self::element_not_found(selector.clone()).with_cause(&err)
            }
            SurfaceError::Detached(_) | SurfaceError::Io(_) => {
                let mut out = Self::new(ErrorKind::Surface, operation).with_cause(&err);
                if let Some(target) = target {
                    out = out.with_target(target);
                }
                out
            }
        }
    }

    /// Whether the retry layer may try the operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::ElementNotFound
                | ErrorKind::NoBoundingBox
                | ErrorKind::Timeout
                | ErrorKind::Surface
        )
    }

    /// Human-readable sentence safe for operator-facing output.
    pub fn user_message(&self) -> String {
        let family = self
            .operation
            .split(['.', ':', '_'])
            .next()
            .unwrap_or_default();
        match family {
            "click" => "Could not complete a click on the page.".to_string(),
            "type" => "Could not enter text on the page.".to_string(),
            "scroll" => "Could not scroll the page.".to_string(),
            "move" | "locate" => "Could not reach an element on the page.".to_string(),
            _ => "A page interaction could not be completed.".to_string(),
        }
    }

    /// Structured log payload: always `operation`, `kind`, `timestamp`, and
    /// `user_message`; `target`, `attempts`, `cause`, and `context` only
    /// when present. Context values are redacted, never raw credentials.
    pub fn to_log_context(&self) -> Value {
        let mut map = Map::new();
        map.insert("operation".to_string(), Value::from(self.operation.clone()));
        map.insert("kind".to_string(), Value::from(self.kind.as_str()));
        map.insert(
            "timestamp".to_string(),
            Value::from(self.timestamp.to_rfc3339()),
        );
        map.insert("user_message".to_string(), Value::from(self.user_message()));
        if let Some(target) = &self.target {
            map.insert("target".to_string(), Value::from(target.clone()));
        }
        if let Some(attempts) = self.attempts {
            map.insert("attempts".to_string(), Value::from(attempts));
        }
        if let Some(cause) = &self.cause {
            map.insert("cause".to_string(), Value::from(cause.clone()));
        }
        if let Some(context) = &self.context {
            map.insert(
                "context".to_string(),
                Value::Object(redact::context(context.clone())),
            );
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_operation_fails_fast_as_validation() {
        let err = InteractionError::new(ErrorKind::Timeout, "   ");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.operation, "error.construct");
        assert!(err.cause.as_deref().unwrap().contains("blank operation"));
    }

    #[test]
    fn log_context_always_has_operation_and_timestamp() {
        let err = InteractionError::retries_exhausted("click", None, 3, None);
        let ctx = err.to_log_context();
        assert_eq!(ctx["operation"], "click");
        assert!(ctx["timestamp"].is_string());
        assert_eq!(ctx["attempts"], 3);
        assert!(ctx.get("target").is_none());
    }

    #[test]
    fn log_context_includes_target_only_when_supplied() {
        let err = InteractionError::retries_exhausted("click", Some("#a"), 2, None);
        let ctx = err.to_log_context();
        assert_eq!(ctx["target"], "#a");
    }

    #[test]
    fn log_context_redacts_credential_keys() {
        let mut context = Map::new();
        context.insert("password".to_string(), Value::from("hunter2"));
        context.insert("field".to_string(), Value::from("#login"));
        let err = InteractionError::new(ErrorKind::Surface, "type").with_context(context);

        let ctx = err.to_log_context();
        assert_eq!(ctx["context"]["password"], "[redacted]");
        assert_eq!(ctx["context"]["field"], "#login");
    }

    #[test]
    fn user_message_keyed_by_operation_family() {
        assert!(InteractionError::new(ErrorKind::Timeout, "click")
            .user_message()
            .contains("click"));
        assert!(InteractionError::new(ErrorKind::Timeout, "type.char")
            .user_message()
            .contains("text"));
        let fallback = InteractionError::new(ErrorKind::Timeout, "frobnicate").user_message();
        assert_eq!(fallback, "A page interaction could not be completed.");
    }

    #[test]
    fn surface_timeout_maps_to_timeout_kind() {
        let err = InteractionError::surface(
            "type",
            Some("#field"),
            SurfaceError::Timeout {
                selector: "#field".to_string(),
                timeout_ms: 5000,
            },
        );
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.is_retryable());
        assert_eq!(err.to_log_context()["context"]["timeout_ms"], 5000);
    }

    #[test]
    fn retryability_classification() {
        assert!(InteractionError::element_not_found("#a").is_retryable());
        assert!(InteractionError::no_bounding_box("#a").is_retryable());
        assert!(!InteractionError::validation("bad").is_retryable());
        assert!(!InteractionError::invalid_action("hover").is_retryable());
        assert!(!InteractionError::retries_exhausted("click", None, 3, None).is_retryable());
    }
}
