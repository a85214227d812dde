//! Controllable surface port.
//!
//! The interaction engine never talks to a browser directly. It drives an
//! externally supplied session handle through the [`ControlSurface`] trait:
//! wait-for-selector, click, per-character typing, raw key transitions,
//! pointer moves, scrolls, element lookup, and geometry queries. The caller
//! owns the surface (and its lifecycle); the engine only issues primitives
//! against it for the duration of one dispatch call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// On-screen rectangle describing an element's position and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Geometric center of the rectangle.
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

/// Viewport dimensions reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Center of the viewport, used as the default pointer origin.
    pub fn center(&self) -> Point {
        Point {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }
}

/// Opaque handle to an element resolved by the surface.
///
/// The engine never inspects the handle; it only passes it back to the
/// surface for geometry queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

/// Mouse button for click primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl Default for MouseButton {
    fn default() -> Self {
        MouseButton::Left
    }
}

/// Options for the wait-for-selector primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitForOpts {
    /// Require the element to be visible, not merely attached.
    pub visible: bool,

    /// Surface-enforced timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Options for the click primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickOpts {
    /// Hold time between button down and up, in milliseconds.
    pub delay_ms: u64,

    /// 1 for a plain click, 2 for a double click.
    pub click_count: u8,

    /// Button to press.
    pub button: MouseButton,
}

impl Default for ClickOpts {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            click_count: 1,
            button: MouseButton::Left,
        }
    }
}

/// Errors reported by the surface itself.
///
/// The engine maps these into its own taxonomy before they cross the
/// dispatch boundary; callers of the engine never see a raw `SurfaceError`.
#[derive(Debug, Error, Clone)]
pub enum SurfaceError {
    /// Wait-for-selector deadline expired.
    #[error("wait timeout after {timeout_ms}ms: {selector}")]
    Timeout { selector: String, timeout_ms: u64 },

    /// Selector did not resolve to an element.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// The underlying session or frame went away.
    #[error("surface detached: {0}")]
    Detached(String),

    /// Transport or protocol failure.
    #[error("surface I/O error: {0}")]
    Io(String),
}

/// Primitive operations the engine issues against a browsing session.
///
/// Implementations wrap whatever automation transport the caller uses; each
/// method maps to a single primitive with no retry or pacing of its own.
/// Element-level timeouts belong to `wait_for_selector`; all other timing is
/// owned by the engine.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    /// Wait until `selector` resolves (and is visible, if requested).
    async fn wait_for_selector(&self, selector: &str, opts: WaitForOpts)
        -> Result<(), SurfaceError>;

    /// Give keyboard focus to the element at `selector`.
    async fn focus(&self, selector: &str) -> Result<(), SurfaceError>;

    /// Click the element at `selector`.
    async fn click(&self, selector: &str, opts: ClickOpts) -> Result<(), SurfaceError>;

    /// Emit a single character keystroke.
    async fn type_char(&self, ch: char) -> Result<(), SurfaceError>;

    /// Press and hold a named key (e.g. "Control").
    async fn key_down(&self, key: &str) -> Result<(), SurfaceError>;

    /// Press and release a named key (e.g. "Enter", "Backspace").
    async fn key_press(&self, key: &str) -> Result<(), SurfaceError>;

    /// Release a held key.
    async fn key_up(&self, key: &str) -> Result<(), SurfaceError>;

    /// Move the pointer to viewport coordinates.
    async fn move_pointer(&self, x: f64, y: f64) -> Result<(), SurfaceError>;

    /// Scroll the page by `delta_y` pixels (positive scrolls down).
    async fn scroll_by(&self, delta_y: f64) -> Result<(), SurfaceError>;

    /// Resolve `selector` to an element handle, or `None` when absent.
    async fn query_element(&self, selector: &str) -> Result<Option<ElementRef>, SurfaceError>;

    /// Bounding rectangle for a resolved element, or `None` when the surface
    /// cannot produce one (detached node, zero-size layout).
    async fn bounding_box(&self, element: &ElementRef) -> Result<Option<Rect>, SurfaceError>;

    /// Current viewport dimensions.
    async fn viewport_size(&self) -> Result<Viewport, SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_center_is_midpoint() {
        let rect = Rect {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 40.0,
        };
        let center = rect.center();
        assert_eq!(center.x, 60.0);
        assert_eq!(center.y, 40.0);
    }

    #[test]
    fn viewport_center() {
        let viewport = Viewport {
            width: 1280.0,
            height: 800.0,
        };
        let center = viewport.center();
        assert_eq!(center.x, 640.0);
        assert_eq!(center.y, 400.0);
    }

    #[test]
    fn click_opts_default_is_single_left_click() {
        let opts = ClickOpts::default();
        assert_eq!(opts.click_count, 1);
        assert_eq!(opts.button, MouseButton::Left);
    }
}
