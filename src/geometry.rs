//! Geometry shared by the drag controller and the placement resolver.
//!
//! Stage coordinates are `f64` because the compositor reports pointer
//! positions with sub-pixel precision.  Actor positions and sizes are
//! integral pixels.

use serde::{Deserialize, Serialize};

/// A pointer position in stage coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Express this point relative to `origin`.
    pub fn relative_to(self, origin: &Rect) -> Point {
        Point {
            x: self.x - origin.x as f64,
            y: self.y - origin.y as f64,
        }
    }
}

/// An axis-aligned rectangle: position of the top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether `p` lies inside the rectangle.
    ///
    /// All four edges are inclusive: a point exactly on the right or bottom
    /// edge is still inside.
    pub fn contains(&self, p: Point) -> bool {
        let left = self.x as f64;
        let top = self.y as f64;
        let right = left + self.width as f64;
        let bottom = top + self.height as f64;
        p.x >= left && p.x <= right && p.y >= top && p.y <= bottom
    }

    /// Area in square pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Where the pointer grabbed a window, as a fraction of the window's size.
///
/// Both components are in `[0.0, 1.0]`.  Keeping the anchor fractional
/// (rather than a pixel offset) keeps the grab point stable when the window
/// changes size while it is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Anchor {
    pub fx: f64,
    pub fy: f64,
}

impl Anchor {
    /// Compute the anchor of `pointer` inside `window`.
    ///
    /// Components are clamped to `[0, 1]`; a degenerate axis (zero width or
    /// height) anchors at `0`.
    pub fn from_pointer(pointer: Point, window: &Rect) -> Self {
        let rel = pointer.relative_to(window);
        Self {
            fx: fraction(rel.x, window.width),
            fy: fraction(rel.y, window.height),
        }
    }

    /// Top-left position that keeps this anchor under `pointer` for a window
    /// of the given size, rounded to the nearest pixel.
    pub fn position_under(&self, pointer: Point, width: u32, height: u32) -> (i32, i32) {
        (
            round_half_up(pointer.x - width as f64 * self.fx),
            round_half_up(pointer.y - height as f64 * self.fy),
        )
    }
}

/// Nearest integer, with `.5` ties going towards positive infinity on both
/// sides of zero (`-12.5` becomes `-12`).
fn round_half_up(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

fn fraction(offset: f64, extent: u32) -> f64 {
    if extent == 0 {
        return 0.0;
    }
    (offset / extent as f64).clamp(0.0, 1.0)
}

/// A physical monitor as reported by the workspace manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    /// Index of the monitor, stable for the lifetime of the layout.
    pub index: usize,
    /// Full monitor bounds on the stage.
    pub bounds: Rect,
    /// Whether this is the primary monitor.
    #[serde(default)]
    pub primary: bool,
}

/// Find the monitor whose bounds contain `pointer`.
///
/// Monitors share edges on a typical desktop, so the first match in list
/// order wins.  Returns `None` if the pointer is outside every monitor.
pub fn monitor_at_point(monitors: &[MonitorInfo], pointer: Point) -> Option<&MonitorInfo> {
    monitors.iter().find(|m| m.bounds.contains(pointer))
}
