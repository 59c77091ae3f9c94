//! Landmark to screen-pixel mapping.
//!
//! The mapping is center-relative, sensitivity-scaled and clamped:
//!
//! 1. displacement from the frame center, `dx = 0.5 - x` (mirrored so the
//!    pointer follows a hand facing the camera) and `dy = y - 0.5`
//! 2. each axis multiplied by its sensitivity
//! 3. each axis clamped to `[-0.5, 0.5]`
//! 4. converted to pixels around the viewport center
//!
//! Clamping guarantees the pointer stays inside the viewport for any
//! sensitivity, which the direct `x * width` form does not.

use serde::{Deserialize, Serialize};

use crate::landmark::Landmark;

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, point: ScreenPoint) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

/// A position in screen pixels, origin at the top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Displacement amplification per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensitivity {
    pub x: f32,
    pub y: f32,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

/// Largest displacement from center in normalized units.
const HALF_SPAN: f32 = 0.5;

/// Map a landmark to screen pixels.
#[must_use]
pub fn map_landmark(
    landmark: Landmark,
    sensitivity: Sensitivity,
    viewport: Viewport,
) -> ScreenPoint {
    let dx = ((HALF_SPAN - landmark.x) * sensitivity.x).clamp(-HALF_SPAN, HALF_SPAN);
    let dy = ((landmark.y - HALF_SPAN) * sensitivity.y).clamp(-HALF_SPAN, HALF_SPAN);

    ScreenPoint {
        x: viewport.width / 2.0 + dx * viewport.width,
        y: viewport.height / 2.0 + dy * viewport.height,
    }
}
