use serde::{Deserialize, Serialize};

/// Top-left anchor of an axis-aligned box in play-field coordinates.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Returns true if two boxes of the same `width` x `height`, anchored at `a`
/// and `b`, share some area. Boxes that only touch along an edge do not
/// intersect.
pub fn intersects(a: Point, b: Point, width: f32, height: f32) -> bool {
    a.x < b.x + width && a.x + width > b.x && a.y < b.y + height && a.y + height > b.y
}

/// Linear interpolation from `from` to `to` by `alpha` in [0, 1].
pub fn lerp(from: f32, to: f32, alpha: f32) -> f32 {
    (1.0 - alpha) * from + alpha * to
}
