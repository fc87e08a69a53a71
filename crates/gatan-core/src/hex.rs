//! Hex geometry using axial coordinates (q, r).
//!
//! The board is laid out in pointy-top orientation. Vertices and edges are not
//! addressed through axial arithmetic; instead the board generator projects
//! every hex corner into the plane and deduplicates the resulting points (see
//! [`PointKey`]). This module only provides the projection math.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Hex side length (and circumradius) used for board generation.
pub const HEX_SIZE: f64 = 40.0;

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Convert to pixel coordinates (center of hex)
    /// Uses pointy-top orientation with the given hex size (radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }

    /// The six corner points of this hex, clockwise starting from the top.
    pub fn corners(&self, hex_size: f64) -> [(f64, f64); 6] {
        let (cx, cy) = self.to_pixel(hex_size);
        std::array::from_fn(|i| {
            let angle = PI / 3.0 * i as f64 - PI / 2.0;
            (cx + hex_size * angle.cos(), cy + hex_size * angle.sin())
        })
    }
}

/// A planar point rounded to one decimal place, used as a dedup key.
///
/// Corner positions come out of `sin`/`cos`, so the same physical corner
/// computed from two neighbouring hexes differs in the last bits. Rounding to
/// tenths collapses them onto one key. Halves round up (towards +∞), not
/// away from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointKey {
    x_tenths: i64,
    y_tenths: i64,
}

impl PointKey {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x_tenths: round_half_up(x * 10.0),
            y_tenths: round_half_up(y * 10.0),
        }
    }

    /// The rounded point this key stands for.
    pub fn point(&self) -> (f64, f64) {
        (self.x_tenths as f64 / 10.0, self.y_tenths as f64 / 10.0)
    }
}

fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Euclidean distance between two planar points.
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
