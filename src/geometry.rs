//! Planar geometry helpers for river layout
//!
//! Map units are grid cells: cell (x, y) covers [x, x+1) × [y, y+1) and its
//! center sits at (x + 0.5, y + 0.5). Headings are in degrees, 0° = +x,
//! 90° = +y.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point or direction in map units
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along a heading in degrees
    pub fn from_heading(degrees: f32) -> Self {
        let rad = degrees.to_radians();
        Self::new(rad.cos(), rad.sin())
    }

    /// Center of grid cell (x, y)
    pub fn cell_center(x: usize, y: usize) -> Self {
        Self::new(x as f32 + 0.5, y as f32 + 0.5)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit-length copy, or zero if the vector is (nearly) zero
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 1e-6 {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Counter-clockwise perpendicular
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Rotate by an angle in degrees
    pub fn rotated(self, degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Heading of this direction in degrees, in (-180, 180]
    pub fn heading_deg(self) -> f32 {
        self.y.atan2(self.x).to_degrees()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Grid cell containing this point, if non-negative
    pub fn to_cell(self) -> Option<(usize, usize)> {
        if self.x < 0.0 || self.y < 0.0 || !self.is_finite() {
            return None;
        }
        Some((self.x.floor() as usize, self.y.floor() as usize))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned rectangle [min, max]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Rectangle covering a whole grid of `width` × `height` cells
    pub fn from_size(width: usize, height: usize) -> Self {
        Self::new(Vec2::ZERO, Vec2::new(width as f32, height as f32))
    }

    pub fn center(&self) -> Vec2 {
        self.min.lerp(self.max, 0.5)
    }

    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Inclusive containment test
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Intersect the infinite line `origin + s * dir` with this rectangle.
    ///
    /// Returns the entry and exit parameters `(s_min, s_max)` using slab
    /// clipping, or `None` when the line misses the rectangle or degenerates
    /// to a point (zero/non-finite direction, empty rectangle).
    pub fn clip_line(&self, origin: Vec2, dir: Vec2) -> Option<(f32, f32)> {
        if self.is_empty() || !dir.is_finite() || !origin.is_finite() {
            return None;
        }
        if dir.length_squared() < 1e-12 {
            return None;
        }

        let mut s_min = f32::NEG_INFINITY;
        let mut s_max = f32::INFINITY;

        for (o, d, lo, hi) in [
            (origin.x, dir.x, self.min.x, self.max.x),
            (origin.y, dir.y, self.min.y, self.max.y),
        ] {
            if d.abs() < 1e-9 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let a = (lo - o) / d;
            let b = (hi - o) / d;
            s_min = s_min.max(a.min(b));
            s_max = s_max.min(a.max(b));
        }

        if s_max - s_min > 1e-4 {
            Some((s_min, s_max))
        } else {
            None
        }
    }
}

/// Closest point on segment `a`-`b` to `p`.
///
/// Returns `(distance, u)` where `u` in [0, 1] is the position along the
/// segment of the closest point.
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (f32, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let u = if len_sq > 1e-12 {
        ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = a + ab * u;
    (p.distance(closest), u)
}

/// Smallest absolute difference between two headings, in degrees [0, 180]
pub fn heading_difference(a: f32, b: f32) -> f32 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}
