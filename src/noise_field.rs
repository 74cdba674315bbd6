//! Composable 2D noise fields
//!
//! A `NoiseField` is a small expression tree over `noise::Perlin` evaluated by
//! a recursive interpreter. Every node is a closed enum variant, so sampling in
//! the rasterizer inner loop is a match, not a virtual call, and the result is a
//! pure function of `(x, y)`.

use noise::{NoiseFn, Perlin};

use crate::geometry::Vec2;

/// Perlin lattice coordinates beyond this cannot be floored to an integer cell
const PERLIN_COORD_LIMIT: f64 = 1.0e15;

#[derive(Clone, Debug)]
pub enum NoiseField {
    /// Perlin gradient noise, roughly in [-1, 1]
    Perlin { source: Perlin, frequency: f64 },
    Constant(f64),
    /// Shift the sampling position by `(dx, dy)` before sampling `source`
    Translate { source: Box<NoiseField>, dx: f64, dy: f64 },
    /// Rotate the sampling position about the origin
    Rotate { source: Box<NoiseField>, cos: f64, sin: f64 },
    /// Divide the sampling position per axis (larger scale = stretched pattern)
    Scale { source: Box<NoiseField>, sx: f64, sy: f64 },
    /// Euclidean distance from a fixed point
    DistanceFromPoint { x: f64, y: f64 },
    Abs(Box<NoiseField>),
    /// `sign(v) * |v|^exponent`
    Power { source: Box<NoiseField>, exponent: f64 },
    Add(Box<NoiseField>, Box<NoiseField>),
    Multiply(Box<NoiseField>, Box<NoiseField>),
    /// Linear blend from `a` to `b`, weighted by `control` clamped to [0, 1]
    Blend {
        a: Box<NoiseField>,
        b: Box<NoiseField>,
        control: Box<NoiseField>,
    },
    /// Polynomial smooth minimum with blend radius `k`
    SmoothMin {
        a: Box<NoiseField>,
        b: Box<NoiseField>,
        k: f64,
    },
    Clamp { source: Box<NoiseField>, min: f64, max: f64 },
}

impl NoiseField {
    pub fn perlin(seed: u32, frequency: f64) -> Self {
        NoiseField::Perlin {
            source: Perlin::new(seed),
            frequency,
        }
    }

    pub fn constant(value: f64) -> Self {
        NoiseField::Constant(value)
    }

    pub fn distance_from(point: Vec2) -> Self {
        NoiseField::DistanceFromPoint {
            x: point.x as f64,
            y: point.y as f64,
        }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        NoiseField::Translate {
            source: Box::new(self),
            dx,
            dy,
        }
    }

    /// Rotate the pattern by `degrees`
    pub fn rotate(self, degrees: f64) -> Self {
        // Sampling position is rotated by the inverse angle
        let rad = (-degrees).to_radians();
        NoiseField::Rotate {
            source: Box::new(self),
            cos: rad.cos(),
            sin: rad.sin(),
        }
    }

    pub fn scale(self, sx: f64, sy: f64) -> Self {
        NoiseField::Scale {
            source: Box::new(self),
            sx,
            sy,
        }
    }

    pub fn abs(self) -> Self {
        NoiseField::Abs(Box::new(self))
    }

    pub fn power(self, exponent: f64) -> Self {
        NoiseField::Power {
            source: Box::new(self),
            exponent,
        }
    }

    pub fn add(self, other: NoiseField) -> Self {
        NoiseField::Add(Box::new(self), Box::new(other))
    }

    pub fn multiply(self, other: NoiseField) -> Self {
        NoiseField::Multiply(Box::new(self), Box::new(other))
    }

    pub fn blend(self, other: NoiseField, control: NoiseField) -> Self {
        NoiseField::Blend {
            a: Box::new(self),
            b: Box::new(other),
            control: Box::new(control),
        }
    }

    pub fn smooth_min(self, other: NoiseField, k: f64) -> Self {
        NoiseField::SmoothMin {
            a: Box::new(self),
            b: Box::new(other),
            k,
        }
    }

    pub fn clamp(self, min: f64, max: f64) -> Self {
        NoiseField::Clamp {
            source: Box::new(self),
            min,
            max,
        }
    }

    /// Affine remap `v * mul + offset`
    pub fn remap(self, mul: f64, offset: f64) -> Self {
        self.multiply(NoiseField::Constant(mul))
            .add(NoiseField::Constant(offset))
    }

    /// Evaluate the field at a position
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        match self {
            NoiseField::Perlin { source, frequency } => {
                let (px, py) = (x * frequency, y * frequency);
                if px.abs() < PERLIN_COORD_LIMIT && py.abs() < PERLIN_COORD_LIMIT {
                    source.get([px, py])
                } else {
                    0.0
                }
            }
            NoiseField::Constant(v) => *v,
            NoiseField::Translate { source, dx, dy } => source.sample(x + dx, y + dy),
            NoiseField::Rotate { source, cos, sin } => {
                source.sample(x * cos - y * sin, x * sin + y * cos)
            }
            NoiseField::Scale { source, sx, sy } => {
                let sx = if sx.abs() > 1e-12 { *sx } else { 1.0 };
                let sy = if sy.abs() > 1e-12 { *sy } else { 1.0 };
                source.sample(x / sx, y / sy)
            }
            NoiseField::DistanceFromPoint { x: px, y: py } => {
                ((x - px).powi(2) + (y - py).powi(2)).sqrt()
            }
            NoiseField::Abs(source) => source.sample(x, y).abs(),
            NoiseField::Power { source, exponent } => {
                let v = source.sample(x, y);
                v.signum() * v.abs().powf(*exponent)
            }
            NoiseField::Add(a, b) => a.sample(x, y) + b.sample(x, y),
            NoiseField::Multiply(a, b) => a.sample(x, y) * b.sample(x, y),
            NoiseField::Blend { a, b, control } => {
                let t = control.sample(x, y).clamp(0.0, 1.0);
                let va = a.sample(x, y);
                va + (b.sample(x, y) - va) * t
            }
            NoiseField::SmoothMin { a, b, k } => smooth_min(a.sample(x, y), b.sample(x, y), *k),
            NoiseField::Clamp { source, min, max } => source.sample(x, y).clamp(*min, *max),
        }
    }

    pub fn sample_at(&self, p: Vec2) -> f64 {
        self.sample(p.x as f64, p.y as f64)
    }
}

/// Polynomial smooth minimum (equals `min` when `k <= 0`)
fn smooth_min(a: f64, b: f64, k: f64) -> f64 {
    if k <= 0.0 {
        return a.min(b);
    }
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
    b + (a - b) * h - k * h * (1.0 - h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perlin_is_pure() {
        let field = NoiseField::perlin(42, 0.05).translate(3.3, 1.7);
        let a = field.sample(12.25, 80.5);
        let b = field.sample(12.25, 80.5);
        assert_eq!(a.to_bits(), b.to_bits());
        assert!(a.abs() <= 1.5);
    }

    #[test]
    fn test_perlin_out_of_range_is_flat() {
        let field = NoiseField::perlin(1, 1.0e30);
        assert_eq!(field.sample(3.0, 4.0), 0.0);

        let rotated = NoiseField::perlin(1, 0.1).rotate(f64::NAN);
        assert_eq!(rotated.sample(3.0, 4.0), 0.0);
        assert_eq!(NoiseField::perlin(1, 0.1).sample(f64::INFINITY, 0.0), 0.0);
    }

    #[test]
    fn test_combinators() {
        let dist = NoiseField::distance_from(Vec2::new(3.0, 4.0));
        assert!((dist.sample(0.0, 0.0) - 5.0).abs() < 1e-9);

        let abs = NoiseField::constant(-0.25).abs();
        assert_eq!(abs.sample(0.0, 0.0), 0.25);

        let pow = NoiseField::constant(-4.0).power(0.5);
        assert!((pow.sample(0.0, 0.0) + 2.0).abs() < 1e-9);

        let blend = NoiseField::constant(0.0).blend(NoiseField::constant(10.0), NoiseField::constant(0.3));
        assert!((blend.sample(1.0, 1.0) - 3.0).abs() < 1e-9);

        let remap = NoiseField::constant(2.0).remap(3.0, 1.0);
        assert_eq!(remap.sample(0.0, 0.0), 7.0);

        let clamped = NoiseField::constant(5.0).clamp(-1.0, 1.0);
        assert_eq!(clamped.sample(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_smooth_min_bounds() {
        let field = NoiseField::constant(1.0).smooth_min(NoiseField::constant(1.2), 0.5);
        let v = field.sample(0.0, 0.0);
        assert!(v <= 1.0, "smooth min never exceeds the hard min, got {}", v);
        assert!(v > 0.8);

        let hard = NoiseField::constant(1.0).smooth_min(NoiseField::constant(3.0), 0.0);
        assert_eq!(hard.sample(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_rotate_and_scale_move_pattern() {
        let dist = NoiseField::distance_from(Vec2::new(10.0, 0.0));
        // Rotating the pattern by 90° moves the point from +x to +y
        let rotated = dist.clone().rotate(90.0);
        assert!(rotated.sample(0.0, 10.0).abs() < 1e-9);

        // Scaling by 2 moves the point from x=10 to x=20
        let scaled = dist.scale(2.0, 1.0);
        assert!(scaled.sample(20.0, 0.0).abs() < 1e-9);
    }
}
