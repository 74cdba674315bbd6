//! Noise-bent channel curves
//!
//! A channel is its straight chord displaced sideways by 1D noise taken along
//! the chord. The displacement is scaled by `shape(t) = 4t(1 - t)`, which is
//! zero at both ends, so consecutive channels always meet at their shared
//! joint whatever the noise does in between.

use crate::geometry::Vec2;
use crate::noise_field::NoiseField;

use super::graph::RiverNode;
use super::params::RiverParams;

/// A point on a channel curve
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveSample {
    pub t: f32,
    pub point: Vec2,
    /// Unit direction of flow at `point`
    pub tangent: Vec2,
}

/// Bend envelope: 0 at both ends, 1 at the midpoint
pub fn shape(t: f32) -> f32 {
    -4.0 * t * t + 4.0 * t
}

/// Evaluates channel curves. Holds no mutable state; every call is a pure
/// function of the node, `t` and the bend noise.
#[derive(Clone, Debug)]
pub struct CurveSampler {
    noise: NoiseField,
    amplitude: f32,
    frequency: f32,
    reference_width: f32,
}

impl CurveSampler {
    pub fn new(seed: u32, params: &RiverParams) -> Self {
        Self {
            noise: NoiseField::perlin(seed, 1.0),
            amplitude: params.bend_amplitude,
            frequency: params.bend_frequency,
            reference_width: params.bend_reference_width,
        }
    }

    /// Bend frequency for a channel; narrower channels wiggle faster
    pub fn frequency_for(&self, width: f32) -> f32 {
        let ratio = if width > 0.0 { self.reference_width / width } else { 1.0 };
        self.frequency * ratio.clamp(0.5, 4.0)
    }

    /// Peak displacement for a chord, never more than a quarter of its length
    fn amplitude_for(&self, chord_length: f32) -> f32 {
        self.amplitude.min(chord_length * 0.25)
    }

    /// Curve position at `t` in [0, 1]
    pub fn point(&self, node: &RiverNode, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let chord = node.end - node.start;
        let len = chord.length();
        let base = node.start.lerp(node.end, t);
        if len < 1e-4 {
            return base;
        }

        let normal = (chord * (1.0 / len)).perp();
        let along = len * t * self.frequency_for(node.width);
        let n = self.noise.sample(
            (along + node.bend_offset.x) as f64,
            node.bend_offset.y as f64,
        ) as f32;

        base + normal * (self.amplitude_for(len) * n * shape(t))
    }

    /// Curve position and unit tangent at `t`
    pub fn sample(&self, node: &RiverNode, t: f32) -> CurveSample {
        let t = t.clamp(0.0, 1.0);
        let point = self.point(node, t);
        let len = node.length();

        // Half a map unit either side, in parameter space
        let h = if len > 1e-4 { (0.5 / len).min(0.05) } else { 0.05 };
        let t0 = (t - h).max(0.0);
        let t1 = (t + h).min(1.0);
        let mut tangent = (self.point(node, t1) - self.point(node, t0)).normalized();
        if tangent == Vec2::ZERO {
            tangent = node.direction();
        }

        CurveSample { t, point, tangent }
    }

    /// Evenly spaced samples with roughly `step` map units between them,
    /// always including both ends.
    pub fn samples(&self, node: &RiverNode, step: f32) -> Vec<CurveSample> {
        let len = node.length();
        let count = ((len / step.max(0.05)).ceil() as usize).max(4);
        (0..=count)
            .map(|i| self.sample(node, i as f32 / count as f32))
            .collect()
    }
}
