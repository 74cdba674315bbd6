//! Depth field rasterization
//!
//! Each node is stamped into its own buffer over the padded bounding box of
//! its curve; the buffers are then reduced into one field with `max`. Because
//! `max` is commutative and associative the result does not depend on the
//! order nodes are visited in. Cells outside every node's reach keep the
//! `NO_DEPTH` sentinel.

use crate::geometry::{closest_point_on_segment, Vec2};
use crate::noise_field::NoiseField;
use crate::tilemap::Tilemap;

use super::curve::CurveSampler;
use super::graph::{RiverGraph, RiverNode};
use super::params::RiverParams;

/// Depth assigned to cells no channel reaches
pub const NO_DEPTH: f32 = -1.0e9;

/// Authoritative per-cell depth, positive inside a channel
#[derive(Clone, Debug, PartialEq)]
pub struct DepthField {
    pub depth: Tilemap<f32>,
    /// Width of the channel that produced each cell's depth (0 where unreached)
    pub channel_width: Tilemap<f32>,
}

impl DepthField {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            depth: Tilemap::new_with(width, height, NO_DEPTH),
            channel_width: Tilemap::new_with(width, height, 0.0),
        }
    }

    pub fn width(&self) -> usize {
        self.depth.width
    }

    pub fn height(&self) -> usize {
        self.depth.height
    }

    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        *self.depth.get(x, y)
    }

    pub fn channel_width_at(&self, x: usize, y: usize) -> f32 {
        *self.channel_width.get(x, y)
    }

    /// Cells strictly inside a channel
    pub fn channel_cells(&self) -> usize {
        self.depth.count(|d| *d > 0.0)
    }

    /// Deepest and shallowest reached depth
    pub fn range(&self) -> Option<(f32, f32)> {
        self.depth.min_max_above(NO_DEPTH)
    }

    /// Fold one node buffer into the field
    fn absorb(&mut self, buffer: &NodeDepth) {
        for (bx, by, &d) in buffer.depth.iter() {
            if d <= NO_DEPTH {
                continue;
            }
            let (x, y) = (buffer.x0 + bx, buffer.y0 + by);
            let current = *self.depth.get(x, y);
            let current_width = *self.channel_width.get(x, y);
            // Ties go to the wider channel so the reduction stays order independent
            if d > current || (d == current && buffer.width > current_width) {
                self.depth.set(x, y, d);
                self.channel_width.set(x, y, buffer.width);
            }
        }
    }
}

/// Depth of one node over its padded bounding box
#[derive(Clone, Debug)]
pub struct NodeDepth {
    pub x0: usize,
    pub y0: usize,
    pub width: f32,
    pub depth: Tilemap<f32>,
}

pub struct DepthFieldRasterizer<'a> {
    sampler: &'a CurveSampler,
    width_noise: NoiseField,
    params: &'a RiverParams,
}

impl<'a> DepthFieldRasterizer<'a> {
    pub fn new(sampler: &'a CurveSampler, width_seed: u32, params: &'a RiverParams) -> Self {
        Self {
            sampler,
            width_noise: NoiseField::perlin(width_seed, params.width_noise_frequency as f64),
            params,
        }
    }

    /// Narrow channels get proportionally less width wobble
    fn width_noise_factor(&self, node: &RiverNode) -> f32 {
        (node.width / self.params.bend_reference_width).clamp(0.25, 1.0)
    }

    /// Half width of `node`'s channel at cell center `p`
    pub fn half_width_at(&self, node: &RiverNode, p: Vec2) -> f32 {
        let n = self.width_noise.sample_at(p) as f32;
        node.width / 2.0
            * (1.0 + n * self.params.width_noise_strength * self.width_noise_factor(node))
    }

    /// Stamp one node into a buffer covering its reach, clipped to the grid.
    /// Returns `None` when the node lies entirely off the grid.
    pub fn rasterize_node(&self, node: &RiverNode, width: usize, height: usize) -> Option<NodeDepth> {
        if width == 0 || height == 0 || !(node.width > 0.0) {
            return None;
        }

        let polyline: Vec<Vec2> = self
            .sampler
            .samples(node, self.params.curve_step)
            .into_iter()
            .map(|s| s.point)
            .collect();

        let max_half_width =
            node.width / 2.0 * (1.0 + self.params.width_noise_strength * self.width_noise_factor(node));
        let reach = max_half_width + self.params.bank_reach() + 1.0;

        let (mut lo, mut hi) = (polyline[0], polyline[0]);
        for p in &polyline {
            lo = Vec2::new(lo.x.min(p.x), lo.y.min(p.y));
            hi = Vec2::new(hi.x.max(p.x), hi.y.max(p.y));
        }
        let x0 = (lo.x - reach).floor().max(0.0);
        let y0 = (lo.y - reach).floor().max(0.0);
        let x1 = (hi.x + reach).ceil().min(width as f32);
        let y1 = (hi.y + reach).ceil().min(height as f32);
        if !(x1 > x0 && y1 > y0) {
            return None;
        }
        let (x0, y0) = (x0 as usize, y0 as usize);
        let (bw, bh) = (x1 as usize - x0, y1 as usize - y0);

        // Nearest distance to the sampled curve, stamped segment by segment
        let mut nearest = Tilemap::new_with(bw, bh, f32::INFINITY);
        for pair in polyline.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let sx0 = ((a.x.min(b.x) - reach).floor() as i64 - x0 as i64).max(0);
            let sy0 = ((a.y.min(b.y) - reach).floor() as i64 - y0 as i64).max(0);
            let sx1 = ((a.x.max(b.x) + reach).ceil() as i64 - x0 as i64).min(bw as i64 - 1);
            let sy1 = ((a.y.max(b.y) + reach).ceil() as i64 - y0 as i64).min(bh as i64 - 1);
            for by in sy0..=sy1 {
                for bx in sx0..=sx1 {
                    let (bx, by) = (bx as usize, by as usize);
                    let p = Vec2::cell_center(x0 + bx, y0 + by);
                    let (dist, _) = closest_point_on_segment(p, a, b);
                    let slot = nearest.get_mut(bx, by);
                    if dist < *slot {
                        *slot = dist;
                    }
                }
            }
        }

        let mut depth = Tilemap::new_with(bw, bh, NO_DEPTH);
        for (bx, by, &dist) in nearest.iter() {
            if dist > reach {
                continue;
            }
            let p = Vec2::cell_center(x0 + bx, y0 + by);
            depth.set(bx, by, self.half_width_at(node, p) - dist);
        }

        Some(NodeDepth {
            x0,
            y0,
            width: node.width,
            depth,
        })
    }

    /// Rasterize every node and reduce with `max`.
    pub fn rasterize(&self, graph: &RiverGraph, width: usize, height: usize) -> DepthField {
        // Buffers are indexed by node position in the graph arena
        let buffers: Vec<Option<NodeDepth>> = graph
            .nodes()
            .iter()
            .map(|node| self.rasterize_node(node, width, height))
            .collect();

        let mut field = DepthField::new(width, height);
        for buffer in buffers.iter().flatten() {
            field.absorb(buffer);
        }

        tracing::debug!(
            target: "river_generator::raster",
            nodes = graph.len(),
            stamped = buffers.iter().flatten().count(),
            channel_cells = field.channel_cells(),
            "raster.done"
        );
        field
    }
}
