//! Flow direction field
//!
//! Curve tangents are sampled along every channel and splatted onto nearby
//! water cells. Each cell's vector is the distance-weighted mean of the
//! tangents that reach it, so confluences blend smoothly and cells no sample
//! reaches stay zero.

use crate::geometry::Vec2;
use crate::grid::MapGrid;
use crate::tilemap::Tilemap;

use super::curve::CurveSampler;
use super::graph::RiverGraph;

/// A flow sample taken along a channel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowSample {
    pub point: Vec2,
    pub tangent: Vec2,
    pub width: f32,
}

pub struct FlowFieldBuilder<'a> {
    sampler: &'a CurveSampler,
    step: f32,
}

impl<'a> FlowFieldBuilder<'a> {
    pub fn new(sampler: &'a CurveSampler, step: f32) -> Self {
        Self { sampler, step }
    }

    /// Tangent samples along every channel of the graph
    pub fn samples(&self, graph: &RiverGraph) -> Vec<FlowSample> {
        graph
            .nodes()
            .iter()
            .flat_map(|node| {
                self.sampler
                    .samples(node, self.step)
                    .into_iter()
                    .map(move |s| FlowSample {
                        point: s.point,
                        tangent: s.tangent,
                        width: node.width,
                    })
            })
            .collect()
    }

    /// Build the per-cell flow field over the classified grid.
    pub fn build(&self, graph: &RiverGraph, grid: &MapGrid) -> Tilemap<Vec2> {
        let (width, height) = (grid.width, grid.height);
        let mut sum = Tilemap::new_with(width, height, Vec2::ZERO);
        let mut weight = Tilemap::new_with(width, height, 0.0f32);

        for sample in self.samples(graph) {
            let radius = sample.width * 1.5 / 2.0 + 1.0;
            let x0 = (sample.point.x - radius).floor().max(0.0) as usize;
            let y0 = (sample.point.y - radius).floor().max(0.0) as usize;
            let x1 = ((sample.point.x + radius).ceil().max(0.0) as usize).min(width);
            let y1 = ((sample.point.y + radius).ceil().max(0.0) as usize).min(height);

            for y in y0..y1 {
                for x in x0..x1 {
                    if !grid.terrain(x, y).is_water() {
                        continue;
                    }
                    let d = Vec2::cell_center(x, y).distance(sample.point);
                    if d > radius {
                        continue;
                    }
                    let w = 1.0 - d / (radius + 1.0);
                    *sum.get_mut(x, y) += sample.tangent * w;
                    *weight.get_mut(x, y) += w;
                }
            }
        }

        let mut flow = Tilemap::new_with(width, height, Vec2::ZERO);
        let mut cells = 0usize;
        for (x, y, &w) in weight.iter() {
            if w > 0.0 {
                flow.set(x, y, *sum.get(x, y) * (1.0 / w));
                cells += 1;
            }
        }

        tracing::debug!(target: "river_generator::flow", cells, "flow.done");
        flow
    }
}

/// Cells carrying a non-zero flow vector
pub fn flow_cells(flow: &Tilemap<Vec2>) -> usize {
    flow.count(|v| *v != Vec2::ZERO)
}
