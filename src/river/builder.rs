//! River graph construction
//!
//! Two layouts are supported:
//! - **Single**: one straight trunk between the two points where a line
//!   through the grid center at the flow heading meets the grid boundary.
//! - **Delta**: a trunk grown part of the way toward the coast, followed by
//!   stochastic branching until every branch reaches the ocean or leaves the
//!   grid.
//!
//! All randomness comes from the RNG handed in by the caller, drawn in a fixed
//! order, so a given seed always produces the same graph.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::grid::MapGrid;

use super::graph::{NodeId, RiverGraph};
use super::params::RiverParams;

/// Layout of the generated river network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RiverMode {
    /// One channel crossing the whole grid
    #[default]
    Single,
    /// Branching channels fanning out toward the coast
    Delta,
}

impl RiverMode {
    pub fn all() -> &'static [Self] {
        &[Self::Single, Self::Delta]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Single => "Single winding channel from edge to edge",
            Self::Delta => "Branching delta ending in the ocean",
        }
    }
}

impl fmt::Display for RiverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

impl FromStr for RiverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "river" => Ok(Self::Single),
            "delta" => Ok(Self::Delta),
            other => Err(format!("unknown river mode '{}'", other)),
        }
    }
}

/// Counters for the local fallbacks taken while building
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// No boundary intersection for the heading; straight fallback used
    pub boundary_fallbacks: usize,
    /// Splits that would have produced a channel below the minimum width
    pub degenerate_splits: usize,
    /// Base widths raised to the minimum channel width at the root
    pub width_clamps: usize,
}

/// Heading the pass actually flows along; non-finite headings fall back to 0.
pub fn usable_heading(heading: f32) -> f32 {
    if heading.is_finite() {
        heading
    } else {
        0.0
    }
}

pub struct RiverGraphBuilder<'a> {
    grid: &'a MapGrid,
    params: &'a RiverParams,
}

impl<'a> RiverGraphBuilder<'a> {
    pub fn new(grid: &'a MapGrid, params: &'a RiverParams) -> Self {
        Self { grid, params }
    }

    /// Build a river graph flowing along `heading` (degrees).
    pub fn build<R: Rng + ?Sized>(
        &self,
        mode: RiverMode,
        heading: f32,
        base_width: f32,
        rng: &mut R,
    ) -> (RiverGraph, BuildStats) {
        let mut stats = BuildStats::default();

        if !heading.is_finite() {
            tracing::warn!(target: "river_generator::graph", heading, "graph.heading_invalid fallback=0");
            stats.boundary_fallbacks += 1;
        }
        let heading = usable_heading(heading);

        let width = if base_width.is_finite() && base_width >= self.params.min_channel_width {
            base_width
        } else {
            tracing::warn!(
                target: "river_generator::graph",
                base_width,
                min = self.params.min_channel_width,
                "graph.base_width_clamped"
            );
            stats.width_clamps += 1;
            self.params.min_channel_width
        };

        let graph = match mode {
            RiverMode::Single => self.build_single(heading, width, rng, &mut stats),
            RiverMode::Delta => self.build_delta(heading, width, rng, &mut stats),
        };

        tracing::debug!(
            target: "river_generator::graph",
            %mode,
            nodes = graph.len(),
            leaves = graph.leaves().len(),
            max_depth = graph.max_depth(),
            total_length = graph.total_length(),
            degenerate_splits = stats.degenerate_splits,
            "graph.built"
        );

        (graph, stats)
    }

    /// Entry and exit points where the heading line through the grid center
    /// crosses the boundary, ordered so that entry -> exit runs downstream.
    pub fn boundary_span(&self, heading: f32, stats: &mut BuildStats) -> (Vec2, Vec2) {
        let bounds = self.grid.bounds();
        let center = bounds.center();
        let dir = Vec2::from_heading(heading);

        if let Some((s_min, s_max)) = bounds.clip_line(center, dir) {
            let mut start = center + dir * s_min;
            let mut end = center + dir * s_max;
            if (end - start).dot(dir) < 0.0 {
                std::mem::swap(&mut start, &mut end);
            }
            return (start, end);
        }

        tracing::warn!(
            target: "river_generator::graph",
            heading,
            width = self.grid.width,
            height = self.grid.height,
            "graph.boundary_fallback"
        );
        stats.boundary_fallbacks += 1;

        let dir = if dir.is_finite() && dir.length_squared() > 0.5 {
            dir
        } else {
            Vec2::new(1.0, 0.0)
        };
        let half = (self.grid.width.max(self.grid.height) as f32 / 2.0).max(1.0);
        (center - dir * half, center + dir * half)
    }

    fn build_single<R: Rng + ?Sized>(
        &self,
        heading: f32,
        width: f32,
        rng: &mut R,
        stats: &mut BuildStats,
    ) -> RiverGraph {
        let (start, end) = self.boundary_span(heading, stats);
        let mut graph = RiverGraph::new();
        graph.add_root(start, end, width, bend_offset(rng));
        graph
    }

    fn build_delta<R: Rng + ?Sized>(
        &self,
        coast_heading: f32,
        width: f32,
        rng: &mut R,
        stats: &mut BuildStats,
    ) -> RiverGraph {
        let p = self.params;
        let (entry, exit) = self.boundary_span(coast_heading, stats);
        let span = entry.distance(exit);
        let dir = (exit - entry).normalized();
        let trunk_heading = if dir == Vec2::ZERO { coast_heading } else { dir.heading_deg() };

        let fraction = uniform(rng, p.trunk_fraction_min, p.trunk_fraction_max);
        let trunk_end = entry + Vec2::from_heading(trunk_heading) * (span * fraction);

        let mut graph = RiverGraph::new();
        let root = graph.add_root(entry, trunk_end, width, bend_offset(rng));

        // Breadth-first growth keeps the RNG draw order independent of tree shape
        let mut queue: VecDeque<(NodeId, f32)> = VecDeque::new();
        queue.push_back((root, trunk_heading));

        while let Some((id, heading)) = queue.pop_front() {
            let (end, parent_width, depth) = {
                let node = graph.node(id);
                (node.end, node.width, node.depth)
            };
            if self.terminates(end) || depth >= p.max_depth {
                continue;
            }

            if rng.gen::<f32>() < p.single_branch_chance {
                let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                let offset = uniform(rng, p.branch_angle_min, p.branch_angle_max);
                let child_heading = self.limit_heading(heading + side * offset, trunk_heading);
                let child = self.grow(&mut graph, id, child_heading, parent_width, rng);
                queue.push_back((child, child_heading));
                continue;
            }

            let base = uniform(rng, p.branch_angle_min, p.branch_angle_max);
            let skew = uniform(rng, 0.0, p.branch_skew_max);
            let (left_offset, right_offset) = if rng.gen_bool(0.5) {
                (base + skew, base)
            } else {
                (base, base + skew)
            };
            let ratio = uniform(rng, p.split_ratio_min, p.split_ratio_max);
            let left_width = parent_width * ratio;
            let right_width = parent_width - left_width;
            let left_heading = self.limit_heading(heading - left_offset, trunk_heading);
            let right_heading = self.limit_heading(heading + right_offset, trunk_heading);

            if left_width.min(right_width) < p.min_channel_width {
                // The narrow side is never created; the wider side carries the full flow
                stats.degenerate_splits += 1;
                let child_heading = if left_width >= right_width { left_heading } else { right_heading };
                let child = self.grow(&mut graph, id, child_heading, parent_width, rng);
                queue.push_back((child, child_heading));
                continue;
            }

            let left = self.grow(&mut graph, id, left_heading, left_width, rng);
            let right = self.grow(&mut graph, id, right_heading, right_width, rng);
            queue.push_back((left, left_heading));
            queue.push_back((right, right_heading));
        }

        graph
    }

    /// Add one child of random length heading away from `parent`'s end
    fn grow<R: Rng + ?Sized>(
        &self,
        graph: &mut RiverGraph,
        parent: NodeId,
        heading: f32,
        width: f32,
        rng: &mut R,
    ) -> NodeId {
        let length = uniform(rng, self.params.segment_length_min, self.params.segment_length_max);
        let end = graph.node(parent).end + Vec2::from_heading(heading) * length;
        graph.add_child(parent, end, width, bend_offset(rng))
    }

    /// A branch stops once it leaves the grid or reaches the ocean
    fn terminates(&self, p: Vec2) -> bool {
        !self.grid.contains(p) || self.grid.is_ocean_at(p)
    }

    /// Keep `heading` within the allowed deviation from the coast heading, so
    /// every segment makes progress toward the coast.
    fn limit_heading(&self, heading: f32, coast_heading: f32) -> f32 {
        let max = self.params.max_heading_deviation;
        let diff = (heading - coast_heading + 180.0).rem_euclid(360.0) - 180.0;
        coast_heading + diff.clamp(-max, max)
    }
}

/// Uniform draw in `[lo, hi]`; always consumes exactly one value from the RNG
fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    let u: f32 = rng.gen();
    lo + (hi - lo) * u
}

/// Random position in the bend noise field, so each channel bends differently
fn bend_offset<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::new(rng.gen_range(0.0..4096.0), rng.gen_range(0.0..4096.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::heading_difference;
    use crate::grid::TerrainType;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_single_spans_grid_downstream() {
        let grid = MapGrid::new(300, 300, TerrainType::Soil);
        let params = RiverParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let (graph, stats) = RiverGraphBuilder::new(&grid, &params).build(RiverMode::Single, 90.0, 10.0, &mut rng);

        assert_eq!(graph.len(), 1);
        assert_eq!(stats, BuildStats::default());
        let root = graph.node(graph.roots()[0]);
        assert!(root.start.y.abs() < 1e-3, "start should be on the top edge: {:?}", root.start);
        assert!((root.end.y - 300.0).abs() < 1e-3, "end should be on the bottom edge: {:?}", root.end);
        assert!((root.width - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_reversed_heading_flows_upward() {
        let grid = MapGrid::new(200, 100, TerrainType::Soil);
        let params = RiverParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (graph, _) = RiverGraphBuilder::new(&grid, &params).build(RiverMode::Single, 270.0, 10.0, &mut rng);

        let root = graph.node(graph.roots()[0]);
        assert!(root.start.y > root.end.y);
        assert!(heading_difference(root.heading(), 270.0) < 1e-3);
    }

    #[test]
    fn test_degenerate_geometry_falls_back() {
        let grid = MapGrid::new(0, 50, TerrainType::Soil);
        let params = RiverParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (graph, stats) = RiverGraphBuilder::new(&grid, &params).build(RiverMode::Single, 45.0, 10.0, &mut rng);
        assert_eq!(stats.boundary_fallbacks, 1);
        assert_eq!(graph.len(), 1);

        let grid = MapGrid::new(50, 50, TerrainType::Soil);
        let (graph, stats) = RiverGraphBuilder::new(&grid, &params).build(RiverMode::Single, f32::NAN, 10.0, &mut rng);
        assert_eq!(stats.boundary_fallbacks, 1);
        assert!(graph.node(graph.roots()[0]).start.is_finite());
        assert_eq!(usable_heading(f32::NAN), 0.0);
        assert_eq!(usable_heading(f32::INFINITY), 0.0);
        assert_eq!(usable_heading(135.0), 135.0);
    }

    #[test]
    fn test_narrow_base_width_is_counted() {
        let grid = MapGrid::new(100, 100, TerrainType::Soil);
        let params = RiverParams::default();
        let builder = RiverGraphBuilder::new(&grid, &params);

        let (graph, stats) = builder.build(RiverMode::Single, 90.0, 1.0, &mut ChaCha8Rng::seed_from_u64(4));
        assert_eq!(stats.width_clamps, 1);
        assert_eq!(graph.node(graph.roots()[0]).width, params.min_channel_width);

        let (_, stats) = builder.build(RiverMode::Single, 90.0, f32::NAN, &mut ChaCha8Rng::seed_from_u64(4));
        assert_eq!(stats.width_clamps, 1);

        let (_, stats) = builder.build(RiverMode::Single, 90.0, 12.0, &mut ChaCha8Rng::seed_from_u64(4));
        assert_eq!(stats.width_clamps, 0);
    }

    #[test]
    fn test_delta_respects_width_and_depth() {
        let mut grid = MapGrid::new(400, 400, TerrainType::Soil);
        grid.paint_coast(90.0, 0.7, 20.0, 7);
        let params = RiverParams::default();

        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let (graph, _) = RiverGraphBuilder::new(&grid, &params).build(RiverMode::Delta, 90.0, 18.0, &mut rng);
            assert!(graph.len() > 1, "seed {} grew only a trunk", seed);
            graph
                .validate(params.min_channel_width)
                .unwrap_or_else(|e| panic!("seed {}: {}", seed, e));
            assert!(graph.max_depth() <= params.max_depth);
            for node in graph.nodes() {
                assert!(heading_difference(node.heading(), 90.0) <= params.max_heading_deviation + 1e-3);
            }
        }
    }

    #[test]
    fn test_delta_is_deterministic() {
        let mut grid = MapGrid::new(200, 200, TerrainType::Soil);
        grid.paint_coast(0.0, 0.6, 10.0, 1);
        let params = RiverParams::default();
        let builder = RiverGraphBuilder::new(&grid, &params);

        let a = builder.build(RiverMode::Delta, 0.0, 12.0, &mut ChaCha8Rng::seed_from_u64(99));
        let b = builder.build(RiverMode::Delta, 0.0, 12.0, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_heading_limit_wraps() {
        let grid = MapGrid::new(10, 10, TerrainType::Soil);
        let params = RiverParams::default();
        let builder = RiverGraphBuilder::new(&grid, &params);
        assert!((builder.limit_heading(10.0, 0.0) - 10.0).abs() < 1e-4);
        assert!((builder.limit_heading(80.0, 0.0) - 45.0).abs() < 1e-4);
        assert!((builder.limit_heading(-100.0, 0.0) + 45.0).abs() < 1e-4);
        assert!((builder.limit_heading(350.0, 0.0) + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_mode_parsing() {
        for mode in RiverMode::all() {
            assert_eq!(mode.to_string().parse::<RiverMode>().unwrap(), *mode);
        }
        assert!("lake".parse::<RiverMode>().is_err());
    }
}
