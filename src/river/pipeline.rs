//! The river pass
//!
//! Runs every stage in order on a grid the caller hands over:
//! seeds -> graph -> merge (delta only) -> depth field -> classification -> flow.
//! The pass never fails; local fallbacks are counted in the returned
//! `RiverReport`.

use std::fmt;

use rand::Rng;

use crate::geometry::Vec2;
use crate::grid::MapGrid;
use crate::seeds::RiverSeeds;
use crate::tilemap::Tilemap;

use super::builder::{usable_heading, BuildStats, RiverGraphBuilder, RiverMode};
use super::classify::{ClassifyStats, TerrainClassifier};
use super::curve::CurveSampler;
use super::depth::{DepthField, DepthFieldRasterizer};
use super::flow::{flow_cells, FlowFieldBuilder};
use super::graph::RiverGraph;
use super::merge::{merge_endpoints, MergeStats};
use super::params::RiverParams;

/// What the enclosing map pipeline asks for
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverRequest {
    /// Downstream heading in degrees (0 = +x, 90 = +y)
    pub heading: f32,
    pub mode: RiverMode,
    /// Width of the channel where it enters the map
    pub base_width: f32,
}

/// Summary of one river pass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiverReport {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: usize,
    pub total_length: f32,
    pub boundary_fallbacks: usize,
    pub degenerate_splits: usize,
    pub width_clamps: usize,
    pub merged_endpoints: usize,
    pub pruned_nodes: usize,
    pub deep_cells: usize,
    pub shallow_cells: usize,
    pub bank_cells: usize,
    pub roofs_cleared: usize,
    pub roof_batches: usize,
    pub flow_cells: usize,
}

impl RiverReport {
    fn new(graph: &RiverGraph, build: BuildStats, merge: MergeStats, classify: ClassifyStats) -> Self {
        Self {
            nodes: graph.len(),
            leaves: graph.leaves().len(),
            max_depth: graph.max_depth(),
            total_length: graph.total_length(),
            boundary_fallbacks: build.boundary_fallbacks,
            degenerate_splits: build.degenerate_splits,
            width_clamps: build.width_clamps,
            merged_endpoints: merge.merged_endpoints,
            pruned_nodes: merge.pruned_nodes,
            deep_cells: classify.deep_cells,
            shallow_cells: classify.shallow_cells,
            bank_cells: classify.bank_cells,
            roofs_cleared: classify.roofs_cleared,
            roof_batches: classify.roof_batches,
            flow_cells: 0,
        }
    }

    pub fn water_cells(&self) -> usize {
        self.deep_cells + self.shallow_cells
    }
}

impl fmt::Display for RiverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Graph: {} nodes, {} leaves, depth {}, length {:.0}",
            self.nodes, self.leaves, self.max_depth, self.total_length
        )?;
        writeln!(
            f,
            "Fallbacks: {} boundary, {} degenerate splits, {} width clamps",
            self.boundary_fallbacks, self.degenerate_splits, self.width_clamps
        )?;
        writeln!(
            f,
            "Merge: {} endpoints snapped, {} nodes pruned",
            self.merged_endpoints, self.pruned_nodes
        )?;
        writeln!(
            f,
            "Cells: {} deep, {} shallow, {} bank",
            self.deep_cells, self.shallow_cells, self.bank_cells
        )?;
        write!(
            f,
            "Roofs: {} cleared in {} batches; flow on {} cells",
            self.roofs_cleared, self.roof_batches, self.flow_cells
        )
    }
}

/// Results that outlive the pass
#[derive(Clone, Debug, PartialEq)]
pub struct RiverOutput {
    /// Per-cell flow direction, zero away from rivers
    pub flow: Tilemap<Vec2>,
    /// Cells whose roofs were removed, in removal batches
    pub roof_batches: Vec<Vec<(usize, usize)>>,
    pub report: RiverReport,
}

impl RiverOutput {
    /// All cleared cells, flattened
    pub fn roof_removals(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.roof_batches.iter().flatten().copied()
    }
}

/// Intermediate products, kept only for debugging and export
#[derive(Clone, Debug)]
pub struct RiverArtifacts {
    pub seeds: RiverSeeds,
    pub graph: RiverGraph,
    pub depth: DepthField,
}

/// Carve rivers into `grid`.
pub fn generate_rivers<R: Rng + ?Sized>(
    grid: &mut MapGrid,
    request: &RiverRequest,
    params: &RiverParams,
    rng: &mut R,
) -> RiverOutput {
    generate_rivers_with_artifacts(grid, request, params, rng).0
}

/// Carve rivers into `grid`, also returning the graph and depth field.
pub fn generate_rivers_with_artifacts<R: Rng + ?Sized>(
    grid: &mut MapGrid,
    request: &RiverRequest,
    params: &RiverParams,
    rng: &mut R,
) -> (RiverOutput, RiverArtifacts) {
    let params = params.sanitized();

    // Every RNG draw happens before rasterization starts
    let seeds = RiverSeeds::from_rng(rng);
    tracing::debug!(target: "river_generator::graph", %seeds, "river.seeds");

    let (mut graph, build) = RiverGraphBuilder::new(grid, &params).build(
        request.mode,
        request.heading,
        request.base_width,
        rng,
    );

    let merge = match request.mode {
        RiverMode::Delta => merge_endpoints(&mut graph, params.merge_radius, rng),
        RiverMode::Single => MergeStats::default(),
    };

    let sampler = CurveSampler::new(seeds.bend, &params);
    let depth = DepthFieldRasterizer::new(&sampler, seeds.width, &params).rasterize(
        &graph,
        grid.width,
        grid.height,
    );

    let heading = usable_heading(request.heading);
    let classified = TerrainClassifier::new(&seeds, heading, &params).apply(grid, &depth);
    let flow = FlowFieldBuilder::new(&sampler, params.flow_sample_step).build(&graph, grid);

    let mut report = RiverReport::new(&graph, build, merge, classified.stats);
    report.flow_cells = flow_cells(&flow);

    tracing::info!(
        target: "river_generator::graph",
        mode = %request.mode,
        heading,
        nodes = report.nodes,
        leaves = report.leaves,
        water_cells = report.water_cells(),
        bank_cells = report.bank_cells,
        merged = report.merged_endpoints,
        fallbacks = report.boundary_fallbacks,
        width_clamps = report.width_clamps,
        "river.generated"
    );

    let output = RiverOutput {
        flow,
        roof_batches: classified.roof_batches,
        report,
    };
    let artifacts = RiverArtifacts { seeds, graph, depth };
    (output, artifacts)
}
