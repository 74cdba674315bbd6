//! Procedural river and delta generation
//!
//! The pass turns a map grid, a flow heading and a base channel width into
//! carved river terrain plus a flow direction field:
//! - `builder`: grows the channel graph (single trunk or branching delta)
//! - `merge`: collapses nearby delta mouths
//! - `curve`: bends channels with noise
//! - `depth`: rasterizes channel depth
//! - `classify`: turns depth into terrain, carves elevation, clears roofs
//! - `flow`: derives per-cell flow vectors
//!
//! `generate_rivers` runs them all in order.

pub mod builder;
pub mod classify;
pub mod curve;
pub mod depth;
pub mod flow;
pub mod graph;
pub mod merge;
pub mod params;
pub mod pipeline;

pub use builder::{usable_heading, BuildStats, RiverGraphBuilder, RiverMode};
pub use classify::{ClassifyOutcome, ClassifyStats, TerrainClassifier};
pub use curve::{CurveSample, CurveSampler};
pub use depth::{DepthField, DepthFieldRasterizer, NO_DEPTH};
pub use flow::{FlowFieldBuilder, FlowSample};
pub use graph::{GraphDefect, NodeId, RiverGraph, RiverNode};
pub use merge::{merge_endpoints, MergeStats};
pub use params::{ChannelPreset, ParamsError, RiverParams};
pub use pipeline::{
    generate_rivers, generate_rivers_with_artifacts, RiverArtifacts, RiverOutput, RiverReport,
    RiverRequest,
};
