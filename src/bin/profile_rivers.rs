//! Profiling tool to identify bottlenecks in the river pass

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use river_generator::grid::{MapGrid, TerrainType};
use river_generator::river::{
    merge_endpoints, CurveSampler, DepthFieldRasterizer, FlowFieldBuilder, RiverGraphBuilder,
    RiverMode, RiverParams, TerrainClassifier,
};
use river_generator::seeds::RiverSeeds;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let width = 800;
    let height = 800;
    let seed = 1337u64;
    let heading = 90.0;
    let base_width = 28.0;

    println!("=== River Pass Profiling ===");
    println!("Map size: {}x{} ({} cells)", width, height, width * height);
    println!();

    let params = RiverParams::default();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let start = Instant::now();
    let mut grid = MapGrid::new(width, height, TerrainType::Soil);
    grid.paint_coast(heading, 0.75, 30.0, seed as u32);
    let coast_time = start.elapsed();
    println!("Coast painting: {:?}", coast_time);

    let seeds = RiverSeeds::from_master(seed);

    let start = Instant::now();
    let (mut graph, build) =
        RiverGraphBuilder::new(&grid, &params).build(RiverMode::Delta, heading, base_width, &mut rng);
    let build_time = start.elapsed();
    println!(
        "Graph build: {:?} ({} nodes, {} degenerate splits)",
        build_time,
        graph.len(),
        build.degenerate_splits
    );

    let start = Instant::now();
    let merge = merge_endpoints(&mut graph, params.merge_radius, &mut rng);
    let merge_time = start.elapsed();
    println!(
        "Endpoint merge: {:?} ({} merged, {} pruned)",
        merge_time, merge.merged_endpoints, merge.pruned_nodes
    );

    let sampler = CurveSampler::new(seeds.bend, &params);

    let start = Instant::now();
    let depth = DepthFieldRasterizer::new(&sampler, seeds.width, &params).rasterize(&graph, width, height);
    let raster_time = start.elapsed();
    println!("Depth raster: {:?} ({} channel cells)", raster_time, depth.channel_cells());

    let start = Instant::now();
    let classified = TerrainClassifier::new(&seeds, heading, &params).apply(&mut grid, &depth);
    let classify_time = start.elapsed();
    println!(
        "Classification: {:?} ({} deep, {} shallow, {} bank)",
        classify_time,
        classified.stats.deep_cells,
        classified.stats.shallow_cells,
        classified.stats.bank_cells
    );

    let start = Instant::now();
    let _flow = FlowFieldBuilder::new(&sampler, params.flow_sample_step).build(&graph, &grid);
    let flow_time = start.elapsed();
    println!("Flow field: {:?}", flow_time);

    // Summary
    let total = build_time + merge_time + raster_time + classify_time + flow_time;
    let pct = |d: std::time::Duration| 100.0 * d.as_secs_f64() / total.as_secs_f64().max(1e-9);
    println!("\n=== Summary ===");
    println!("Graph build:    {:>8.2}% ({:?})", pct(build_time), build_time);
    println!("Merge:          {:>8.2}% ({:?})", pct(merge_time), merge_time);
    println!("Depth raster:   {:>8.2}% ({:?})", pct(raster_time), raster_time);
    println!("Classification: {:>8.2}% ({:?})", pct(classify_time), classify_time);
    println!("Flow field:     {:>8.2}% ({:?})", pct(flow_time), flow_time);
    println!("─────────────────────────────────");
    println!("Total:          {:?}", total);
}
