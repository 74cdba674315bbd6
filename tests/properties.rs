use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use river_generator::grid::{MapGrid, TerrainType};
use river_generator::river::{
    generate_rivers_with_artifacts, merge_endpoints, MergeStats, RiverGraph, RiverGraphBuilder,
    RiverMode, RiverParams, RiverRequest,
};

const HEADINGS: [f32; 6] = [0.0, 45.0, 90.0, 160.0, 225.0, 300.0];

fn coast_grids() -> Vec<MapGrid> {
    HEADINGS
        .iter()
        .enumerate()
        .map(|(i, &heading)| {
            let mut grid = MapGrid::new(256, 256, TerrainType::Soil);
            grid.paint_coast(heading, 0.65, 15.0, i as u32);
            grid
        })
        .collect()
}

/// Unrelated, unmerged endpoints closer than `radius`
fn close_pairs(graph: &RiverGraph, radius: f32) -> usize {
    let ids: Vec<_> = graph.ids().filter(|id| !graph.node(*id).merged).collect();
    let mut count = 0;
    for (i, &a) in ids.iter().enumerate() {
        for &b in &ids[i + 1..] {
            if graph.is_ancestor(a, b) || graph.is_ancestor(b, a) {
                continue;
            }
            if graph.node(a).end.distance(graph.node(b).end) < radius {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn fuzzed_graphs_stay_well_formed() {
    let params = RiverParams::default();
    let grids = coast_grids();

    for seed in 0..1000u64 {
        let slot = seed as usize % grids.len();
        let grid = &grids[slot];
        let mode = if seed % 4 == 0 { RiverMode::Single } else { RiverMode::Delta };
        let width = 4.0 + (seed % 25) as f32;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (mut graph, _) =
            RiverGraphBuilder::new(grid, &params).build(mode, HEADINGS[slot], width, &mut rng);
        graph
            .validate(params.min_channel_width)
            .unwrap_or_else(|e| panic!("seed {}: built graph is malformed: {}", seed, e));
        assert!(graph.max_depth() <= params.max_depth, "seed {} recursed too deep", seed);
        assert!(graph.len() < 10_000, "seed {} grew {} nodes", seed, graph.len());

        if mode == RiverMode::Delta {
            merge_endpoints(&mut graph, params.merge_radius, &mut rng);
            graph
                .validate(params.min_channel_width)
                .unwrap_or_else(|e| panic!("seed {}: merged graph is malformed: {}", seed, e));
            assert_eq!(
                close_pairs(&graph, params.merge_radius),
                0,
                "seed {}: unrelated endpoints survived inside the merge radius",
                seed
            );
        }
    }
}

#[test]
fn merging_twice_changes_nothing() {
    let params = RiverParams::default();
    let grids = coast_grids();

    for seed in 0..60u64 {
        let slot = seed as usize % grids.len();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (mut graph, _) = RiverGraphBuilder::new(&grids[slot], &params).build(
            RiverMode::Delta,
            HEADINGS[slot],
            24.0,
            &mut rng,
        );

        merge_endpoints(&mut graph, params.merge_radius, &mut rng);
        let once = graph.clone();
        let stats = merge_endpoints(&mut graph, params.merge_radius, &mut ChaCha8Rng::seed_from_u64(seed + 1));
        assert_eq!(stats, MergeStats::default(), "seed {}: second merge did work", seed);
        assert_eq!(graph, once, "seed {}: second merge changed the graph", seed);
    }
}

#[test]
fn every_cell_is_classified_consistently() {
    let params = RiverParams::default();

    for (i, &heading) in HEADINGS.iter().enumerate() {
        let mut grid = MapGrid::new(200, 200, TerrainType::Gravel);
        grid.paint_coast(heading, 0.7, 12.0, 100 + i as u32);
        // A rocky outcrop that banks must not claim
        for y in 90..110 {
            for x in 90..110 {
                grid.set_terrain(x, y, TerrainType::Rock);
            }
        }
        let before = grid.clone();

        let request = RiverRequest {
            heading,
            mode: RiverMode::Delta,
            base_width: 16.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(i as u64);
        let (out, artifacts) = generate_rivers_with_artifacts(&mut grid, &request, &params, &mut rng);

        let mut counted = 0;
        for (x, y, cell) in grid.cells().iter() {
            let old = before.terrain(x, y);
            let depth = artifacts.depth.depth_at(x, y);

            assert!(TerrainType::all().contains(&cell.terrain));
            if old.is_ocean() {
                assert_eq!(cell.terrain, old, "ocean at ({}, {}) was overwritten", x, y);
                continue;
            }
            if depth <= -params.bank_width_min {
                assert!(!cell.terrain.is_water(), "({}, {}) is water at depth {}", x, y, depth);
            }
            match cell.terrain {
                TerrainType::DeepRiver => assert!(depth > params.deep_threshold),
                TerrainType::ShallowRiver => assert!(depth > 0.0),
                TerrainType::Riverbank => assert!(old.is_bank_eligible() && depth <= 0.0),
                other => assert_eq!(other, old, "({}, {}) changed without reason", x, y),
            }
            counted += 1;
        }
        assert_eq!(counted + before.count_terrain(|t| t.is_ocean()), 200 * 200);
        assert_eq!(
            out.report.deep_cells + out.report.shallow_cells,
            grid.count_terrain(|t| t.is_river_water())
        );
    }
}
