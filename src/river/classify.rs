//! Terrain classification from the depth field
//!
//! Per cell, in order of precedence:
//! - ocean stays ocean
//! - deep enough water where the shallow noise allows it becomes `DeepRiver`
//! - any positive depth becomes `ShallowRiver`
//! - a noisy band just outside the channel becomes `Riverbank` on natural
//!   ground without a building
//! - everything else keeps its terrain
//!
//! Water cells are carved into the elevation and lose any roof above them.

use crate::grid::{Cell, MapGrid, StructureFlags, TerrainType};
use crate::noise_field::NoiseField;
use crate::seeds::RiverSeeds;
use crate::tilemap::Tilemap;

use super::depth::DepthField;
use super::params::RiverParams;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClassifyStats {
    pub deep_cells: usize,
    pub shallow_cells: usize,
    pub bank_cells: usize,
    /// Cells whose roof was removed
    pub roofs_cleared: usize,
    pub roof_batches: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassifyOutcome {
    pub stats: ClassifyStats,
    /// Cells whose roof was removed, grouped in removal batches. Wide channels
    /// give one cell per batch; narrow channels give one batch per connected
    /// stretch of roofed water.
    pub roof_batches: Vec<Vec<(usize, usize)>>,
}

pub struct TerrainClassifier<'a> {
    shallow_noise: NoiseField,
    bank_noise: NoiseField,
    params: &'a RiverParams,
}

impl<'a> TerrainClassifier<'a> {
    /// `heading` is the main flow direction; shallow patches are stretched
    /// across it so fords span the channel.
    pub fn new(seeds: &RiverSeeds, heading: f32, params: &'a RiverParams) -> Self {
        let shallow_noise = NoiseField::perlin(seeds.shallow, params.shallow_noise_frequency as f64)
            .scale(1.0, 4.0)
            .rotate(heading as f64);

        let (lo, hi) = (params.bank_width_min as f64, params.bank_width_max as f64);
        let bank_noise = NoiseField::perlin(seeds.bank, params.bank_noise_frequency as f64)
            .remap(0.5 * (hi - lo), lo + 0.5 * (hi - lo))
            .clamp(lo, hi);

        Self {
            shallow_noise,
            bank_noise,
            params,
        }
    }

    /// Width of the bank band at a cell
    pub fn bank_width_at(&self, x: usize, y: usize) -> f32 {
        self.bank_noise.sample(x as f64 + 0.5, y as f64 + 0.5) as f32
    }

    /// Whether water at this cell may be deep (false inside fords)
    pub fn allows_deep(&self, x: usize, y: usize) -> bool {
        self.shallow_noise.sample(x as f64 + 0.5, y as f64 + 0.5) as f32 <= self.params.shallow_cutoff
    }

    /// Terrain a cell ends up with for a given depth
    pub fn classify(&self, cell: &Cell, x: usize, y: usize, depth: f32) -> TerrainType {
        if cell.terrain.is_ocean() {
            return cell.terrain;
        }
        if depth > self.params.deep_threshold && self.allows_deep(x, y) {
            return TerrainType::DeepRiver;
        }
        if depth > 0.0 {
            return TerrainType::ShallowRiver;
        }
        if depth > -self.bank_width_at(x, y)
            && cell.terrain.is_bank_eligible()
            && !cell.structures.contains(StructureFlags::BUILDING)
        {
            return TerrainType::Riverbank;
        }
        cell.terrain
    }

    /// Classify every cell of `grid`, carve water and clear roofs over it.
    pub fn apply(&self, grid: &mut MapGrid, field: &DepthField) -> ClassifyOutcome {
        let width = grid.width.min(field.width());
        let height = grid.height.min(field.height());
        debug_assert_eq!((grid.width, grid.height), (field.width(), field.height()));

        let mut outcome = ClassifyOutcome::default();
        let mut narrow_roofed = Tilemap::new_with(grid.width, grid.height, false);

        for y in 0..height {
            for x in 0..width {
                let depth = field.depth_at(x, y);
                let terrain = self.classify(grid.cell(x, y), x, y, depth);

                match terrain {
                    TerrainType::DeepRiver => outcome.stats.deep_cells += 1,
                    TerrainType::ShallowRiver => outcome.stats.shallow_cells += 1,
                    TerrainType::Riverbank => outcome.stats.bank_cells += 1,
                    _ => {}
                }

                let cell = grid.cell_mut(x, y);
                cell.terrain = terrain;
                if !terrain.is_river_water() {
                    continue;
                }

                cell.elevation -= depth * self.params.carve_depth_scale;
                if cell.structures.has_roof() {
                    if field.channel_width_at(x, y) >= self.params.roof_clear_min_width {
                        cell.structures.remove(StructureFlags::ROOF_MASK);
                        outcome.roof_batches.push(vec![(x, y)]);
                    } else {
                        narrow_roofed.set(x, y, true);
                    }
                }
            }
        }

        for batch in narrow_roofed.components() {
            for &(x, y) in &batch {
                grid.cell_mut(x, y).structures.remove(StructureFlags::ROOF_MASK);
            }
            outcome.roof_batches.push(batch);
        }

        outcome.stats.roof_batches = outcome.roof_batches.len();
        outcome.stats.roofs_cleared = outcome.roof_batches.iter().map(Vec::len).sum();

        tracing::debug!(
            target: "river_generator::classify",
            deep = outcome.stats.deep_cells,
            shallow = outcome.stats.shallow_cells,
            bank = outcome.stats.bank_cells,
            roofs_cleared = outcome.stats.roofs_cleared,
            roof_batches = outcome.stats.roof_batches,
            "classify.done"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::river::curve::CurveSampler;
    use crate::river::depth::{DepthFieldRasterizer, NO_DEPTH};
    use crate::river::graph::RiverGraph;

    fn vertical_channel(params: &RiverParams, width: f32) -> DepthField {
        let sampler = CurveSampler::new(1, params);
        let raster = DepthFieldRasterizer::new(&sampler, 2, params);
        let mut graph = RiverGraph::new();
        graph.add_root(Vec2::new(30.0, 0.0), Vec2::new(30.0, 60.0), width, Vec2::ZERO);
        raster.rasterize(&graph, 60, 60)
    }

    fn straight_params() -> RiverParams {
        RiverParams {
            bend_amplitude: 0.0,
            width_noise_strength: 0.0,
            ..RiverParams::default()
        }
    }

    #[test]
    fn test_precedence() {
        let params = RiverParams {
            shallow_cutoff: 10.0,
            ..RiverParams::default()
        };
        let seeds = RiverSeeds::from_master(4);
        let classifier = TerrainClassifier::new(&seeds, 90.0, &params);
        let soil = Cell::new(TerrainType::Soil);

        assert_eq!(classifier.classify(&soil, 3, 3, 5.0), TerrainType::DeepRiver);
        assert_eq!(classifier.classify(&soil, 3, 3, 1.0), TerrainType::ShallowRiver);
        assert_eq!(classifier.classify(&soil, 3, 3, -0.5), TerrainType::Riverbank);
        assert_eq!(classifier.classify(&soil, 3, 3, -10.0), TerrainType::Soil);
        assert_eq!(classifier.classify(&soil, 3, 3, NO_DEPTH), TerrainType::Soil);

        let ocean = Cell::new(TerrainType::ShallowOcean);
        assert_eq!(classifier.classify(&ocean, 3, 3, 5.0), TerrainType::ShallowOcean);

        let rock = Cell::new(TerrainType::Rock);
        assert_eq!(classifier.classify(&rock, 3, 3, -0.5), TerrainType::Rock);
        assert_eq!(classifier.classify(&rock, 3, 3, 1.0), TerrainType::ShallowRiver);

        let mut building = Cell::new(TerrainType::Soil);
        building.structures = StructureFlags::BUILDING;
        assert_eq!(classifier.classify(&building, 3, 3, -0.5), TerrainType::Soil);
    }

    #[test]
    fn test_fords_keep_water_shallow() {
        let params = RiverParams {
            shallow_cutoff: -10.0,
            ..RiverParams::default()
        };
        let classifier = TerrainClassifier::new(&RiverSeeds::from_master(4), 0.0, &params);
        let soil = Cell::new(TerrainType::Soil);
        assert_eq!(classifier.classify(&soil, 7, 7, 50.0), TerrainType::ShallowRiver);
    }

    #[test]
    fn test_bank_width_stays_in_range() {
        let params = RiverParams::default();
        let classifier = TerrainClassifier::new(&RiverSeeds::from_master(8), 0.0, &params);
        for y in 0..40 {
            for x in 0..40 {
                let w = classifier.bank_width_at(x, y);
                assert!(w >= params.bank_width_min - 1e-5 && w <= params.bank_width_max + 1e-5);
            }
        }
    }

    #[test]
    fn test_apply_counts_and_carves() {
        let params = straight_params();
        let field = vertical_channel(&params, 10.0);
        let mut grid = MapGrid::new(60, 60, TerrainType::Soil);
        let classifier = TerrainClassifier::new(&RiverSeeds::from_master(3), 90.0, &params);
        let outcome = classifier.apply(&mut grid, &field);

        let water = grid.count_terrain(|t| t.is_river_water());
        assert_eq!(water, 600);
        assert_eq!(outcome.stats.deep_cells + outcome.stats.shallow_cells, water);
        assert_eq!(outcome.stats.bank_cells, grid.count_terrain(|t| t == TerrainType::Riverbank));
        assert!(outcome.stats.bank_cells >= 2 * 60);
        assert!(grid.cell(30, 30).elevation < 0.0);
        assert_eq!(grid.cell(5, 30).elevation, 0.0);
    }

    #[test]
    fn test_water_never_beyond_bank() {
        let params = RiverParams::default();
        let sampler = CurveSampler::new(4, &params);
        let raster = DepthFieldRasterizer::new(&sampler, 5, &params);
        let mut graph = RiverGraph::new();
        graph.add_root(Vec2::new(0.0, 10.0), Vec2::new(80.0, 70.0), 9.0, Vec2::new(3.0, 1.0));
        let field = raster.rasterize(&graph, 80, 80);

        let mut grid = MapGrid::new(80, 80, TerrainType::Sand);
        let classifier = TerrainClassifier::new(&RiverSeeds::from_master(6), 37.0, &params);
        classifier.apply(&mut grid, &field);

        for (x, y, cell) in grid.cells().iter() {
            let depth = field.depth_at(x, y);
            if depth <= -params.bank_width_min {
                assert!(!cell.terrain.is_water(), "({}, {}) at depth {} is water", x, y, depth);
            }
            if cell.terrain.is_river_water() {
                assert!(depth > 0.0);
            }
        }
    }

    #[test]
    fn test_roofs_cleared_in_batches() {
        let params = straight_params();
        let field = vertical_channel(&params, 6.0);
        let mut grid = MapGrid::new(60, 60, TerrainType::Soil);
        // Two separate roofed stretches over the narrow channel, plus a roof on dry land
        for y in (5..10).chain(40..44) {
            for x in 25..35 {
                grid.cell_mut(x, y).structures = StructureFlags::ROCK_ROOF;
            }
        }
        grid.cell_mut(2, 2).structures = StructureFlags::THIN_ROOF;

        let classifier = TerrainClassifier::new(&RiverSeeds::from_master(3), 90.0, &params);
        let outcome = classifier.apply(&mut grid, &field);

        assert_eq!(outcome.roof_batches.len(), 2);
        assert_eq!(outcome.stats.roofs_cleared, 6 * (5 + 4));
        for batch in &outcome.roof_batches {
            for &(x, y) in batch {
                assert!(grid.terrain(x, y).is_river_water());
                assert!(!grid.cell(x, y).structures.has_roof());
            }
        }
        // Roof beside the water survives, as does the dry one
        assert!(grid.cell(25, 6).structures.has_roof());
        assert!(grid.cell(2, 2).structures.has_roof());
    }

    #[test]
    fn test_wide_channel_clears_cell_by_cell() {
        let params = straight_params();
        let field = vertical_channel(&params, 10.0);
        let mut grid = MapGrid::new(60, 60, TerrainType::Soil);
        for x in 20..40 {
            grid.cell_mut(x, 10).structures = StructureFlags::ROCK_ROOF | StructureFlags::BUILDING;
        }

        let classifier = TerrainClassifier::new(&RiverSeeds::from_master(3), 90.0, &params);
        let outcome = classifier.apply(&mut grid, &field);

        assert_eq!(outcome.roof_batches.len(), 10);
        assert!(outcome.roof_batches.iter().all(|b| b.len() == 1));
        // Only the roof goes; the building flag is left to the structure pass
        assert_eq!(grid.cell(30, 10).structures, StructureFlags::BUILDING);
    }
}
