//! Map grid types: terrain, structure flags and cells.
//!
//! The river pass owns a `MapGrid` exclusively while it runs and hands it back
//! to the map pipeline afterwards.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Vec2};
use crate::noise_field::NoiseField;
use crate::tilemap::Tilemap;

/// Terrain classification of a single cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TerrainType {
    // Land
    #[default]
    Soil,
    RichSoil,
    Gravel,
    Sand,
    Marsh,
    Mud,
    Rock,
    Ice,
    Pavement,

    // Carved by rivers
    Riverbank,
    ShallowRiver,
    DeepRiver,

    // Terminal water body
    ShallowOcean,
    DeepOcean,
}

impl TerrainType {
    pub fn all() -> &'static [TerrainType] {
        &[
            TerrainType::Soil,
            TerrainType::RichSoil,
            TerrainType::Gravel,
            TerrainType::Sand,
            TerrainType::Marsh,
            TerrainType::Mud,
            TerrainType::Rock,
            TerrainType::Ice,
            TerrainType::Pavement,
            TerrainType::Riverbank,
            TerrainType::ShallowRiver,
            TerrainType::DeepRiver,
            TerrainType::ShallowOcean,
            TerrainType::DeepOcean,
        ]
    }

    /// Terminal body of water that ends river growth
    pub fn is_ocean(&self) -> bool {
        matches!(self, TerrainType::ShallowOcean | TerrainType::DeepOcean)
    }

    pub fn is_river_water(&self) -> bool {
        matches!(self, TerrainType::ShallowRiver | TerrainType::DeepRiver)
    }

    pub fn is_water(&self) -> bool {
        self.is_ocean() || self.is_river_water()
    }

    /// Natural ground that a river may turn into bank
    pub fn is_bank_eligible(&self) -> bool {
        matches!(
            self,
            TerrainType::Soil
                | TerrainType::RichSoil
                | TerrainType::Gravel
                | TerrainType::Sand
                | TerrainType::Marsh
                | TerrainType::Mud
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TerrainType::Soil => "Soil",
            TerrainType::RichSoil => "Rich soil",
            TerrainType::Gravel => "Gravel",
            TerrainType::Sand => "Sand",
            TerrainType::Marsh => "Marsh",
            TerrainType::Mud => "Mud",
            TerrainType::Rock => "Rock",
            TerrainType::Ice => "Ice",
            TerrainType::Pavement => "Pavement",
            TerrainType::Riverbank => "Riverbank",
            TerrainType::ShallowRiver => "Shallow river",
            TerrainType::DeepRiver => "Deep river",
            TerrainType::ShallowOcean => "Shallow ocean",
            TerrainType::DeepOcean => "Deep ocean",
        }
    }

    /// Get RGB color for rendering
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            TerrainType::Soil => (120, 95, 60),
            TerrainType::RichSoil => (85, 65, 40),
            TerrainType::Gravel => (140, 135, 125),
            TerrainType::Sand => (210, 190, 140),
            TerrainType::Marsh => (70, 100, 60),
            TerrainType::Mud => (80, 65, 45),
            TerrainType::Rock => (105, 100, 95),
            TerrainType::Ice => (200, 225, 240),
            TerrainType::Pavement => (160, 160, 160),
            TerrainType::Riverbank => (150, 125, 85),
            TerrainType::ShallowRiver => (80, 135, 185),
            TerrainType::DeepRiver => (40, 85, 150),
            TerrainType::ShallowOcean => (60, 110, 170),
            TerrainType::DeepOcean => (20, 50, 110),
        }
    }

    /// Get ASCII character for terminal display
    pub fn ascii_char(&self) -> char {
        match self {
            TerrainType::Soil => '.',
            TerrainType::RichSoil => ',',
            TerrainType::Gravel => ':',
            TerrainType::Sand => ';',
            TerrainType::Marsh => '%',
            TerrainType::Mud => '&',
            TerrainType::Rock => '#',
            TerrainType::Ice => '_',
            TerrainType::Pavement => '=',
            TerrainType::Riverbank => '"',
            TerrainType::ShallowRiver => '-',
            TerrainType::DeepRiver => '~',
            TerrainType::ShallowOcean => 'o',
            TerrainType::DeepOcean => 'O',
        }
    }
}

bitflags! {
    /// Structures occupying or covering a cell
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StructureFlags: u8 {
        /// Footprint of a placed structure
        const BUILDING = 0b0000_0001;
        /// Overhead rock (mountain roof)
        const ROCK_ROOF = 0b0000_0010;
        /// Constructed or thin natural roof
        const THIN_ROOF = 0b0000_0100;
    }
}

impl StructureFlags {
    pub const ROOF_MASK: StructureFlags =
        StructureFlags::ROCK_ROOF.union(StructureFlags::THIN_ROOF);

    pub fn has_roof(&self) -> bool {
        self.intersects(Self::ROOF_MASK)
    }
}

/// A single map cell
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cell {
    pub terrain: TerrainType,
    pub elevation: f32,
    pub structures: StructureFlags,
}

impl Cell {
    pub fn new(terrain: TerrainType) -> Self {
        Self {
            terrain,
            ..Self::default()
        }
    }
}

/// The map grid handed to the river pass
#[derive(Clone, Debug, PartialEq)]
pub struct MapGrid {
    pub width: usize,
    pub height: usize,
    cells: Tilemap<Cell>,
}

impl MapGrid {
    /// A grid filled with one terrain type at elevation 0
    pub fn new(width: usize, height: usize, terrain: TerrainType) -> Self {
        Self {
            width,
            height,
            cells: Tilemap::new_with(width, height, Cell::new(terrain)),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    pub fn cells(&self) -> &Tilemap<Cell> {
        &self.cells
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        self.cells.get(x, y)
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        self.cells.get_mut(x, y)
    }

    pub fn terrain(&self, x: usize, y: usize) -> TerrainType {
        self.cells.get(x, y).terrain
    }

    pub fn set_terrain(&mut self, x: usize, y: usize, terrain: TerrainType) {
        self.cells.get_mut(x, y).terrain = terrain;
    }

    pub fn is_ocean(&self, x: usize, y: usize) -> bool {
        self.cells.get(x, y).terrain.is_ocean()
    }

    /// Ocean test for a continuous point; points off the grid are not ocean
    pub fn is_ocean_at(&self, p: Vec2) -> bool {
        match p.to_cell() {
            Some((x, y)) if x < self.width && y < self.height => self.is_ocean(x, y),
            _ => false,
        }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.is_finite()
            && p.x >= 0.0
            && p.y >= 0.0
            && p.x < self.width as f32
            && p.y < self.height as f32
    }

    /// Cell counts per terrain type, in `TerrainType::all()` order, zero counts omitted
    pub fn terrain_counts(&self) -> Vec<(TerrainType, usize)> {
        let mut counts = vec![0usize; TerrainType::all().len()];
        for (_, _, cell) in self.cells.iter() {
            if let Some(i) = TerrainType::all().iter().position(|t| *t == cell.terrain) {
                counts[i] += 1;
            }
        }
        TerrainType::all()
            .iter()
            .zip(counts)
            .filter(|(_, n)| *n > 0)
            .map(|(t, n)| (*t, n))
            .collect()
    }

    pub fn count_terrain(&self, pred: impl Fn(TerrainType) -> bool) -> usize {
        self.cells.count(|c| pred(c.terrain))
    }

    /// Paint ocean beyond a noisy coastline perpendicular to `heading`.
    ///
    /// `land_fraction` is the share of the map (measured along the heading,
    /// from the upstream side) that stays land. Cells more than `shelf_width`
    /// past the coastline become deep ocean. Stands in for the map pipeline's
    /// own ocean placement when the river pass is run on its own.
    pub fn paint_coast(&mut self, heading: f32, land_fraction: f32, shelf_width: f32, seed: u32) {
        let dir = Vec2::from_heading(heading);
        let center = self.bounds().center();
        let half_extent =
            dir.x.abs() * self.width as f32 / 2.0 + dir.y.abs() * self.height as f32 / 2.0;
        let coastline = -half_extent + land_fraction.clamp(0.0, 1.0) * 2.0 * half_extent;

        // Wobble the coastline along its length
        let wobble = NoiseField::perlin(seed, 0.025)
            .rotate(heading as f64)
            .remap(8.0, 0.0);

        for (x, y, cell) in self.cells.iter_mut() {
            let p = Vec2::cell_center(x, y);
            let along = (p - center).dot(dir);
            let offset = wobble.sample_at(p) as f32;
            let past = along - (coastline + offset);
            if past > shelf_width {
                cell.terrain = TerrainType::DeepOcean;
                cell.elevation = -1.0;
            } else if past > 0.0 {
                cell.terrain = TerrainType::ShallowOcean;
                cell.elevation = -0.2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terrain_queries() {
        assert!(TerrainType::DeepOcean.is_ocean());
        assert!(TerrainType::DeepRiver.is_river_water());
        assert!(!TerrainType::DeepRiver.is_ocean());
        assert!(TerrainType::Soil.is_bank_eligible());
        assert!(!TerrainType::Rock.is_bank_eligible());
        assert!(!TerrainType::ShallowRiver.is_bank_eligible());
    }

    #[test]
    fn test_roof_mask() {
        let flags = StructureFlags::ROCK_ROOF | StructureFlags::BUILDING;
        assert!(flags.has_roof());
        assert!(!StructureFlags::BUILDING.has_roof());
        assert_eq!(flags.difference(StructureFlags::ROOF_MASK), StructureFlags::BUILDING);
    }

    #[test]
    fn test_paint_coast_heading_south() {
        let mut grid = MapGrid::new(100, 100, TerrainType::Soil);
        grid.paint_coast(90.0, 0.6, 10.0, 3);

        // Upstream edge stays land, far edge becomes deep ocean
        assert!(!grid.is_ocean(50, 0));
        assert_eq!(grid.terrain(50, 99), TerrainType::DeepOcean);
        assert!(grid.is_ocean_at(Vec2::new(50.5, 99.5)));
        assert!(!grid.is_ocean_at(Vec2::new(50.5, 120.0)));

        let counts = grid.terrain_counts();
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 100 * 100);
    }
}
