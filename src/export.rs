//! Debug exports for the river pass: PNG renders and an ASCII preview.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

use crate::geometry::Vec2;
use crate::grid::MapGrid;
use crate::river::{DepthField, NO_DEPTH};
use crate::tilemap::Tilemap;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn save(img: &RgbImage, path: &Path) -> Result<(), ExportError> {
    img.save(path).map_err(|source| ExportError::Image {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// RENDERING
// =============================================================================

/// Terrain colors, slightly darkened where the elevation was carved
pub fn render_terrain(grid: &MapGrid) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(grid.width as u32, grid.height as u32);

    for (x, y, cell) in grid.cells().iter() {
        let (r, g, b) = cell.terrain.color();
        let shade = if cell.terrain.is_river_water() {
            (1.0 + cell.elevation * 0.5).clamp(0.6, 1.0)
        } else {
            1.0
        };
        img.put_pixel(
            x as u32,
            y as u32,
            Rgb([
                (r as f32 * shade) as u8,
                (g as f32 * shade) as u8,
                (b as f32 * shade) as u8,
            ]),
        );
    }

    img
}

/// Depth heatmap: unreached cells black, reached cells on a spectral scale
/// from the shallowest bank to the deepest channel core.
pub fn render_depth(field: &DepthField) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(field.width() as u32, field.height() as u32);
    let (lo, hi) = field.range().unwrap_or((0.0, 1.0));
    let span = (hi - lo).max(1e-6);

    for (x, y, &d) in field.depth.iter() {
        let color = if d <= NO_DEPTH {
            [0, 0, 0]
        } else {
            spectral_colormap(((d - lo) / span).clamp(0.0, 1.0))
        };
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }

    img
}

/// Flow directions: red/green encode the x/y components, blue the magnitude.
/// Cells without flow are black.
pub fn render_flow(flow: &Tilemap<Vec2>) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(flow.width as u32, flow.height as u32);

    for (x, y, v) in flow.iter() {
        let color = if *v == Vec2::ZERO {
            [0, 0, 0]
        } else {
            [
                ((v.x * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0) as u8,
                ((v.y * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0) as u8,
                (v.length().clamp(0.0, 1.0) * 255.0) as u8,
            ]
        };
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }

    img
}

/// Spectral colormap (matplotlib style): dark blue -> green -> yellow -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.40, 0.76, 0.65],
        [0.67, 0.87, 0.64],
        [0.90, 0.96, 0.60],
        [1.00, 1.00, 0.75],
        [1.00, 0.88, 0.55],
        [0.99, 0.68, 0.38],
        [0.96, 0.43, 0.26],
        [0.84, 0.24, 0.31],
        [0.62, 0.00, 0.26],
    ];

    let t_scaled = t * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

/// ASCII preview at most `max_cols` characters wide.
///
/// Each character covers a square block of cells and shows the block's
/// highest-ranked terrain, so narrow channels survive the downsampling.
pub fn render_ascii(grid: &MapGrid, max_cols: usize) -> String {
    if grid.width == 0 || grid.height == 0 {
        return String::new();
    }
    let block = grid.width.div_ceil(max_cols.max(1)).max(1);
    let cols = grid.width.div_ceil(block);
    let rows = grid.height.div_ceil(block);

    let mut out = String::with_capacity((cols + 1) * rows);
    for by in 0..rows {
        for bx in 0..cols {
            let mut shown = grid.terrain(bx * block, by * block);
            for y in by * block..((by + 1) * block).min(grid.height) {
                for x in bx * block..((bx + 1) * block).min(grid.width) {
                    shown = shown.max(grid.terrain(x, y));
                }
            }
            out.push(shown.ascii_char());
        }
        out.push('\n');
    }
    out
}

// =============================================================================
// FILE EXPORT
// =============================================================================

pub fn export_terrain(grid: &MapGrid, path: impl AsRef<Path>) -> Result<(), ExportError> {
    save(&render_terrain(grid), path.as_ref())
}

pub fn export_depth(field: &DepthField, path: impl AsRef<Path>) -> Result<(), ExportError> {
    save(&render_depth(field), path.as_ref())
}

pub fn export_flow(flow: &Tilemap<Vec2>, path: impl AsRef<Path>) -> Result<(), ExportError> {
    save(&render_flow(flow), path.as_ref())
}

pub fn export_ascii(grid: &MapGrid, max_cols: usize, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let path = path.as_ref();
    fs::write(path, render_ascii(grid, max_cols)).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainType;

    #[test]
    fn test_ascii_keeps_narrow_river() {
        let mut grid = MapGrid::new(40, 20, TerrainType::Soil);
        for y in 0..20 {
            grid.set_terrain(13, y, TerrainType::ShallowRiver);
        }
        let text = render_ascii(&grid, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| l.chars().count() == 10));
        assert!(lines.iter().all(|l| l.contains('-')), "river lost in downsampling:\n{}", text);
    }

    #[test]
    fn test_render_sizes() {
        let grid = MapGrid::new(12, 7, TerrainType::Sand);
        assert_eq!(render_terrain(&grid).dimensions(), (12, 7));
        let field = DepthField::new(12, 7);
        assert_eq!(render_depth(&field).dimensions(), (12, 7));
        let flow = Tilemap::new_with(12, 7, Vec2::ZERO);
        assert_eq!(*render_flow(&flow).get_pixel(3, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_export_reports_path() {
        let grid = MapGrid::new(4, 4, TerrainType::Soil);
        let err = export_ascii(&grid, 4, "/nonexistent/dir/map.txt").unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(err.to_string().contains("map.txt"));
    }
}
