//! Footprint rasterization
//!
//! Paints building footprints onto the analysis grid to form the structure
//! mask: a cell is a structure when its centre falls inside a footprint.

use geo::{BoundingRect, Centroid, Contains, MultiPolygon, Point};
use sarwatch_core::raster::{GridSpec, Raster};
use sarwatch_core::vector::FeatureCollection;
use sarwatch_core::Result;

use crate::imagery::STRUCTURE;

/// Parameters for footprint rasterization
#[derive(Debug, Clone)]
pub struct RasterizeParams {
    /// Mark the cell under the centroid of footprints too small to contain
    /// any cell centre, so sub-cell buildings are not dropped
    pub keep_small_footprints: bool,
}

impl Default for RasterizeParams {
    fn default() -> Self {
        Self {
            keep_small_footprints: true,
        }
    }
}

/// Summary of a rasterization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizeStats {
    /// Features with an areal footprint
    pub footprints: usize,
    /// Features skipped because they have no areal geometry
    pub skipped: usize,
    /// Cells set in the mask
    pub structure_cells: usize,
}

/// Rasterize footprints into a binary structure mask on `grid`.
///
/// An empty collection yields an all-zero mask.
pub fn rasterize_footprints(
    features: &FeatureCollection,
    grid: &GridSpec,
    params: &RasterizeParams,
) -> Result<(Raster<u8>, RasterizeStats)> {
    let mut mask: Raster<u8> = Raster::from_grid(grid, 0);
    let mut footprints = 0;
    let mut skipped = 0;

    for feature in features.iter() {
        match feature.footprint() {
            Some(mp) => {
                footprints += 1;
                paint(&mut mask, grid, &mp, params);
            }
            None => skipped += 1,
        }
    }

    let stats = RasterizeStats {
        footprints,
        skipped,
        structure_cells: mask.count_eq(STRUCTURE),
    };
    if skipped > 0 {
        tracing::debug!(skipped, "ignored footprint features without areal geometry");
    }
    Ok((mask, stats))
}

fn paint(mask: &mut Raster<u8>, grid: &GridSpec, footprint: &MultiPolygon<f64>, params: &RasterizeParams) {
    let Some(rect) = footprint.bounding_rect() else {
        return;
    };

    let gt = &grid.transform;
    let (col_a, row_a) = gt.geo_to_pixel(rect.min().x, rect.max().y);
    let (col_b, row_b) = gt.geo_to_pixel(rect.max().x, rect.min().y);
    if !(col_a.is_finite() && col_b.is_finite() && row_a.is_finite() && row_b.is_finite()) {
        return;
    }

    let clamp = |v: f64, max: usize| (v.max(0.0) as usize).min(max);
    let min_col = clamp(col_a.min(col_b).floor(), grid.cols);
    let max_col = clamp(col_a.max(col_b).ceil(), grid.cols);
    let min_row = clamp(row_a.min(row_b).floor(), grid.rows);
    let max_row = clamp(row_a.max(row_b).ceil(), grid.rows);

    let mut painted = false;
    for row in min_row..max_row {
        for col in min_col..max_col {
            let (x, y) = gt.pixel_to_geo(col, row);
            if footprint.contains(&Point::new(x, y)) {
                mask.data_mut()[(row, col)] = STRUCTURE;
                painted = true;
            }
        }
    }

    if !painted && params.keep_small_footprints {
        if let Some(c) = footprint.centroid() {
            if let Some((row, col)) = gt.cell_at(c.x(), c.y(), grid.rows, grid.cols) {
                mask.data_mut()[(row, col)] = STRUCTURE;
            }
        }
    }
}
