//! Analysis grid definition

use serde::{Deserialize, Serialize};

use crate::raster::GeoTransform;

/// The grid every per-location raster of one analysis run is aligned to.
///
/// Structure masks, stack summaries, scores and damage masks all share one
/// `GridSpec`; population rasters keep their own transform and are sampled
/// against it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(transform: GeoTransform, rows: usize, cols: usize) -> Self {
        Self { transform, rows, cols }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total number of cells, `None` when `rows * cols` overflows
    pub fn cell_count(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Bit pattern used to key caches on the grid
    pub fn cache_key(&self) -> [u64; 6] {
        [
            self.transform.origin_x.to_bits(),
            self.transform.origin_y.to_bits(),
            self.transform.pixel_width.to_bits(),
            self.transform.pixel_height.to_bits(),
            self.rows as u64,
            self.cols as u64,
        ]
    }
}
