//! Vector-to-raster operations on building footprints

mod rasterize;

pub use rasterize::{rasterize_footprints, RasterizeParams, RasterizeStats};
