//! # SarWatch Core
//!
//! Core types shared by the SarWatch damage-mapping crates.
//!
//! This crate provides:
//! - `Raster<T>`: Generic georeferenced raster grid
//! - `GeoTransform` / `GridSpec`: Affine georeferencing and analysis grids
//! - `AreaOfInterest` / `TimeWindow`: Per-run request inputs
//! - `StackSummary`: Per-location mean / std-dev / count of a radar stack
//! - Dataset selectors for footprints, radar and population sources
//! - Vector feature types for building footprints

pub mod aoi;
pub mod dataset;
pub mod error;
pub mod raster;
pub mod summary;
pub mod vector;
pub mod window;

pub use aoi::AreaOfInterest;
pub use dataset::{FootprintSource, Polarization, PopulationSource};
pub use error::{Error, Result};
pub use raster::{GeoTransform, GridSpec, Raster, RasterElement};
pub use summary::{SampleStats, StackSummary};
pub use window::TimeWindow;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aoi::AreaOfInterest;
    pub use crate::dataset::{FootprintSource, Polarization, PopulationSource};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, GridSpec, Raster, RasterElement};
    pub use crate::summary::{SampleStats, StackSummary};
    pub use crate::window::TimeWindow;
    pub use crate::Algorithm;
}

/// Core trait for the analysis steps in SarWatch.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
