//! Data provider traits.
//!
//! The analysis pipeline reads footprints, radar summaries and population
//! rasters only through these traits. [`crate::ServiceProvider`] implements
//! them against the remote service; tests implement them in memory.

use sarwatch_core::dataset::RADAR_COLLECTION;
use sarwatch_core::vector::FeatureCollection;
use sarwatch_core::{
    AreaOfInterest, FootprintSource, GridSpec, Polarization, PopulationSource, Raster,
    StackSummary, TimeWindow,
};

use crate::error::Result;

/// Radar collection and band to summarize.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RadarQuery {
    pub collection: String,
    pub polarization: Polarization,
}

impl RadarQuery {
    pub fn new(polarization: Polarization) -> Self {
        Self {
            collection: RADAR_COLLECTION.to_string(),
            polarization,
        }
    }

    pub fn band(&self) -> &'static str {
        self.polarization.band()
    }
}

impl Default for RadarQuery {
    fn default() -> Self {
        Self::new(Polarization::default())
    }
}

/// Source of building footprints.
pub trait FootprintProvider: Send + Sync {
    /// Footprints intersecting `aoi`. An empty collection is a valid answer.
    fn footprints(&self, aoi: &AreaOfInterest, source: FootprintSource) -> Result<FeatureCollection>;
}

/// Source of per-location radar statistics.
pub trait RadarProvider: Send + Sync {
    /// Mean, standard deviation and count of the backscatter stack over
    /// `window`, aligned to `grid`.
    fn summarize(
        &self,
        aoi: &AreaOfInterest,
        window: &TimeWindow,
        query: &RadarQuery,
        grid: &GridSpec,
    ) -> Result<StackSummary>;
}

/// Source of population rasters.
pub trait PopulationProvider: Send + Sync {
    /// Most recent vintage covering `aoi`, or `None` without coverage
    fn latest_vintage(&self, source: PopulationSource, aoi: &AreaOfInterest) -> Result<Option<u16>>;

    /// Population raster for `vintage` clipped to `aoi`, or `None` without coverage
    fn population(
        &self,
        source: PopulationSource,
        vintage: u16,
        aoi: &AreaOfInterest,
    ) -> Result<Option<Raster<f64>>>;
}

impl<T: RadarProvider + ?Sized> RadarProvider for &T {
    fn summarize(
        &self,
        aoi: &AreaOfInterest,
        window: &TimeWindow,
        query: &RadarQuery,
        grid: &GridSpec,
    ) -> Result<StackSummary> {
        (**self).summarize(aoi, window, query, grid)
    }
}
