//! Blocking (synchronous) API for native platforms.
//!
//! Wraps the async [`ServiceClient`] with a Tokio runtime so the pipeline and
//! CLI don't need to manage their own async runtime.

#[cfg(feature = "native")]
mod inner {
    use sarwatch_core::vector::FeatureCollection;
    use sarwatch_core::{
        AreaOfInterest, FootprintSource, GridSpec, PopulationSource, Raster, StackSummary,
        TimeWindow,
    };

    use crate::client::ServiceClient;
    use crate::error::{CloudError, Result};
    use crate::provider::{FootprintProvider, PopulationProvider, RadarProvider, RadarQuery};

    /// Blocking wrapper around [`ServiceClient`] implementing the provider traits.
    ///
    /// Uses an internal single-threaded Tokio runtime.
    pub struct ServiceProvider {
        rt: tokio::runtime::Runtime,
        inner: ServiceClient,
    }

    impl ServiceProvider {
        pub fn new(client: ServiceClient) -> Result<Self> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| CloudError::Network(e.to_string()))?;

            Ok(Self { rt, inner: client })
        }

        pub fn client(&self) -> &ServiceClient {
            &self.inner
        }
    }

    impl FootprintProvider for ServiceProvider {
        fn footprints(&self, aoi: &AreaOfInterest, source: FootprintSource) -> Result<FeatureCollection> {
            self.rt.block_on(self.inner.footprints(aoi, source))
        }
    }

    impl RadarProvider for ServiceProvider {
        fn summarize(
            &self,
            aoi: &AreaOfInterest,
            window: &TimeWindow,
            query: &RadarQuery,
            grid: &GridSpec,
        ) -> Result<StackSummary> {
            self.rt.block_on(self.inner.radar_summary(aoi, window, query, grid))
        }
    }

    impl PopulationProvider for ServiceProvider {
        fn latest_vintage(&self, source: PopulationSource, aoi: &AreaOfInterest) -> Result<Option<u16>> {
            self.rt.block_on(self.inner.latest_vintage(source, aoi))
        }

        fn population(
            &self,
            source: PopulationSource,
            vintage: u16,
            aoi: &AreaOfInterest,
        ) -> Result<Option<Raster<f64>>> {
            self.rt.block_on(self.inner.population(source, vintage, aoi))
        }
    }
}

#[cfg(feature = "native")]
pub use inner::*;
