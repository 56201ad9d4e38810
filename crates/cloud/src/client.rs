//! Async client for the processing service.

use std::time::Duration;

use sarwatch_core::vector::FeatureCollection;
use sarwatch_core::{
    AreaOfInterest, FootprintSource, GridSpec, PopulationSource, Raster, SampleStats, StackSummary,
    TimeWindow,
};

use crate::auth::{CloudAuth, NoAuth};
use crate::error::{CloudError, Result};
use crate::http::HttpClient;
use crate::models::{
    footprints_from_geojson, FootprintRequest, PopulationRequest, RadarSummaryPayload,
    RadarSummaryRequest, RasterPayload, VintagesResponse,
};
use crate::provider::RadarQuery;

/// Environment variable consulted for the service base URL.
pub const SERVICE_URL_ENV: &str = "SARWATCH_SERVICE_URL";

/// Configuration for [`ServiceClient`].
pub struct ServiceClientOptions {
    /// Per-request timeout (default 120 s; radar summaries are slow).
    pub request_timeout: Duration,
}

impl Default for ServiceClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Async client for one processing-service deployment.
pub struct ServiceClient {
    base_url: String,
    http: HttpClient,
    auth: Box<dyn CloudAuth>,
}

impl ServiceClient {
    /// Create a client for `base_url` signing requests with `auth`.
    pub fn new(
        base_url: impl Into<String>,
        auth: Box<dyn CloudAuth>,
        options: ServiceClientOptions,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CloudError::Configuration(format!(
                "service URL must be http(s): {base_url:?}"
            )));
        }

        Ok(Self {
            base_url,
            http: HttpClient::new(options.request_timeout)?,
            auth,
        })
    }

    /// Client without credentials.
    pub fn anonymous(base_url: impl Into<String>) -> Result<Self> {
        Self::new(base_url, Box::new(NoAuth), ServiceClientOptions::default())
    }

    /// Base URL read from [`SERVICE_URL_ENV`].
    pub fn base_url_from_env() -> Result<String> {
        std::env::var(SERVICE_URL_ENV)
            .map_err(|_| CloudError::Configuration(format!("{SERVICE_URL_ENV} not set")))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    // ── Footprints ──────────────────────────────────────────────────

    /// Building footprints from `source` intersecting `aoi`.
    pub async fn footprints(
        &self,
        aoi: &AreaOfInterest,
        source: FootprintSource,
    ) -> Result<FeatureCollection> {
        let url = self.endpoint("footprints");
        let body = FootprintRequest::new(source.collection_id(), aoi);

        match self.http.post_json(&url, &body, self.auth.as_ref()).await? {
            Some(text) => footprints_from_geojson(&text),
            // Nothing indexed for this area
            None => Ok(FeatureCollection::new()),
        }
    }

    // ── Radar ───────────────────────────────────────────────────────

    /// Per-location radar statistics for one window.
    pub async fn radar_summary(
        &self,
        aoi: &AreaOfInterest,
        window: &TimeWindow,
        query: &RadarQuery,
        grid: &GridSpec,
    ) -> Result<StackSummary> {
        let url = self.endpoint("radar/summary");
        let body = RadarSummaryRequest::new(&query.collection, query.band(), aoi, window, grid);

        let Some(text) = self.http.post_json(&url, &body, self.auth.as_ref()).await? else {
            // No scenes in the window: every location has zero observations
            tracing::debug!(%window, "no radar scenes");
            return Ok(StackSummary::uniform(grid, SampleStats::new(f64::NAN, f64::NAN, 0)));
        };

        let payload: RadarSummaryPayload = serde_json::from_str(&text)
            .map_err(|e| CloudError::Decode(format!("radar summary: {e}")))?;
        payload.into_summary(grid)
    }

    // ── Population ──────────────────────────────────────────────────

    /// Most recent population vintage for `source` over `aoi`.
    pub async fn latest_vintage(
        &self,
        source: PopulationSource,
        aoi: &AreaOfInterest,
    ) -> Result<Option<u16>> {
        if let Some(fixed) = source.fixed_vintage() {
            return Ok(Some(fixed));
        }

        let url = self.endpoint("population/vintages");
        let body = population_request(source, aoi, None);

        let Some(text) = self.http.post_json(&url, &body, self.auth.as_ref()).await? else {
            return Ok(None);
        };
        let vintages: VintagesResponse = serde_json::from_str(&text)
            .map_err(|e| CloudError::Decode(format!("population vintages: {e}")))?;
        Ok(vintages.latest())
    }

    /// Population raster for `source` at `vintage` over `aoi`.
    pub async fn population(
        &self,
        source: PopulationSource,
        vintage: u16,
        aoi: &AreaOfInterest,
    ) -> Result<Option<Raster<f64>>> {
        let url = self.endpoint("population");
        let body = population_request(source, aoi, Some(vintage));

        let Some(text) = self.http.post_json(&url, &body, self.auth.as_ref()).await? else {
            return Ok(None);
        };
        let payload: RasterPayload = serde_json::from_str(&text)
            .map_err(|e| CloudError::Decode(format!("population raster: {e}")))?;
        payload.into_raster().map(Some)
    }
}

fn population_request(
    source: PopulationSource,
    aoi: &AreaOfInterest,
    vintage: Option<u16>,
) -> PopulationRequest<'static> {
    PopulationRequest {
        collection: source.collection_id(),
        country: source.country(),
        bbox: aoi.to_array(),
        vintage,
        scale_m: Some(source.nominal_scale_m()),
    }
}
