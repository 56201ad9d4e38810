//! Wire types for the processing service.
//!
//! Serde models for the JSON bodies exchanged with `/v1/footprints`,
//! `/v1/radar/summary`, `/v1/population/vintages` and `/v1/population`,
//! plus conversion of their payloads into core rasters and features.

use chrono::NaiveDate;
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

use sarwatch_core::vector::{AttributeValue, Feature, FeatureCollection};
use sarwatch_core::{AreaOfInterest, GeoTransform, GridSpec, Raster, StackSummary, TimeWindow};

use crate::error::{CloudError, Result};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Analysis grid as sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPayload {
    pub rows: usize,
    pub cols: usize,
    /// GDAL-ordered affine coefficients
    pub transform: [f64; 6],
}

impl From<&GridSpec> for GridPayload {
    fn from(grid: &GridSpec) -> Self {
        Self {
            rows: grid.rows,
            cols: grid.cols,
            transform: grid.transform.to_gdal(),
        }
    }
}

/// Body for `POST /v1/footprints`.
#[derive(Debug, Clone, Serialize)]
pub struct FootprintRequest<'a> {
    pub collection: &'a str,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: [f64; 4],
}

impl<'a> FootprintRequest<'a> {
    pub fn new(collection: &'a str, aoi: &AreaOfInterest) -> Self {
        Self {
            collection,
            bbox: aoi.to_array(),
        }
    }
}

/// Body for `POST /v1/radar/summary`.
#[derive(Debug, Clone, Serialize)]
pub struct RadarSummaryRequest<'a> {
    pub collection: &'a str,
    pub band: &'a str,
    pub bbox: [f64; 4],
    pub start: NaiveDate,
    /// Inclusive end date
    pub end: NaiveDate,
    pub grid: GridPayload,
}

impl<'a> RadarSummaryRequest<'a> {
    pub fn new(
        collection: &'a str,
        band: &'a str,
        aoi: &AreaOfInterest,
        window: &TimeWindow,
        grid: &GridSpec,
    ) -> Self {
        Self {
            collection,
            band,
            bbox: aoi.to_array(),
            start: window.start(),
            end: window.end(),
            grid: grid.into(),
        }
    }
}

/// Body for `POST /v1/population/vintages` and `POST /v1/population`.
#[derive(Debug, Clone, Serialize)]
pub struct PopulationRequest<'a> {
    pub collection: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<&'a str>,
    pub bbox: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_m: Option<u32>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response of `POST /v1/population/vintages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VintagesResponse {
    #[serde(default)]
    pub vintages: Vec<u16>,
}

impl VintagesResponse {
    /// Most recent vintage, if any
    pub fn latest(&self) -> Option<u16> {
        self.vintages.iter().copied().max()
    }
}

/// A single-band raster payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RasterPayload {
    pub rows: usize,
    pub cols: usize,
    pub transform: [f64; 6],
    #[serde(default)]
    pub nodata: Option<f64>,
    /// Row-major values; `null` is no value
    pub values: Vec<Option<f64>>,
}

impl RasterPayload {
    pub fn into_raster(self) -> Result<Raster<f64>> {
        let values = self.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        let mut raster = Raster::from_vec(values, self.rows, self.cols)
            .map_err(|e| CloudError::Decode(format!("raster payload: {e}")))?;
        raster.set_transform(GeoTransform::from_gdal(self.transform));
        raster.set_nodata(self.nodata);
        Ok(raster)
    }
}

/// Per-location radar stack statistics over the requested grid.
#[derive(Debug, Clone, Deserialize)]
pub struct RadarSummaryPayload {
    pub rows: usize,
    pub cols: usize,
    pub mean: Vec<Option<f64>>,
    pub std_dev: Vec<Option<f64>>,
    pub count: Vec<u32>,
}

impl RadarSummaryPayload {
    /// Convert to a [`StackSummary`] aligned to `grid`.
    ///
    /// # Errors
    /// `Decode` if the payload does not match the requested grid.
    pub fn into_summary(self, grid: &GridSpec) -> Result<StackSummary> {
        if (self.rows, self.cols) != grid.shape() {
            return Err(CloudError::Decode(format!(
                "radar summary is {}x{}, requested grid is {}x{}",
                self.rows, self.cols, grid.rows, grid.cols
            )));
        }

        let band = |values: Vec<Option<f64>>, name: &str| -> Result<Raster<f64>> {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            let mut r = Raster::from_vec(values, grid.rows, grid.cols)
                .map_err(|e| CloudError::Decode(format!("radar {name}: {e}")))?;
            r.set_transform(grid.transform);
            r.set_nodata(Some(f64::NAN));
            Ok(r)
        };

        let mean = band(self.mean, "mean")?;
        let std_dev = band(self.std_dev, "std_dev")?;
        let mut count = Raster::from_vec(self.count, grid.rows, grid.cols)
            .map_err(|e| CloudError::Decode(format!("radar count: {e}")))?;
        count.set_transform(grid.transform);

        Ok(StackSummary::new(mean, std_dev, count)?)
    }
}

// ---------------------------------------------------------------------------
// GeoJSON footprints
// ---------------------------------------------------------------------------

/// Decode a GeoJSON FeatureCollection body into footprint features.
///
/// Features whose geometry cannot be represented are kept without geometry,
/// so the count still reflects what the catalog returned.
pub fn footprints_from_geojson(body: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = body
        .parse()
        .map_err(|e| CloudError::Decode(format!("footprint GeoJSON: {e}")))?;

    let GeoJson::FeatureCollection(fc) = geojson else {
        return Err(CloudError::Decode(
            "footprint response is not a FeatureCollection".into(),
        ));
    };

    Ok(fc.features.into_iter().map(convert_feature).collect())
}

fn convert_feature(feature: geojson::Feature) -> Feature {
    let geometry = feature.geometry.and_then(|g| match geo_types::Geometry::<f64>::try_from(g) {
        Ok(geom) => Some(geom),
        Err(e) => {
            tracing::debug!("skipping footprint geometry: {e}");
            None
        }
    });

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, attribute_value(v)))
        .collect();

    let id = feature.id.map(|id| match id {
        geojson::feature::Id::String(s) => s,
        geojson::feature::Id::Number(n) => n.to_string(),
    });

    Feature {
        geometry,
        properties,
        id,
    }
}

fn attribute_value(value: serde_json::Value) -> AttributeValue {
    use serde_json::Value;

    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::String(s),
        other => AttributeValue::String(other.to_string()),
    }
}
