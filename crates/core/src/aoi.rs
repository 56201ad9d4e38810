//! Area of interest parsing and geometry

use std::fmt;
use std::str::FromStr;

use geo_types::{coord, Polygon, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, GridSpec};

/// Axis-aligned lon/lat rectangle an analysis runs over.
///
/// Always satisfies `min_lon < max_lon` and `min_lat < max_lat` with finite
/// bounds; use [`AreaOfInterest::new`] or [`str::parse`] to build one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaOfInterest {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl AreaOfInterest {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let input = format!("{min_lon}, {min_lat}, {max_lon}, {max_lat}");
        let invalid = |reason: &str| Error::InvalidAoi {
            input: input.clone(),
            reason: reason.to_string(),
        };

        if ![min_lon, min_lat, max_lon, max_lat].iter().all(|v| v.is_finite()) {
            return Err(invalid("bounds must be finite numbers"));
        }
        if min_lon >= max_lon {
            return Err(invalid("min_lon must be less than max_lon"));
        }
        if min_lat >= max_lat {
            return Err(invalid("min_lat must be less than max_lat"));
        }

        Ok(Self { min_lon, min_lat, max_lon, max_lat })
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Bounds as `[west, south, east, north]`
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Whether the two rectangles share interior area
    pub fn intersects(&self, other: &AreaOfInterest) -> bool {
        self.min_lon < other.max_lon
            && self.max_lon > other.min_lon
            && self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
    }

    /// Closed containment test for a lon/lat point
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        Rect::new(
            coord! { x: self.min_lon, y: self.min_lat },
            coord! { x: self.max_lon, y: self.max_lat },
        )
        .to_polygon()
    }

    /// North-up analysis grid covering the AOI with square cells of
    /// `cell_size` degrees. Partial edge cells are kept.
    pub fn grid_spec(&self, cell_size: f64) -> Result<GridSpec> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(Error::InvalidParameter {
                name: "cell_size",
                value: cell_size.to_string(),
                reason: "must be a positive number of degrees".into(),
            });
        }

        // Small epsilon so 0.2 / 0.0001 does not round up to an extra column
        let cells = |extent: f64| ((extent / cell_size) - 1e-9).ceil().max(1.0);
        let (rows, cols) = (cells(self.height()), cells(self.width()));
        let too_large = || Error::InvalidParameter {
            name: "cell_size",
            value: cell_size.to_string(),
            reason: format!("a {rows} x {cols} grid cannot be addressed"),
        };
        if rows * cols > usize::MAX as f64 {
            return Err(too_large());
        }

        let grid = GridSpec::new(
            GeoTransform::new(self.min_lon, self.max_lat, cell_size, -cell_size),
            rows as usize,
            cols as usize,
        );
        grid.cell_count().ok_or_else(too_large)?;
        Ok(grid)
    }

    /// Exact bit pattern of the bounds, for cache keys
    pub fn cache_key(&self) -> [u64; 4] {
        self.to_array().map(f64::to_bits)
    }
}

impl FromStr for AreaOfInterest {
    type Err = Error;

    /// Parse `"minLon, minLat, maxLon, maxLat"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidAoi {
            input: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(invalid(format!("expected 4 comma-separated bounds, got {}", parts.len())));
        }

        let mut bounds = [0.0; 4];
        for (slot, part) in bounds.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .map_err(|_| invalid(format!("'{part}' is not a number")))?;
        }

        Self::new(bounds[0], bounds[1], bounds[2], bounds[3]).map_err(|e| match e {
            Error::InvalidAoi { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl fmt::Display for AreaOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_default_aoi() {
        let aoi: AreaOfInterest = "37.45, 47.05, 37.65, 47.15".parse().unwrap();
        assert_relative_eq!(aoi.min_lon(), 37.45);
        assert_relative_eq!(aoi.max_lat(), 47.15);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        let err = "37.45, 47.05, 37.65".parse::<AreaOfInterest>().unwrap_err();
        assert!(matches!(err, Error::InvalidAoi { .. }));
    }

    #[test]
    fn test_parse_rejects_non_numbers() {
        assert!("37.45, north, 37.65, 47.15".parse::<AreaOfInterest>().is_err());
        assert!("37.45, NaN, 37.65, 47.15".parse::<AreaOfInterest>().is_err());
    }

    #[test]
    fn test_parse_rejects_degenerate_bounds() {
        assert!("37.65, 47.05, 37.45, 47.15".parse::<AreaOfInterest>().is_err());
        assert!("37.45, 47.15, 37.65, 47.15".parse::<AreaOfInterest>().is_err());
    }

    #[test]
    fn test_intersects() {
        let ukraine = AreaOfInterest::new(22.1, 44.4, 40.2, 52.4).unwrap();
        let donbas = AreaOfInterest::new(37.45, 47.05, 37.65, 47.15).unwrap();
        let gaza = AreaOfInterest::new(34.2, 31.2, 34.6, 31.6).unwrap();

        assert!(donbas.intersects(&ukraine));
        assert!(ukraine.intersects(&donbas));
        assert!(!gaza.intersects(&ukraine));
    }

    #[test]
    fn test_grid_spec() {
        let aoi = AreaOfInterest::new(37.45, 47.05, 37.65, 47.15).unwrap();
        let grid = aoi.grid_spec(0.001).unwrap();
        assert_eq!(grid.shape(), (100, 200));
        assert_relative_eq!(grid.transform.origin_x, 37.45);
        assert_relative_eq!(grid.transform.origin_y, 47.15);
        assert!(aoi.grid_spec(0.0).is_err());
    }

    #[test]
    fn test_grid_spec_rejects_unaddressable_grid() {
        let world = AreaOfInterest::new(-180.0, -90.0, 180.0, 90.0).unwrap();
        let err = world.grid_spec(1e-8).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "cell_size", .. }));
    }

    #[test]
    fn test_country_grid_cell_count() {
        let ukraine = AreaOfInterest::new(22.1, 44.4, 40.2, 52.4).unwrap();
        let grid = ukraine.grid_spec(0.0001).unwrap();
        assert_eq!(grid.shape(), (80_000, 181_000));
        assert_eq!(grid.cell_count(), Some(14_480_000_000));
    }
}
