//! Dataset selectors for the remote catalogs an analysis draws on.
//!
//! Each selector maps to a catalog identifier on the processing service.
//! They are configuration choices, not hard-coded: footprint catalogs differ
//! widely in coverage by region, and population rasters trade resolution
//! against global coverage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel-1 GRD archive used for both observation windows.
pub const RADAR_COLLECTION: &str = "COPERNICUS/S1_GRD";

/// Building-footprint catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FootprintSource {
    /// Google Open Buildings V3. Strong in Africa, South and Southeast Asia and
    /// Latin America; sparse in Eastern Europe.
    #[default]
    GoogleOpenBuildings,
    /// OpenStreetMap buildings (community catalog). Broadest coverage for
    /// Eastern Europe and Russia, uneven completeness.
    OpenStreetMap,
    /// Global Building Atlas polygons.
    GlobalBuildingAtlas,
    /// Microsoft ML building footprints.
    MicrosoftBuildings,
}

impl FootprintSource {
    pub const ALL: [FootprintSource; 4] = [
        Self::GoogleOpenBuildings,
        Self::OpenStreetMap,
        Self::GlobalBuildingAtlas,
        Self::MicrosoftBuildings,
    ];

    /// Catalog identifier on the processing service
    pub fn collection_id(&self) -> &'static str {
        match self {
            Self::GoogleOpenBuildings => "GOOGLE/Research/open-buildings/v3/polygons",
            Self::OpenStreetMap => "projects/sat-io/open-datasets/OSM/buildings",
            Self::GlobalBuildingAtlas => "projects/sat-io/open-datasets/GBA/polygons",
            Self::MicrosoftBuildings => "projects/sat-io/open-datasets/MSBuildings/global",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::GoogleOpenBuildings => "Google Open Buildings (V3)",
            Self::OpenStreetMap => "OpenStreetMap (OSM)",
            Self::GlobalBuildingAtlas => "Global Building Atlas (GBA)",
            Self::MicrosoftBuildings => "Microsoft Building Footprints",
        }
    }

    /// Source to suggest when this one returns no footprints
    pub fn fallback(&self) -> Option<FootprintSource> {
        (*self != Self::OpenStreetMap).then_some(Self::OpenStreetMap)
    }
}

impl FromStr for FootprintSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" | "google-open-buildings" | "open-buildings" => Ok(Self::GoogleOpenBuildings),
            "osm" | "openstreetmap" | "open-street-map" => Ok(Self::OpenStreetMap),
            "gba" | "global-building-atlas" => Ok(Self::GlobalBuildingAtlas),
            "microsoft" | "ms" | "microsoft-buildings" => Ok(Self::MicrosoftBuildings),
            _ => Err(Error::UnknownSelector {
                kind: "footprint source",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FootprintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Radar polarization band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Polarization {
    /// Vertical transmit / vertical receive; most sensitive to built structures.
    #[default]
    VV,
    /// Vertical transmit / horizontal receive.
    VH,
}

impl Polarization {
    pub fn band(&self) -> &'static str {
        match self {
            Self::VV => "VV",
            Self::VH => "VH",
        }
    }
}

impl FromStr for Polarization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Self::VV),
            "VH" => Ok(Self::VH),
            _ => Err(Error::UnknownSelector {
                kind: "polarization",
                value: s.to_string(),
            }),
        }
    }
}

/// Population-count raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopulationSource {
    /// High-resolution regional raster (WorldPop, Ukraine country subset).
    Regional,
    /// Coarse global fallback (GPW v4.11 population count).
    Global,
    /// Fixed global 100 m WorldPop raster at the 2020 baseline.
    GlobalFine,
}

impl PopulationSource {
    pub fn collection_id(&self) -> &'static str {
        match self {
            Self::Regional | Self::GlobalFine => "WorldPop/GP/100m/pop",
            Self::Global => "CIESIN/GPWv411/GPW_Population_Count",
        }
    }

    /// ISO-3 country filter applied to the collection, if any
    pub fn country(&self) -> Option<&'static str> {
        match self {
            Self::Regional => Some("UKR"),
            Self::Global | Self::GlobalFine => None,
        }
    }

    /// Nominal cell size in metres
    pub fn nominal_scale_m(&self) -> u32 {
        match self {
            Self::Regional | Self::GlobalFine => 100,
            Self::Global => 1000,
        }
    }

    /// Vintage pinned by this source; `None` means "latest available"
    pub fn fixed_vintage(&self) -> Option<u16> {
        match self {
            Self::GlobalFine => Some(2020),
            Self::Regional | Self::Global => None,
        }
    }
}

impl fmt::Display for PopulationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} m", self.collection_id(), self.nominal_scale_m())
    }
}
