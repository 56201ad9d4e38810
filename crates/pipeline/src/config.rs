//! Analysis configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) gives the
//! standard analysis:
//!
//! ```toml
//! threshold = 3.5
//! cell_size_deg = 0.0001
//! polarization = "VV"
//! population_policy = "geofenced"
//! radar_cache_capacity = 16
//! keep_small_footprints = true
//! max_grid_cells = 100000000
//!
//! [budget]
//! max_cells = 1000000000
//! on_exceed = "fail"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use sarwatch_algorithms::imagery::DAMAGE_THRESHOLD;
use sarwatch_algorithms::impact::PopulationPolicy;
use sarwatch_algorithms::statistics::ReductionBudget;
use sarwatch_core::Polarization;

use crate::error::{AnalysisError, Result};

/// Default analysis cell size, about 10 m at mid latitudes
pub const DEFAULT_CELL_SIZE_DEG: f64 = 0.0001;

/// Largest analysis grid a run will allocate
pub const DEFAULT_MAX_GRID_CELLS: u64 = 100_000_000;

/// Tunables of one analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Welch score above which a structure counts as damaged
    pub threshold: f64,
    /// Analysis grid cell size in degrees
    pub cell_size_deg: f64,
    pub polarization: Polarization,
    pub population_policy: PopulationPolicy,
    /// Radar summaries kept in memory; 0 disables the cache
    pub radar_cache_capacity: usize,
    pub keep_small_footprints: bool,
    /// Analysis grids above this many cells are refused before any data is fetched
    pub max_grid_cells: u64,
    pub budget: ReductionBudget,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: DAMAGE_THRESHOLD,
            cell_size_deg: DEFAULT_CELL_SIZE_DEG,
            polarization: Polarization::VV,
            population_policy: PopulationPolicy::Geofenced,
            radar_cache_capacity: 16,
            keep_small_footprints: true,
            max_grid_cells: DEFAULT_MAX_GRID_CELLS,
            budget: ReductionBudget::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| AnalysisError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(AnalysisError::Configuration(format!(
                "threshold must be a finite, non-negative score, got {}",
                self.threshold
            )));
        }
        if !(self.cell_size_deg.is_finite() && self.cell_size_deg > 0.0) {
            return Err(AnalysisError::Configuration(format!(
                "cell_size_deg must be positive, got {}",
                self.cell_size_deg
            )));
        }
        if self.max_grid_cells == 0 {
            return Err(AnalysisError::Configuration("max_grid_cells must be positive".into()));
        }
        if self.budget.max_cells == 0 {
            return Err(AnalysisError::Configuration("budget.max_cells must be positive".into()));
        }
        Ok(())
    }
}
