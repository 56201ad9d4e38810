//! # SarWatch Algorithms
//!
//! Local analysis steps for SarWatch.
//!
//! ## Algorithm Categories
//!
//! - **imagery**: Stack summaries, Welch change scoring, severity buckets
//! - **vector**: Footprint rasterization onto the analysis grid
//! - **statistics**: Budgeted region reductions
//! - **impact**: Population source selection and damage impact estimates

pub mod impact;
pub mod imagery;
pub mod statistics;
pub mod vector;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        classify_severity, damage_mask, detect_damage, severity_counts, summarize_stack,
        welch_change_score, welch_t, ChangeDetectionParams, ChangeDetectionResult,
        DamageSeverity, SeverityCounts, WelchChangeDetection, DAMAGE_THRESHOLD,
    };
    pub use crate::impact::{
        estimate_impact, select_population_source, ImpactEstimate, PopulationPolicy,
    };
    pub use crate::statistics::{
        reduce_region, OnBudgetExceeded, Reducer, ReductionBudget, RegionReduction,
    };
    pub use crate::vector::{rasterize_footprints, RasterizeParams, RasterizeStats};
    pub use sarwatch_core::prelude::*;
}
