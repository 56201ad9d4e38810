//! Statistical reductions over raster regions

pub mod region;

pub use region::{
    reduce_region, OnBudgetExceeded, Reducer, ReductionBudget, RegionReduction, DEFAULT_MAX_CELLS,
};
