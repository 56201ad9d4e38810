//! Region reduction
//!
//! Sums or averages a raster over the cells whose centres fall inside an
//! area of interest, optionally weighted by a companion mask. The mask may
//! sit on a finer grid than the values: each value cell then contributes in
//! proportion to the share of mask cells under it that are set.

use serde::{Deserialize, Serialize};
use crate::maybe_rayon::*;
use sarwatch_core::raster::Raster;
use sarwatch_core::{AreaOfInterest, Error, Result};

/// Default maximum number of cells a reduction may visit
pub const DEFAULT_MAX_CELLS: u64 = 1_000_000_000;

/// Reduction applied over the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reducer {
    Sum,
    Mean,
}

/// What to do when a region holds more cells than the budget allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnBudgetExceeded {
    /// Refuse with [`Error::BudgetExceeded`]
    #[default]
    Fail,
    /// Visit the first `max_cells` cells in row-major order and label the
    /// result approximate
    Approximate,
}

/// Processed-cell budget for a reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionBudget {
    pub max_cells: u64,
    pub on_exceed: OnBudgetExceeded,
}

impl Default for ReductionBudget {
    fn default() -> Self {
        Self {
            max_cells: DEFAULT_MAX_CELLS,
            on_exceed: OnBudgetExceeded::Fail,
        }
    }
}

/// Result of [`reduce_region`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionReduction {
    /// Reduced value; NaN for a mean over zero contributing cells
    pub value: f64,
    /// Cells with data and a non-zero mask weight
    pub contributing_cells: u64,
    /// Sum of mask weights over contributing cells; equals
    /// `contributing_cells` without a mask
    pub weight: f64,
    /// Cells inside the region with data, mask ignored
    pub valid_cells: u64,
    /// Cells visited, bounded by the budget
    pub processed_cells: u64,
    /// Cells the region covers on the value grid
    pub region_cells: u64,
    /// Whether the budget cut the reduction short
    pub approximate: bool,
}

#[derive(Default, Clone, Copy)]
struct Partial {
    sum: f64,
    compensation: f64,
    weight: f64,
    contributing: u64,
    valid: u64,
    processed: u64,
}

impl Partial {
    // Neumaier summation keeps large population totals exact to f64 precision
    fn add(&mut self, v: f64) {
        let t = self.sum + v;
        if self.sum.abs() >= v.abs() {
            self.compensation += (self.sum - t) + v;
        } else {
            self.compensation += (v - t) + self.sum;
        }
        self.sum = t;
    }

    fn merge(mut self, other: Partial) -> Partial {
        self.add(other.sum);
        self.add(other.compensation);
        self.weight += other.weight;
        self.contributing += other.contributing;
        self.valid += other.valid;
        self.processed += other.processed;
        self
    }

    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Reduce `values` over `aoi`.
///
/// With a `mask`, each cell is weighted by the fraction of mask cells whose
/// centres fall inside it that read 1. Mask cells beyond the mask's extent
/// count as unset. A value cell too small to hold any mask centre takes the
/// mask value at its own centre. A mean divides by the total weight. No-data
/// values are skipped. The row-ordered merge makes the result identical with
/// and without the `parallel` feature.
///
/// # Errors
/// `BudgetExceeded` when the region holds more than `budget.max_cells` cells
/// and the policy is [`OnBudgetExceeded::Fail`].
pub fn reduce_region(
    values: &Raster<f64>,
    aoi: &AreaOfInterest,
    mask: Option<&Raster<u8>>,
    reducer: Reducer,
    budget: &ReductionBudget,
) -> Result<RegionReduction> {
    let Some((min_row, max_row, min_col, max_col)) = region_window(values, aoi) else {
        return Ok(finish(Partial::default(), 0, false, reducer));
    };

    let width = (max_col - min_col) as u64;
    let region_cells = (max_row - min_row) as u64 * width;

    let approximate = region_cells > budget.max_cells;
    if approximate {
        match budget.on_exceed {
            OnBudgetExceeded::Fail => {
                return Err(Error::BudgetExceeded {
                    cells: region_cells,
                    max_cells: budget.max_cells,
                });
            }
            OnBudgetExceeded::Approximate => tracing::warn!(
                region_cells,
                max_cells = budget.max_cells,
                "reduction exceeds cell budget; result will be approximate"
            ),
        }
    }
    let limit = region_cells.min(budget.max_cells);

    let partials: Vec<Partial> = (min_row..max_row)
        .into_par_iter()
        .map(|row| {
            let mut p = Partial::default();
            let before = (row - min_row) as u64 * width;
            let allowed = limit.saturating_sub(before).min(width) as usize;

            for col in min_col..min_col + allowed {
                p.processed += 1;
                let (x, y) = values.pixel_to_geo(col, row);
                if !aoi.contains_point(x, y) {
                    continue;
                }
                let v = unsafe { values.get_unchecked(row, col) };
                if values.is_nodata(v) {
                    continue;
                }
                p.valid += 1;
                let w = mask.map_or(1.0, |m| mask_weight(m, values, row, col));
                if w <= 0.0 {
                    continue;
                }
                p.contributing += 1;
                p.weight += w;
                p.add(v * w);
            }
            p
        })
        .collect();

    let merged = partials.into_iter().fold(Partial::default(), Partial::merge);
    Ok(finish(merged, region_cells, approximate, reducer))
}

fn finish(p: Partial, region_cells: u64, approximate: bool, reducer: Reducer) -> RegionReduction {
    let value = match reducer {
        Reducer::Sum => p.total(),
        Reducer::Mean if p.weight > 0.0 => p.total() / p.weight,
        Reducer::Mean => f64::NAN,
    };
    RegionReduction {
        value,
        contributing_cells: p.contributing,
        weight: p.weight,
        valid_cells: p.valid,
        processed_cells: p.processed,
        region_cells,
        approximate,
    }
}

/// Fraction of the `mask` cells centred inside value cell `(row, col)` that
/// are set.
fn mask_weight(mask: &Raster<u8>, values: &Raster<f64>, row: usize, col: usize) -> f64 {
    let vt = values.transform();
    let mt = mask.transform();
    let (x0, y0) = vt.pixel_to_geo_corner(col, row);
    let (x1, y1) = vt.pixel_to_geo_corner(col + 1, row + 1);
    let (c0, r0) = mt.geo_to_pixel(x0, y0);
    let (c1, r1) = mt.geo_to_pixel(x1, y1);
    if ![c0, r0, c1, r1].iter().all(|v| v.is_finite()) {
        return 0.0;
    }

    // Mask centres at index + 0.5 inside the half-open span [lo, hi)
    let span = |a: f64, b: f64| ((a.min(b) - 0.5).ceil() as i64, (a.max(b) - 0.5).ceil() as i64);
    let (col_lo, col_hi) = span(c0, c1);
    let (row_lo, row_hi) = span(r0, r1);
    let total = (col_hi - col_lo) * (row_hi - row_lo);

    if total <= 0 {
        let (x, y) = values.pixel_to_geo(col, row);
        return f64::from(u8::from(mask.value_at_geo(x, y) == Some(1)));
    }

    let (rows, cols) = (mask.rows() as i64, mask.cols() as i64);
    let clamp = |v: i64, max: i64| v.clamp(0, max) as usize;
    let data = mask.data();
    let mut set = 0u64;
    for r in clamp(row_lo, rows)..clamp(row_hi, rows) {
        for c in clamp(col_lo, cols)..clamp(col_hi, cols) {
            if data[(r, c)] == 1 {
                set += 1;
            }
        }
    }
    set as f64 / total as f64
}

/// Row/col window `(min_row, max_row, min_col, max_col)` (exclusive maxima)
/// of `values` cells that can have a centre inside `aoi`.
fn region_window(values: &Raster<f64>, aoi: &AreaOfInterest) -> Option<(usize, usize, usize, usize)> {
    let (rows, cols) = values.shape();
    let gt = values.transform();

    let (col_a, row_a) = gt.geo_to_pixel(aoi.min_lon(), aoi.max_lat());
    let (col_b, row_b) = gt.geo_to_pixel(aoi.max_lon(), aoi.min_lat());
    if ![col_a, row_a, col_b, row_b].iter().all(|v| v.is_finite()) {
        return None;
    }

    // A centre at index + 0.5 lies inside [lo, hi] iff index in [lo - 0.5, hi - 0.5]
    let lo = |v: f64, max: usize| ((v - 0.5).ceil().max(0.0) as usize).min(max);
    let hi = |v: f64, max: usize| (((v - 0.5).floor() + 1.0).max(0.0) as usize).min(max);

    let min_col = lo(col_a.min(col_b), cols);
    let max_col = hi(col_a.max(col_b), cols);
    let min_row = lo(row_a.min(row_b), rows);
    let max_row = hi(row_a.max(row_b), rows);

    (min_col < max_col && min_row < max_row).then_some((min_row, max_row, min_col, max_col))
}
