//! Per-location reduction of an observation stack
//!
//! Turns a time-ordered list of co-registered backscatter rasters into the
//! mean / sample standard deviation / count triple the change detector works
//! from. No-data (NaN or the raster's nodata value) is skipped per cell, so the
//! count can vary across the grid.

use crate::maybe_rayon::*;
use sarwatch_core::raster::Raster;
use sarwatch_core::{Error, Result, StackSummary};

/// Reduce a stack of observations to a [`StackSummary`].
///
/// Uses Welford's online update per cell. The standard deviation uses the
/// `n - 1` denominator and is 0 for a single observation. Cells with no
/// observation get count 0 and NaN mean / std-dev.
///
/// # Errors
/// - `InvalidParameter` if `observations` is empty
/// - `SizeMismatch` if the rasters do not share one shape
pub fn summarize_stack(observations: &[Raster<f64>]) -> Result<StackSummary> {
    let first = observations.first().ok_or_else(|| Error::InvalidParameter {
        name: "observations",
        value: "0".into(),
        reason: "an observation stack needs at least one raster".into(),
    })?;
    for obs in &observations[1..] {
        first.ensure_same_shape(obs)?;
    }

    let (rows, cols) = first.shape();

    let cells: Vec<(f64, f64, u32)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out = Vec::with_capacity(cols);
            for col in 0..cols {
                let mut n = 0u32;
                let mut mean = 0.0;
                let mut m2 = 0.0;
                for obs in observations {
                    let v = unsafe { obs.get_unchecked(row, col) };
                    if obs.is_nodata(v) {
                        continue;
                    }
                    n += 1;
                    let delta = v - mean;
                    mean += delta / f64::from(n);
                    m2 += delta * (v - mean);
                }
                out.push(match n {
                    0 => (f64::NAN, f64::NAN, 0),
                    1 => (mean, 0.0, 1),
                    _ => (mean, (m2 / f64::from(n - 1)).sqrt(), n),
                });
            }
            out
        })
        .collect();

    let mut means = Vec::with_capacity(cells.len());
    let mut std_devs = Vec::with_capacity(cells.len());
    let mut counts = Vec::with_capacity(cells.len());
    for (m, s, n) in cells {
        means.push(m);
        std_devs.push(s);
        counts.push(n);
    }

    let transform = *first.transform();
    let mut mean = Raster::from_vec(means, rows, cols)?;
    let mut std_dev = Raster::from_vec(std_devs, rows, cols)?;
    let mut count = Raster::from_vec(counts, rows, cols)?;
    for r in [&mut mean, &mut std_dev] {
        r.set_transform(transform);
        r.set_nodata(Some(f64::NAN));
    }
    count.set_transform(transform);

    StackSummary::new(mean, std_dev, count)
}
