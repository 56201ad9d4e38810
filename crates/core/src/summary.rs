//! Per-location summaries of an observation stack

use crate::error::{Error, Result};
use crate::raster::{GridSpec, Raster};

/// Mean, sample standard deviation and observation count at one location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: u32,
}

impl SampleStats {
    pub fn new(mean: f64, std_dev: f64, count: u32) -> Self {
        Self { mean, std_dev, count }
    }

    /// Squared standard error of the mean, `s² / n`. `None` when `n = 0`.
    pub fn variance_of_mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.std_dev * self.std_dev / f64::from(self.count))
    }
}

/// Summary of one time window's radar stack over the analysis grid.
///
/// All three rasters share one shape and transform. `count` is the number of
/// observations that contributed at each location; where it is zero the mean
/// and standard deviation carry no information.
#[derive(Debug, Clone)]
pub struct StackSummary {
    mean: Raster<f64>,
    std_dev: Raster<f64>,
    count: Raster<u32>,
}

impl StackSummary {
    pub fn new(mean: Raster<f64>, std_dev: Raster<f64>, count: Raster<u32>) -> Result<Self> {
        mean.ensure_same_shape(&std_dev)?;
        mean.ensure_same_shape(&count)?;
        Ok(Self { mean, std_dev, count })
    }

    /// Summary with the same statistics at every cell of `grid`
    pub fn uniform(grid: &GridSpec, stats: SampleStats) -> Self {
        Self {
            mean: Raster::from_grid(grid, stats.mean),
            std_dev: Raster::from_grid(grid, stats.std_dev),
            count: Raster::from_grid(grid, stats.count),
        }
    }

    pub fn mean(&self) -> &Raster<f64> {
        &self.mean
    }

    pub fn std_dev(&self) -> &Raster<f64> {
        &self.std_dev
    }

    pub fn count(&self) -> &Raster<u32> {
        &self.count
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mean.shape()
    }

    pub fn grid(&self) -> GridSpec {
        self.mean.grid()
    }

    /// Statistics at (row, col)
    pub fn at(&self, row: usize, col: usize) -> Result<SampleStats> {
        Ok(SampleStats {
            mean: self.mean.get(row, col)?,
            std_dev: self.std_dev.get(row, col)?,
            count: self.count.get(row, col)?,
        })
    }

    /// Statistics at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < rows and col < cols
    pub unsafe fn at_unchecked(&self, row: usize, col: usize) -> SampleStats {
        unsafe {
            SampleStats {
                mean: self.mean.get_unchecked(row, col),
                std_dev: self.std_dev.get_unchecked(row, col),
                count: self.count.get_unchecked(row, col),
            }
        }
    }

    /// Largest per-location observation count
    pub fn max_count(&self) -> u32 {
        self.count.data().iter().copied().max().unwrap_or(0)
    }

    /// Whether any location has at least one observation
    pub fn has_observations(&self) -> bool {
        self.max_count() > 0
    }
}

impl TryFrom<(Raster<f64>, Raster<f64>, Raster<u32>)> for StackSummary {
    type Error = Error;

    fn try_from((mean, std_dev, count): (Raster<f64>, Raster<f64>, Raster<u32>)) -> Result<Self> {
        Self::new(mean, std_dev, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use approx::assert_relative_eq;

    #[test]
    fn test_variance_of_mean() {
        let s = SampleStats::new(-12.0, 1.0, 10);
        assert_relative_eq!(s.variance_of_mean().unwrap(), 0.1);
        assert!(SampleStats::new(-12.0, 1.0, 0).variance_of_mean().is_none());
    }

    #[test]
    fn test_shape_checked() {
        let mean: Raster<f64> = Raster::new(2, 2);
        let sd: Raster<f64> = Raster::new(2, 2);
        let count: Raster<u32> = Raster::new(2, 3);
        assert!(StackSummary::new(mean, sd, count).is_err());
    }

    #[test]
    fn test_uniform_summary() {
        let grid = GridSpec::new(GeoTransform::new(0.0, 2.0, 1.0, -1.0), 2, 2);
        let summary = StackSummary::uniform(&grid, SampleStats::new(-18.0, 1.5, 8));
        assert_eq!(summary.at(1, 1).unwrap().count, 8);
        assert_eq!(summary.max_count(), 8);
        assert!(summary.has_observations());
    }
}
