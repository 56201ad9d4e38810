//! Welch t-test change detection
//!
//! Compares the pre- and post-event backscatter distributions at every
//! structure location with the unequal-variance two-sample t statistic:
//!
//! ```text
//! t = |m_pre - m_post| / sqrt(s_pre² / n_pre + s_post² / n_post)
//! ```
//!
//! Only the magnitude is kept, so a drop and a rise in backscatter score the
//! same. Locations without a building footprint are never evaluated.

use ndarray::Array2;
use crate::maybe_rayon::*;
use sarwatch_core::raster::Raster;
use sarwatch_core::{Algorithm, Error, Result, SampleStats, StackSummary};

/// Score above which a structure location is flagged as likely damaged
pub const DAMAGE_THRESHOLD: f64 = 3.5;

/// Structure-mask value marking a building footprint
pub const STRUCTURE: u8 = 1;

/// Welch t magnitude for one location.
///
/// Equal means score 0 for any valid variances, zero included. Otherwise
/// returns `None` ("no signal") when either window has no observation, when a
/// mean or variance is not finite, or when the pooled variance of the means
/// is zero.
pub fn welch_t(pre: SampleStats, post: SampleStats) -> Option<f64> {
    let pooled = pre.variance_of_mean()? + post.variance_of_mean()?;
    if !(pooled.is_finite() && pre.mean.is_finite() && post.mean.is_finite()) {
        return None;
    }
    if pre.mean == post.mean {
        return Some(0.0);
    }
    if pooled <= 0.0 {
        return None;
    }
    Some((pre.mean - post.mean).abs() / pooled.sqrt())
}

/// Parameters for damage detection
#[derive(Debug, Clone)]
pub struct ChangeDetectionParams {
    /// Strict lower bound on the score for a damaged cell
    pub threshold: f64,
}

impl Default for ChangeDetectionParams {
    fn default() -> Self {
        Self {
            threshold: DAMAGE_THRESHOLD,
        }
    }
}

/// Output of [`detect_damage`]
#[derive(Debug, Clone)]
pub struct ChangeDetectionResult {
    /// Welch t magnitude at structure cells, NaN elsewhere or without signal
    pub score: Raster<f64>,
    /// 1 where a structure scored above the threshold, 0 elsewhere
    pub damage: Raster<u8>,
    /// Structure cells with a computable score
    pub evaluated_cells: usize,
    /// Cells set in `damage`
    pub damaged_cells: usize,
}

/// Per-location Welch score restricted to the structure mask.
///
/// # Errors
/// - `SizeMismatch` if the summaries and mask differ in shape
/// - `InsufficientData` if either window has no observation anywhere; no
///   score is computed in that case
pub fn welch_change_score(
    pre: &StackSummary,
    post: &StackSummary,
    structures: &Raster<u8>,
) -> Result<Raster<f64>> {
    pre.mean().ensure_same_shape(post.mean())?;
    pre.mean().ensure_same_shape(structures)?;

    if !pre.has_observations() {
        return Err(Error::InsufficientData { window: "pre" });
    }
    if !post.has_observations() {
        return Err(Error::InsufficientData { window: "post" });
    }

    let (rows, cols) = pre.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if unsafe { structures.get_unchecked(row, col) } != STRUCTURE {
                    continue;
                }
                let (a, b) = unsafe { (pre.at_unchecked(row, col), post.at_unchecked(row, col)) };
                if let Some(t) = welch_t(a, b) {
                    *out = t;
                }
            }
            row_data
        })
        .collect();

    let mut score = structures.with_same_meta::<f64>(rows, cols);
    score.set_nodata(Some(f64::NAN));
    *score.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(score)
}

/// Threshold a score raster into a binary damage mask.
///
/// A cell is 1 iff it is a structure and its score is strictly greater than
/// `threshold`. No-signal (NaN) cells are never damaged.
pub fn damage_mask(score: &Raster<f64>, structures: &Raster<u8>, threshold: f64) -> Result<Raster<u8>> {
    score.ensure_same_shape(structures)?;

    let mut mask = structures.with_same_meta::<u8>(score.rows(), score.cols());
    ndarray::Zip::from(mask.data_mut())
        .and(score.data())
        .and(structures.data())
        .for_each(|m, &t, &s| {
            *m = u8::from(s == STRUCTURE && t > threshold);
        });

    Ok(mask)
}

/// Score, threshold and count in one pass over the inputs.
pub fn detect_damage(
    pre: &StackSummary,
    post: &StackSummary,
    structures: &Raster<u8>,
    params: &ChangeDetectionParams,
) -> Result<ChangeDetectionResult> {
    if !(params.threshold.is_finite() && params.threshold >= 0.0) {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: params.threshold.to_string(),
            reason: "must be a finite, non-negative score".into(),
        });
    }

    let score = welch_change_score(pre, post, structures)?;
    let damage = damage_mask(&score, structures, params.threshold)?;

    let evaluated_cells = score.data().iter().filter(|v| !v.is_nan()).count();
    let damaged_cells = damage.count_eq(1);
    tracing::debug!(
        evaluated_cells,
        damaged_cells,
        threshold = params.threshold,
        "welch change detection complete"
    );

    Ok(ChangeDetectionResult {
        score,
        damage,
        evaluated_cells,
        damaged_cells,
    })
}

/// Welch t-test damage detector
#[derive(Debug, Clone, Default)]
pub struct WelchChangeDetection;

impl Algorithm for WelchChangeDetection {
    type Input = (StackSummary, StackSummary, Raster<u8>);
    type Output = ChangeDetectionResult;
    type Params = ChangeDetectionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "WelchChangeDetection"
    }

    fn description(&self) -> &'static str {
        "Flag structures whose pre/post radar backscatter differs by a Welch t magnitude above a threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (pre, post, structures) = input;
        detect_damage(&pre, &post, &structures, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sarwatch_core::{GeoTransform, GridSpec};

    fn grid(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(GeoTransform::new(37.45, 47.15, 0.001, -0.001), rows, cols)
    }

    fn all_structures(grid: &GridSpec) -> Raster<u8> {
        Raster::from_grid(grid, STRUCTURE)
    }

    #[test]
    fn test_literal_scenario() {
        let pre = SampleStats::new(-12.0, 1.0, 10);
        let post = SampleStats::new(-18.0, 1.5, 8);

        let t = welch_t(pre, post).unwrap();
        let expected = 6.0 / (0.1_f64 + 0.28125).sqrt();
        assert_relative_eq!(t, expected, epsilon = 1e-12);
        assert!((t - 9.72).abs() < 0.01);

        let g = grid(1, 1);
        let result = detect_damage(
            &StackSummary::uniform(&g, pre),
            &StackSummary::uniform(&g, post),
            &all_structures(&g),
            &ChangeDetectionParams::default(),
        )
        .unwrap();
        assert_eq!(result.damage.get(0, 0).unwrap(), 1);
        assert_eq!(result.damaged_cells, 1);
    }

    #[test]
    fn test_symmetric_under_swap() {
        let cases = [
            (SampleStats::new(-12.0, 1.0, 10), SampleStats::new(-18.0, 1.5, 8)),
            (SampleStats::new(-7.5, 0.4, 3), SampleStats::new(-6.1, 2.2, 40)),
            (SampleStats::new(0.0, 3.0, 1), SampleStats::new(1.0, 0.0, 1)),
        ];
        for (a, b) in cases {
            assert_eq!(welch_t(a, b), welch_t(b, a));
        }
    }

    #[test]
    fn test_equal_means_score_zero() {
        let a = SampleStats::new(-14.2, 0.7, 12);
        let b = SampleStats::new(-14.2, 2.9, 5);
        assert_eq!(welch_t(a, b), Some(0.0));

        let flat = SampleStats::new(-14.2, 0.0, 3);
        assert_eq!(welch_t(flat, flat), Some(0.0));
    }

    #[test]
    fn test_zero_count_is_no_signal() {
        let a = SampleStats::new(-12.0, 1.0, 10);
        let empty = SampleStats::new(f64::NAN, f64::NAN, 0);
        assert_eq!(welch_t(a, empty), None);
        assert_eq!(welch_t(empty, a), None);
    }

    #[test]
    fn test_zero_pooled_variance_is_no_signal() {
        let a = SampleStats::new(-12.0, 0.0, 1);
        let b = SampleStats::new(-18.0, 0.0, 1);
        assert_eq!(welch_t(a, b), None);
    }

    #[test]
    fn test_window_without_observations() {
        let g = grid(2, 2);
        let pre = StackSummary::uniform(&g, SampleStats::new(-12.0, 1.0, 10));
        let post = StackSummary::uniform(&g, SampleStats::new(f64::NAN, f64::NAN, 0));

        let err = welch_change_score(&pre, &post, &all_structures(&g)).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { window: "post" }));

        let err = welch_change_score(&post, &pre, &all_structures(&g)).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { window: "pre" }));
    }

    #[test]
    fn test_outside_structures_not_evaluated() {
        let g = grid(2, 2);
        let pre = StackSummary::uniform(&g, SampleStats::new(-12.0, 1.0, 10));
        let post = StackSummary::uniform(&g, SampleStats::new(-18.0, 1.5, 8));
        let mut structures: Raster<u8> = Raster::from_grid(&g, 0);
        structures.set(0, 1, STRUCTURE).unwrap();

        let result = detect_damage(&pre, &post, &structures, &ChangeDetectionParams::default()).unwrap();

        assert!(result.score.get(0, 0).unwrap().is_nan());
        assert!(result.score.get(0, 1).unwrap() > DAMAGE_THRESHOLD);
        assert_eq!(result.evaluated_cells, 1);
        assert_eq!(result.damage.count_eq(1), 1);
        assert_eq!(result.damage.get(1, 1).unwrap(), 0);
    }

    #[test]
    fn test_mask_iff_score_above_threshold_and_structure() {
        let scores = Raster::from_vec(vec![3.5, 3.6, f64::NAN, 12.0, 0.0, 9.0], 2, 3).unwrap();
        let structures = Raster::from_vec(vec![1, 1, 1, 0, 1, 1], 2, 3).unwrap();

        let mask = damage_mask(&scores, &structures, DAMAGE_THRESHOLD).unwrap();

        assert_eq!(mask.data().iter().copied().collect::<Vec<u8>>(), vec![0, 1, 0, 0, 0, 1]);
        for ((m, s), t) in mask.data().iter().zip(structures.data()).zip(scores.data()) {
            assert_eq!(*m == 1, *s == STRUCTURE && *t > DAMAGE_THRESHOLD);
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let g = grid(1, 1);
        let s = StackSummary::uniform(&g, SampleStats::new(-12.0, 1.0, 10));
        let params = ChangeDetectionParams { threshold: f64::NAN };
        assert!(detect_damage(&s, &s, &all_structures(&g), &params).is_err());
    }

    #[test]
    fn test_algorithm_trait() {
        let g = grid(3, 3);
        let input = (
            StackSummary::uniform(&g, SampleStats::new(-12.0, 1.0, 10)),
            StackSummary::uniform(&g, SampleStats::new(-12.5, 1.0, 10)),
            all_structures(&g),
        );
        let detector = WelchChangeDetection;
        assert_eq!(detector.name(), "WelchChangeDetection");

        let result = detector.execute_default(input).unwrap();
        assert_eq!(result.evaluated_cells, 9);
        assert_eq!(result.damaged_cells, 0);
    }
}
