//! Severity buckets for presentation of damage scores
//!
//! These classes only drive map styling and summary counts. The damage mask
//! itself is the single threshold cut (default
//! [`DAMAGE_THRESHOLD`](super::DAMAGE_THRESHOLD)), and only masked cells are
//! classified.

use ndarray::Array2;
use serde::Serialize;
use crate::maybe_rayon::*;
use sarwatch_core::raster::Raster;
use sarwatch_core::{Error, Result};

/// Score range the damage palette is stretched over
pub const DISPLAY_RANGE: (f64, f64) = (3.5, 10.0);

/// Presentation class of a damage score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DamageSeverity {
    /// T > 3.5
    Likely,
    /// T > 5
    Significant,
    /// T > 8
    Severe,
}

impl DamageSeverity {
    /// All classes, mildest first
    pub const ALL: [DamageSeverity; 3] = [Self::Likely, Self::Significant, Self::Severe];

    /// Strict lower bound on the score for this class
    pub fn min_score(&self) -> f64 {
        match self {
            Self::Likely => 3.5,
            Self::Significant => 5.0,
            Self::Severe => 8.0,
        }
    }

    /// Class for a score, or `None` below the likely-damage cut or without signal
    pub fn classify(score: f64) -> Option<Self> {
        Self::ALL.iter().rev().copied().find(|s| score > s.min_score())
    }

    /// Raster code: 1 likely, 2 significant, 3 severe (0 is unclassified)
    pub fn code(&self) -> u8 {
        match self {
            Self::Likely => 1,
            Self::Significant => 2,
            Self::Severe => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Likely => "Likely Damage (T > 3.5)",
            Self::Significant => "Significant Damage (T > 5)",
            Self::Severe => "Severe Destruction (T > 8)",
        }
    }

    /// Legend colour
    pub fn color(&self) -> &'static str {
        match self {
            Self::Likely => "#ffffb2",
            Self::Significant => "#fd8d3c",
            Self::Severe => "#e31a1c",
        }
    }
}

/// Number of cells per severity class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub likely: usize,
    pub significant: usize,
    pub severe: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.likely + self.significant + self.severe
    }

    pub fn get(&self, severity: DamageSeverity) -> usize {
        match severity {
            DamageSeverity::Likely => self.likely,
            DamageSeverity::Significant => self.significant,
            DamageSeverity::Severe => self.severe,
        }
    }
}

/// Reclassify damaged cells into severity codes.
///
/// Only cells set in `damage` are classified; everything else is 0, so a
/// raised detection threshold also empties the milder classes. Damaged cells
/// scoring at or below the likely-damage cut stay 0.
pub fn classify_severity(score: &Raster<f64>, damage: &Raster<u8>) -> Result<Raster<u8>> {
    score.ensure_same_shape(damage)?;
    let (rows, cols) = score.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    if unsafe { damage.get_unchecked(row, col) } != 1 {
                        return 0;
                    }
                    let t = unsafe { score.get_unchecked(row, col) };
                    DamageSeverity::classify(t).map_or(0, |s| s.code())
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    let mut output = score.with_same_meta::<u8>(rows, cols);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Count cells per class in a [`classify_severity`] raster
pub fn severity_counts(classes: &Raster<u8>) -> SeverityCounts {
    classes
        .data()
        .iter()
        .fold(SeverityCounts::default(), |mut acc, &code| {
            match code {
                1 => acc.likely += 1,
                2 => acc.significant += 1,
                3 => acc.severe += 1,
                _ => {}
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(DamageSeverity::classify(3.5), None);
        assert_eq!(DamageSeverity::classify(3.51), Some(DamageSeverity::Likely));
        assert_eq!(DamageSeverity::classify(5.0), Some(DamageSeverity::Likely));
        assert_eq!(DamageSeverity::classify(5.5), Some(DamageSeverity::Significant));
        assert_eq!(DamageSeverity::classify(8.01), Some(DamageSeverity::Severe));
        assert_eq!(DamageSeverity::classify(f64::NAN), None);
    }

    #[test]
    fn test_classify_raster_and_counts() {
        let score = Raster::from_vec(vec![f64::NAN, 1.0, 4.0, 6.0, 9.72, 20.0], 2, 3).unwrap();
        let damage = Raster::from_vec(vec![0u8, 0, 1, 1, 1, 1], 2, 3).unwrap();

        let classes = classify_severity(&score, &damage).unwrap();
        assert_eq!(classes.data().iter().copied().collect::<Vec<u8>>(), vec![0, 0, 1, 2, 3, 3]);

        let counts = severity_counts(&classes);
        assert_eq!(counts, SeverityCounts { likely: 1, significant: 1, severe: 2 });
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_undamaged_cells_are_unclassified() {
        // Threshold 5: the 4.0 cell scores in the likely band but is not damaged
        let score = Raster::from_vec(vec![4.0, 6.0, 9.0, 2.0], 2, 2).unwrap();
        let damage = Raster::from_vec(vec![0u8, 1, 1, 0], 2, 2).unwrap();

        let counts = severity_counts(&classify_severity(&score, &damage).unwrap());
        assert_eq!(counts, SeverityCounts { likely: 0, significant: 1, severe: 1 });
        assert_eq!(counts.total(), 2);
    }

    #[test]
    fn test_classify_shape_mismatch() {
        let score: Raster<f64> = Raster::new(2, 2);
        let damage: Raster<u8> = Raster::new(2, 3);
        assert!(classify_severity(&score, &damage).is_err());
    }
}
