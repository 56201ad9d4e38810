//! The five inputs of one analysis run.

use chrono::NaiveDate;
use serde::Serialize;

use sarwatch_core::{AreaOfInterest, FootprintSource, TimeWindow};

use crate::error::{AnalysisError, Result};

/// Default area of interest, `minLon, minLat, maxLon, maxLat`
pub const DEFAULT_AOI: &str = "37.45, 47.05, 37.65, 47.15";

/// Default pre-event window
pub const DEFAULT_PRE_WINDOW: &str = "2021-01-01..2021-12-31";

/// Start of the default post-event window; it runs to the current date
pub const DEFAULT_POST_START: &str = "2024-06-01";

/// One analysis request. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub aoi: AreaOfInterest,
    pub footprints: FootprintSource,
    pub pre: TimeWindow,
    pub post: TimeWindow,
}

impl AnalysisRequest {
    pub fn new(aoi: AreaOfInterest, footprints: FootprintSource, pre: TimeWindow, post: TimeWindow) -> Self {
        Self {
            aoi,
            footprints,
            pre,
            post,
        }
    }

    /// Parse a request from its text form.
    ///
    /// # Errors
    /// `InputParse` for malformed or degenerate AOI, window or source text.
    /// Nothing remote is contacted before this succeeds.
    pub fn parse(aoi: &str, footprints: &str, pre: &str, post: &str) -> Result<Self> {
        Ok(Self {
            aoi: aoi.parse()?,
            footprints: footprints.parse()?,
            pre: pre.parse()?,
            post: post.parse()?,
        })
    }
}

/// Default post-event window, from [`DEFAULT_POST_START`] through `today`.
///
/// # Errors
/// `InputParse` when `today` is before the window start.
pub fn default_post_window(today: NaiveDate) -> Result<TimeWindow> {
    let start = NaiveDate::parse_from_str(DEFAULT_POST_START, "%Y-%m-%d")
        .map_err(|e| AnalysisError::InputParse(e.to_string()))?;
    Ok(TimeWindow::new(start, today)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let req = AnalysisRequest::parse(DEFAULT_AOI, "google", DEFAULT_PRE_WINDOW, "2024-06-01..2024-12-31").unwrap();
        assert_eq!(req.footprints, FootprintSource::GoogleOpenBuildings);
        assert_eq!(req.aoi.to_array(), [37.45, 47.05, 37.65, 47.15]);
        assert_eq!(req.pre.days(), 365);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let bad = [
            ("37.45, 47.05, 37.65", "google", DEFAULT_PRE_WINDOW),
            ("37.45, 47.05, abc, 47.15", "google", DEFAULT_PRE_WINDOW),
            ("37.65, 47.05, 37.45, 47.15", "google", DEFAULT_PRE_WINDOW),
            (DEFAULT_AOI, "bing", DEFAULT_PRE_WINDOW),
            (DEFAULT_AOI, "google", "2021-12-31..2021-01-01"),
        ];
        for (aoi, source, pre) in bad {
            let err = AnalysisRequest::parse(aoi, source, pre, "2024-06-01..2024-12-31").unwrap_err();
            assert!(matches!(err, AnalysisError::InputParse(_)), "{aoi} / {source} / {pre}: {err}");
        }
    }

    #[test]
    fn test_default_post_window() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let w = default_post_window(today).unwrap();
        assert_eq!(w.to_string(), "2024-06-01..2025-03-01");
        assert!(default_post_window(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).is_err());
    }
}
