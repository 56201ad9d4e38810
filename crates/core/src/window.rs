//! Observation time windows

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inclusive calendar date range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidWindow {
                input: format!("{start}..{end}"),
                reason: "start date is after end date".into(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    /// Parse `YYYY-MM-DD..YYYY-MM-DD` (or the `/` interval form).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidWindow {
            input: s.to_string(),
            reason,
        };

        let (start, end) = s
            .split_once("..")
            .or_else(|| s.split_once('/'))
            .ok_or_else(|| invalid("expected START..END".into()))?;

        let parse = |text: &str| {
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map_err(|e| invalid(format!("'{}': {e}", text.trim())))
        };

        Self::new(parse(start)?, parse(end)?).map_err(|e| match e {
            Error::InvalidWindow { reason, .. } => invalid(reason),
            other => other,
        })
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
