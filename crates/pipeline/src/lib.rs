//! # SarWatch Pipeline
//!
//! Runs a damage analysis end to end: footprints, radar change scoring and
//! population impact, over any set of [`Providers`].
//!
//! ```ignore
//! let request = AnalysisRequest::parse(DEFAULT_AOI, "google", DEFAULT_PRE_WINDOW, "2024-06-01..2024-12-31")?;
//! let outcome = run_analysis(&request, Providers::uniform(&service), &AnalysisConfig::default())?;
//! println!("{:.0} people under damaged structures", outcome.impact.population);
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod report;
pub mod request;

pub use analysis::{run_analysis, run_analysis_with_progress, AnalysisOutcome, Providers, ScoreSummary, Stage};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
pub use report::AnalysisReport;
pub use request::{default_post_window, AnalysisRequest, DEFAULT_AOI, DEFAULT_POST_START, DEFAULT_PRE_WINDOW};
