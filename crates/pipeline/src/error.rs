//! Error taxonomy of an analysis run.

use sarwatch_cloud::CloudError;
use sarwatch_core::FootprintSource;
use thiserror::Error;

/// Why an analysis run stopped.
///
/// Every variant ends the current run. Only [`AnalysisError::Configuration`]
/// should end the session; the rest are reported and the user may try again
/// with different inputs.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no building footprints from {dataset} in this area{}", suggestion_text(.suggestion))]
    EmptyResult {
        dataset: FootprintSource,
        suggestion: Option<FootprintSource>,
    },

    #[error("insufficient data: {reason}")]
    InsufficientData { reason: String },

    #[error("invalid input: {0}")]
    InputParse(String),

    #[error("{cells} cells exceed the budget of {max_cells}")]
    BudgetExceeded { cells: u64, max_cells: u64 },

    #[error("provider error: {0}")]
    Provider(#[source] CloudError),

    #[error("analysis error: {0}")]
    Analysis(#[source] sarwatch_core::Error),
}

fn suggestion_text(suggestion: &Option<FootprintSource>) -> String {
    suggestion
        .map(|s| format!("; try {}", s.label()))
        .unwrap_or_default()
}

impl AnalysisError {
    /// Whether the error should end the session rather than just this run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<sarwatch_core::Error> for AnalysisError {
    fn from(err: sarwatch_core::Error) -> Self {
        use sarwatch_core::Error as Core;

        match err {
            Core::InvalidAoi { .. } | Core::InvalidWindow { .. } | Core::UnknownSelector { .. } => {
                Self::InputParse(err.to_string())
            }
            Core::InsufficientData { window } => Self::InsufficientData {
                reason: format!("the {window} window has no qualifying observations"),
            },
            Core::PopulationUnavailable(detail) => Self::InsufficientData {
                reason: format!("population data unavailable: {detail}"),
            },
            Core::BudgetExceeded { cells, max_cells } => Self::BudgetExceeded { cells, max_cells },
            Core::InvalidParameter { .. } => Self::Configuration(err.to_string()),
            other => Self::Analysis(other),
        }
    }
}

impl From<CloudError> for AnalysisError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Core(core) => core.into(),
            e if e.is_credential_error() => Self::Configuration(e.to_string()),
            e => Self::Provider(e),
        }
    }
}

/// Result alias for analysis runs.
pub type Result<T> = std::result::Result<T, AnalysisError>;
