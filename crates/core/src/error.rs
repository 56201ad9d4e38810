//! Error types for SarWatch core operations

use thiserror::Error;

/// Main error type for raster and request-level operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Invalid area of interest '{input}': {reason}")]
    InvalidAoi { input: String, reason: String },

    #[error("Invalid time window '{input}': {reason}")]
    InvalidWindow { input: String, reason: String },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Insufficient imagery: {window} window has no qualifying observations")]
    InsufficientData { window: &'static str },

    #[error("Population data unavailable: {0}")]
    PopulationUnavailable(String),

    #[error("Reduction covers {cells} cells, exceeding the budget of {max_cells}")]
    BudgetExceeded { cells: u64, max_cells: u64 },

    #[error("Unknown {kind}: {value}")]
    UnknownSelector { kind: &'static str, value: String },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for SarWatch core operations
pub type Result<T> = std::result::Result<T, Error>;
