//! Error types for the retail-forecast pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while loading, reshaping, fitting, or scoring.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient observations for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Dimension mismatch between aligned structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Too few sales rows matched a catalog entry during the join.
    #[error("join match rate too low: {matched} of {total} sales rows matched the catalog")]
    JoinMismatch { matched: usize, total: usize },

    /// A column required by the schema is missing from the input file.
    #[error("missing column '{0}' in input file")]
    MissingColumn(String),

    /// A named regressor is absent from the supplied future values.
    #[error("missing future regressor '{0}'")]
    MissingRegressor(String),

    /// Numerical failure during estimation.
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Chart rendering failure.
    #[error("render error: {0}")]
    RenderError(String),

    /// CSV parse or serialize failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
