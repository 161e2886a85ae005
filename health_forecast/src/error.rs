//! Error types for the health_forecast crate

use health_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the health_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No rows for the requested city/metric, or nothing left after filtering
    #[error("Insufficient data: {0}")]
    InsufficientDataError(String),

    /// The model could not be fitted to the series
    #[error("Model fit error: {0}")]
    ModelFitError(String),

    /// Malformed request: bad horizon, unknown metric, unsupported order
    #[error("Invalid request: {0}")]
    InvalidRequestError(String),

    /// Dataset does not have the expected shape
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// A background job was superseded before it finished
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        ForecastError::ModelFitError(err.to_string())
    }
}

impl ForecastError {
    /// Short machine-friendly name of the variant, for presentation layers
    /// that branch on error kind without matching.
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::InsufficientDataError(_) => "insufficient_data",
            ForecastError::ModelFitError(_) => "model_fit",
            ForecastError::InvalidRequestError(_) => "invalid_request",
            ForecastError::DataError(_) => "data",
            ForecastError::PolarsError(_) => "polars",
            ForecastError::Cancelled(_) => "cancelled",
        }
    }
}
