//! # Health Math
//!
//! Numeric building blocks used to fit univariate forecasting models on
//! short yearly healthcare series. Nothing in here knows about cities,
//! metrics or data frames; callers pass plain `f64` slices.
//!
//! - [`optimization`]: bounded Nelder-Mead simplex search with cooperative interruption
//! - [`differencing`]: ordinary differencing and its inverse
//! - [`stationarity`]: partial-autocorrelation transforms for AR/MA polynomials
//! - [`stats`]: small descriptive helpers used for validation and starting values

use thiserror::Error;

pub mod differencing;
pub mod optimization;
pub mod stationarity;
pub mod stats;

/// Errors that can occur in numeric routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
