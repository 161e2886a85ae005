//! Descriptive helpers used while validating and initialising fits

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().mean())
}

/// Whether every value equals the first one, up to a tolerance relative to
/// the series' magnitude.
pub fn is_constant(values: &[f64]) -> bool {
    let Some(first) = values.first() else {
        return true;
    };
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    values
        .iter()
        .all(|v| (v - first).abs() <= 1e-12 * scale)
}

/// Sample autocorrelation at `lag`, using the biased (divide by `n`) estimator.
pub fn autocorrelation(values: &[f64], lag: usize) -> Result<f64> {
    if values.len() <= lag {
        return Err(MathError::InsufficientData(format!(
            "autocorrelation at lag {} needs more than {} observations",
            lag, lag
        )));
    }

    let m = mean(values)?;
    let denom: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denom == 0.0 {
        return Err(MathError::CalculationError(
            "autocorrelation of a constant series is undefined".to_string(),
        ));
    }

    let numer: f64 = values
        .iter()
        .zip(values.iter().skip(lag))
        .map(|(a, b)| (a - m) * (b - m))
        .sum();
    Ok(numer / denom)
}
