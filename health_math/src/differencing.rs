//! Differencing and integration of equally spaced series

use crate::{MathError, Result};

/// Apply ordinary differencing `d` times.
///
/// Each pass shortens the series by one element. Differencing a series that
/// is not longer than `d` is an error because nothing would be left to model.
pub fn difference(series: &[f64], d: usize) -> Result<Vec<f64>> {
    if series.len() <= d {
        return Err(MathError::InsufficientData(format!(
            "differencing of order {} needs more than {} observations, got {}",
            d,
            d,
            series.len()
        )));
    }

    let mut result = series.to_vec();
    for _ in 0..d {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    Ok(result)
}

/// Undo `d` rounds of differencing for values that continue `original`.
///
/// `differenced` holds future values on the `d`-times differenced scale; the
/// tail of `original` supplies the starting level for every round.
pub fn integrate(differenced: &[f64], original: &[f64], d: usize) -> Result<Vec<f64>> {
    if d == 0 {
        return Ok(differenced.to_vec());
    }
    if original.len() < d {
        return Err(MathError::InsufficientData(format!(
            "integration of order {} needs at least {} original observations, got {}",
            d,
            d,
            original.len()
        )));
    }

    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let anchor = if level == 0 {
            original[original.len() - 1]
        } else {
            let intermediate = difference(original, level)?;
            intermediate[intermediate.len() - 1]
        };

        let mut running = anchor;
        for value in result.iter_mut() {
            running += *value;
            *value = running;
        }
    }
    Ok(result)
}
