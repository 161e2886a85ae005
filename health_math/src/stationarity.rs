//! Reparameterisation of lag polynomials
//!
//! Maps any real vector onto the coefficients of a stationary
//! autoregressive polynomial (or an invertible moving-average one) through
//! partial autocorrelations, following Monahan (1984) and Jones (1980). An
//! optimiser can then search an unconstrained space and every point it
//! visits describes a valid model.

use crate::{MathError, Result};

/// Map unconstrained values onto stationary AR coefficients.
///
/// Each input is squashed into a partial autocorrelation in `(-1, 1)` and
/// the Durbin-Levinson recursion turns those into polynomial coefficients.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let n = unconstrained.len();
    if n == 0 {
        return Vec::new();
    }

    let partials: Vec<f64> = unconstrained
        .iter()
        .map(|x| x / (1.0 + x * x).sqrt())
        .collect();

    let mut y = vec![vec![0.0; n]; n];
    for k in 0..n {
        for i in 0..k {
            y[k][i] = y[k - 1][i] + partials[k] * y[k - 1][k - i - 1];
        }
        y[k][k] = partials[k];
    }

    y[n - 1].iter().map(|v| -v).collect()
}

/// Inverse of [`constrain_stationary`].
///
/// Fails when `constrained` is not stationary, i.e. when one of the implied
/// partial autocorrelations reaches the unit circle.
pub fn unconstrain_stationary(constrained: &[f64]) -> Result<Vec<f64>> {
    let n = constrained.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut y = vec![vec![0.0; n]; n];
    y[n - 1] = constrained.iter().map(|v| -v).collect();
    for k in (1..n).rev() {
        let pivot = y[k][k];
        let denom = 1.0 - pivot * pivot;
        if !(denom > 0.0) {
            return Err(MathError::InvalidInput(format!(
                "coefficients {:?} are not stationary",
                constrained
            )));
        }
        for i in 0..k {
            y[k - 1][i] = (y[k][i] - pivot * y[k][k - i - 1]) / denom;
        }
    }

    (0..n)
        .map(|k| {
            let r = y[k][k];
            let denom = 1.0 - r * r;
            if denom > 0.0 {
                Ok(r / denom.sqrt())
            } else {
                Err(MathError::InvalidInput(format!(
                    "coefficients {:?} are not stationary",
                    constrained
                )))
            }
        })
        .collect()
}

/// Whether `coefficients` describe a stationary AR polynomial
/// `1 - c_1 L - ... - c_p L^p`.
pub fn is_stationary(coefficients: &[f64]) -> bool {
    unconstrain_stationary(coefficients).is_ok()
}

/// Map unconstrained values onto invertible MA coefficients for the
/// polynomial `1 + c_1 L + ... + c_q L^q`.
pub fn constrain_invertible(unconstrained: &[f64]) -> Vec<f64> {
    constrain_stationary(unconstrained)
        .into_iter()
        .map(|v| -v)
        .collect()
}

/// Inverse of [`constrain_invertible`].
pub fn unconstrain_invertible(constrained: &[f64]) -> Result<Vec<f64>> {
    let flipped: Vec<f64> = constrained.iter().map(|v| -v).collect();
    unconstrain_stationary(&flipped)
}
