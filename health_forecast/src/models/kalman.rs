//! Exact likelihood of a zero-mean ARMA process via the Kalman filter
//!
//! Uses the Harvey state-space form with state dimension
//! `r = max(p, q + 1)`:
//!
//! ```text
//! y_t       = Z a_t,                    Z = [1, 0, ..., 0]
//! a_{t+1}   = T a_t + R e_t,            e_t ~ N(0, sigma2)
//! T[i][0]   = phi_{i+1},  T[i][i+1] = 1
//! R         = [1, theta_1, ..., theta_{r-1}]
//! ```
//!
//! The filter runs with `sigma2 = 1` and the variance is concentrated out of
//! the likelihood afterwards.

use crate::error::{ForecastError, Result};
use std::f64::consts::PI;

const LYAPUNOV_MAX_DOUBLINGS: usize = 64;
const LYAPUNOV_TOLERANCE: f64 = 1e-12;

type Matrix = Vec<Vec<f64>>;

/// State-space form of an ARMA(p, q) process
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArmaStateSpace {
    transition: Matrix,
    selection: Vec<f64>,
}

/// Output of one filtering pass
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterOutput {
    /// Concentrated innovation variance
    pub sigma2: f64,
    /// Log-likelihood at `sigma2`
    pub log_likelihood: f64,
    /// Predicted state for the step after the last observation
    pub next_state: Vec<f64>,
}

impl ArmaStateSpace {
    pub fn new(ar: &[f64], ma: &[f64]) -> Self {
        let r = ar.len().max(ma.len() + 1);
        let mut transition = vec![vec![0.0; r]; r];
        for (i, phi) in ar.iter().enumerate() {
            transition[i][0] = *phi;
        }
        for i in 0..r - 1 {
            transition[i][i + 1] = 1.0;
        }

        let mut selection = vec![0.0; r];
        selection[0] = 1.0;
        for (i, theta) in ma.iter().enumerate() {
            selection[i + 1] = *theta;
        }

        Self {
            transition,
            selection,
        }
    }

    pub fn dim(&self) -> usize {
        self.selection.len()
    }

    /// `T a`
    pub fn propagate(&self, state: &[f64]) -> Vec<f64> {
        mat_vec(&self.transition, state)
    }

    /// Solve `P = T P T' + R R'` by the doubling iteration
    /// `P <- P + A P A'`, `A <- A A`.
    fn stationary_covariance(&self) -> Result<Matrix> {
        let r = self.dim();
        let mut cov = outer(&self.selection, &self.selection);
        let mut power = self.transition.clone();

        for _ in 0..LYAPUNOV_MAX_DOUBLINGS {
            let increment = mat_mul(&mat_mul(&power, &cov), &transpose(&power));
            let change = increment
                .iter()
                .flatten()
                .fold(0.0_f64, |acc, v| acc.max(v.abs()));
            for i in 0..r {
                for j in 0..r {
                    cov[i][j] += increment[i][j];
                }
            }
            let scale = cov
                .iter()
                .flatten()
                .fold(1.0_f64, |acc, v| acc.max(v.abs()));
            if !change.is_finite() || !scale.is_finite() {
                break;
            }
            if change <= LYAPUNOV_TOLERANCE * scale {
                return Ok(cov);
            }
            power = mat_mul(&power, &power);
        }

        Err(ForecastError::ModelFitError(
            "initial state covariance diverged; AR polynomial is not stationary".to_string(),
        ))
    }

    /// Run the filter over `observations` (already centred).
    pub fn filter(&self, observations: &[f64]) -> Result<FilterOutput> {
        if observations.is_empty() {
            return Err(ForecastError::ModelFitError(
                "no observations to filter".to_string(),
            ));
        }

        let r = self.dim();
        let noise = outer(&self.selection, &self.selection);
        let mut state = vec![0.0; r];
        let mut cov = self.stationary_covariance()?;

        let mut weighted_ss = 0.0;
        let mut log_det = 0.0;

        for &y in observations {
            let innovation = y - state[0];
            let variance = cov[0][0];
            if !(variance > 0.0) || !variance.is_finite() {
                return Err(ForecastError::ModelFitError(format!(
                    "singular innovation variance {} during filtering",
                    variance
                )));
            }

            weighted_ss += innovation * innovation / variance;
            log_det += variance.ln();

            let gain: Vec<f64> = (0..r).map(|i| cov[i][0] / variance).collect();
            let updated_state: Vec<f64> = (0..r).map(|i| state[i] + gain[i] * innovation).collect();
            let mut updated_cov = cov.clone();
            for i in 0..r {
                for j in 0..r {
                    updated_cov[i][j] -= gain[i] * cov[0][j];
                }
            }

            state = self.propagate(&updated_state);
            cov = mat_mul(
                &mat_mul(&self.transition, &updated_cov),
                &transpose(&self.transition),
            );
            for i in 0..r {
                for j in 0..r {
                    cov[i][j] += noise[i][j];
                }
            }
        }

        let n = observations.len() as f64;
        let sigma2 = weighted_ss / n;
        if !(sigma2 > 0.0) || !sigma2.is_finite() {
            return Err(ForecastError::ModelFitError(format!(
                "innovation variance estimate {} is not positive",
                sigma2
            )));
        }
        let log_likelihood = -0.5 * n * ((2.0 * PI).ln() + sigma2.ln() + 1.0) - 0.5 * log_det;

        Ok(FilterOutput {
            sigma2,
            log_likelihood,
            next_state: state,
        })
    }
}

fn outer(a: &[f64], b: &[f64]) -> Matrix {
    a.iter()
        .map(|x| b.iter().map(|y| x * y).collect())
        .collect()
}

fn transpose(m: &Matrix) -> Matrix {
    let rows = m.len();
    let cols = m.first().map_or(0, Vec::len);
    (0..cols)
        .map(|j| (0..rows).map(|i| m[i][j]).collect())
        .collect()
}

fn mat_mul(a: &Matrix, b: &Matrix) -> Matrix {
    let inner = b.len();
    let cols = b.first().map_or(0, Vec::len);
    a.iter()
        .map(|row| {
            (0..cols)
                .map(|j| (0..inner).map(|k| row[k] * b[k][j]).sum())
                .collect()
        })
        .collect()
}

fn mat_vec(m: &Matrix, v: &[f64]) -> Vec<f64> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}
