//! Derivative-free minimisation
//!
//! The likelihood surfaces fitted here are low dimensional (one AR and one
//! MA coefficient for the default model), so a bounded Nelder-Mead simplex
//! is sufficient and, unlike randomised searches, fully reproducible.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Outcome of a Nelder-Mead search
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMeadResult {
    /// Best vertex found
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`
    pub optimal_value: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Whether a convergence criterion was met before the iteration budget ran out
    pub converged: bool,
    /// Whether the caller's interrupt check stopped the search early
    pub interrupted: bool,
}

/// Tuning knobs for [`nelder_mead`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Convergence tolerance on both the objective spread and the simplex size
    pub tolerance: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
    /// Relative step used to build the initial simplex
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-9,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

impl NelderMeadConfig {
    /// Check the coefficients describe a valid simplex search
    pub fn validate(&self) -> Result<()> {
        if self.max_iter == 0 {
            return Err(MathError::InvalidInput(
                "max_iter must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(MathError::InvalidInput(
                "tolerance must be positive".to_string(),
            ));
        }
        if !(self.alpha > 0.0) || !(self.gamma > 1.0) {
            return Err(MathError::InvalidInput(
                "reflection must be positive and expansion greater than 1".to_string(),
            ));
        }
        if !(self.rho > 0.0 && self.rho < 1.0) || !(self.sigma > 0.0 && self.sigma < 1.0) {
            return Err(MathError::InvalidInput(
                "contraction and shrink coefficients must lie in (0, 1)".to_string(),
            ));
        }
        if !(self.initial_step > 0.0) {
            return Err(MathError::InvalidInput(
                "initial_step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Minimise `objective` starting from `initial`.
///
/// `bounds`, when given, holds one `(min, max)` pair per coordinate and every
/// trial point is clamped into the box. Non-finite objective values are
/// treated as `f64::MAX` so the simplex moves away from them.
///
/// # Example
///
/// ```
/// use health_math::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &NelderMeadConfig::default(),
/// )
/// .unwrap();
///
/// assert!(result.converged);
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 1.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> Result<NelderMeadResult>
where
    F: Fn(&[f64]) -> f64,
{
    nelder_mead_with_interrupt(objective, initial, bounds, config, || false)
}

/// Same as [`nelder_mead`], polling `interrupt` once per iteration.
///
/// When `interrupt` returns `true` the search stops and the best vertex so far
/// is returned with `interrupted` set.
pub fn nelder_mead_with_interrupt<F, I>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
    interrupt: I,
) -> Result<NelderMeadResult>
where
    F: Fn(&[f64]) -> f64,
    I: Fn() -> bool,
{
    config.validate()?;

    let n = initial.len();
    if n == 0 {
        return Err(MathError::InvalidInput(
            "cannot optimise over zero parameters".to_string(),
        ));
    }
    if let Some(b) = bounds {
        if b.len() != n {
            return Err(MathError::InvalidInput(format!(
                "expected {} bounds, got {}",
                n,
                b.len()
            )));
        }
        if b.iter().any(|(lo, hi)| lo > hi) {
            return Err(MathError::InvalidInput(
                "lower bound exceeds upper bound".to_string(),
            ));
        }
    }

    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::MAX
        }
    };

    let start = apply_bounds(initial, bounds);
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let step = if vertex[i].abs() > 1e-10 {
            config.initial_step * vertex[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        let mut vertex = apply_bounds(&vertex, bounds);
        // Clamping can collapse the step onto the start point; step inward instead.
        if (vertex[i] - start[i]).abs() < f64::EPSILON {
            vertex[i] -= step;
            vertex = apply_bounds(&vertex, bounds);
        }
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    let mut interrupted = false;

    while iterations < config.max_iter {
        if interrupt() {
            interrupted = true;
            break;
        }
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let centroid = centroid_excluding(&simplex, worst);

        let spread = values[worst] - values[best];
        let size = simplex
            .iter()
            .map(|v| euclidean_distance(v, &simplex[best]))
            .fold(0.0, f64::max);
        if spread.abs() < config.tolerance || size < config.tolerance {
            converged = true;
            break;
        }

        let reflected = apply_bounds(&affine(&centroid, &simplex[worst], -config.alpha), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < values[best] {
            let expanded = apply_bounds(&affine(&centroid, &reflected, config.gamma), bounds);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[worst] {
            let point = apply_bounds(&affine(&centroid, &reflected, config.rho), bounds);
            let value = eval(&point);
            (point, value)
        } else {
            let point = apply_bounds(&affine(&centroid, &simplex[worst], config.rho), bounds);
            let value = eval(&point);
            (point, value)
        };

        if contracted_value < values[worst].min(reflected_value) {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i == best {
                continue;
            }
            let shrunk = affine(&anchor, &simplex[i], config.sigma);
            simplex[i] = apply_bounds(&shrunk, bounds);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    Ok(NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
        interrupted,
    })
}

/// `origin + scale * (point - origin)`; reflection uses a negative scale.
fn affine(origin: &[f64], point: &[f64], scale: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point.iter())
        .map(|(o, p)| o + scale * (p - o))
        .collect()
}

fn centroid_excluding(simplex: &[Vec<f64>], exclude: usize) -> Vec<f64> {
    let dim = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; dim];
    for (i, vertex) in simplex.iter().enumerate() {
        if i == exclude {
            continue;
        }
        for (c, v) in centroid.iter_mut().zip(vertex.iter()) {
            *c += v;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

fn apply_bounds(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .zip(b.iter())
            .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
            .collect(),
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn finds_minimum_of_quadratic() {
        let result = nelder_mead(
            |x| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 0.5).powi(2),
            &[0.0, 0.0],
            None,
            &NelderMeadConfig::default(),
        )
        .unwrap();

        assert!(result.converged);
        assert!(!result.interrupted);
        assert_abs_diff_eq!(result.optimal_point[0], 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(result.optimal_point[1], -0.5, epsilon = 1e-3);
    }

    #[test]
    fn handles_rosenbrock_valley() {
        let config = NelderMeadConfig {
            max_iter: 10_000,
            tolerance: 1e-12,
            ..Default::default()
        };
        let result = nelder_mead(rosenbrock, &[-1.2, 1.0], None, &config).unwrap();
        assert_abs_diff_eq!(result.optimal_point[0], 1.0, epsilon = 1e-2);
        assert_abs_diff_eq!(result.optimal_point[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn respects_bounds() {
        let bounds = [(-1.0, 1.0)];
        let result = nelder_mead(
            |x| (x[0] - 5.0).powi(2),
            &[0.0],
            Some(&bounds),
            &NelderMeadConfig::default(),
        )
        .unwrap();

        assert!(result.converged);
        assert_abs_diff_eq!(result.optimal_point[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn start_on_upper_bound_still_builds_simplex() {
        let bounds = [(-1.0, 1.0), (-1.0, 1.0)];
        let result = nelder_mead(
            |x| x[0].powi(2) + x[1].powi(2),
            &[1.0, 1.0],
            Some(&bounds),
            &NelderMeadConfig::default(),
        )
        .unwrap();
        assert!(result.optimal_value < 1e-6);
    }

    #[test]
    fn non_finite_objective_is_avoided() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) },
            &[0.5],
            None,
            &NelderMeadConfig::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(result.optimal_point[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let run = || {
            nelder_mead(rosenbrock, &[0.3, -0.2], None, &NelderMeadConfig::default()).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn interrupt_stops_search() {
        let calls = Cell::new(0);
        let result = nelder_mead_with_interrupt(
            rosenbrock,
            &[-1.2, 1.0],
            None,
            &NelderMeadConfig::default(),
            || {
                calls.set(calls.get() + 1);
                calls.get() > 3
            },
        )
        .unwrap();

        assert!(result.interrupted);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn rejects_empty_start_and_bad_bounds() {
        let config = NelderMeadConfig::default();
        assert!(nelder_mead(|_| 0.0, &[], None, &config).is_err());
        assert!(nelder_mead(|_| 0.0, &[0.0, 0.0], Some(&[(0.0, 1.0)]), &config).is_err());
        assert!(nelder_mead(|_| 0.0, &[0.0], Some(&[(1.0, 0.0)]), &config).is_err());
    }

    #[test]
    fn config_validation() {
        assert!(NelderMeadConfig::default().validate().is_ok());
        let bad = NelderMeadConfig {
            rho: 1.5,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = NelderMeadConfig {
            max_iter: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
