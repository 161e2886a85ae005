//! ARIMA models for yearly series
//!
//! Parameters are estimated by exact Gaussian maximum likelihood. The series
//! is differenced `d` times, the remaining ARMA(p, q) part is cast in
//! state-space form and its likelihood evaluated with a Kalman filter
//! ([`super::kalman`]). AR and MA coefficients are searched in an
//! unconstrained space that maps onto stationary and invertible polynomials,
//! so the optimiser can never propose an explosive model.
//!
//! Estimation is deterministic: the starting point is derived from the data
//! and the optimiser is a plain Nelder-Mead simplex.

use super::kalman::ArmaStateSpace;
use super::{FittedModel, ForecastModel, ModelDiagnostics, ModelOrder};
use crate::config::MIN_OBSERVATIONS;
use crate::error::{ForecastError, Result};
use crate::series::TimeSeries;
use health_math::differencing::{difference, integrate};
use health_math::optimization::{nelder_mead_with_interrupt, NelderMeadConfig};
use health_math::stationarity::{
    constrain_invertible, constrain_stationary, unconstrain_invertible, unconstrain_stationary,
};
use health_math::stats;
use tracing::debug;

/// Unconstrained coefficients are kept inside `[-BOUND, BOUND]`, which caps
/// each partial autocorrelation at about 0.99.
const COEFFICIENT_BOUND: f64 = 7.0;

/// ARIMA model specification
#[derive(Debug, Clone)]
pub struct Arima {
    /// Name of the model
    name: String,
    /// Model order
    order: ModelOrder,
    /// Minimum series length accepted
    min_observations: usize,
    /// Likelihood optimiser settings
    optimizer: NelderMeadConfig,
}

/// ARIMA model fitted to one series
#[derive(Debug, Clone)]
pub struct FittedArima {
    name: String,
    order: ModelOrder,
    ar_coefficients: Vec<f64>,
    ma_coefficients: Vec<f64>,
    intercept: Option<f64>,
    sigma2: f64,
    log_likelihood: f64,
    nobs: usize,
    iterations: usize,
    converged: bool,
    state_space: ArmaStateSpace,
    /// Predicted state one step past the sample
    next_state: Vec<f64>,
    /// Undifferenced observations, needed to integrate forecasts
    history: Vec<f64>,
}

impl Arima {
    /// Create a new ARIMA model
    pub fn new(p: usize, d: usize, q: usize) -> Result<Self> {
        Self::with_order(ModelOrder::new(p, d, q))
    }

    /// Create a model of the given order
    pub fn with_order(order: ModelOrder) -> Result<Self> {
        order.validate()?;
        Ok(Self {
            name: order.to_string(),
            order,
            min_observations: MIN_OBSERVATIONS.max(order.min_observations()),
            optimizer: NelderMeadConfig::default(),
        })
    }

    /// Require at least `min_observations` points (never fewer than the order needs)
    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations.max(self.order.min_observations());
        self
    }

    /// Replace the optimiser settings
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Model order
    pub fn order(&self) -> ModelOrder {
        self.order
    }

    /// Minimum series length accepted
    pub fn min_observations(&self) -> usize {
        self.min_observations
    }

    fn validate_series(&self, values: &[f64]) -> Result<()> {
        if values.len() < self.min_observations {
            return Err(ForecastError::ModelFitError(format!(
                "{} needs at least {} observations, got {}",
                self.name,
                self.min_observations,
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFitError(format!(
                "series contains a non-finite value ({})",
                bad
            )));
        }
        if stats::is_constant(values) {
            return Err(ForecastError::ModelFitError(format!(
                "series is constant at {}; no dynamics to estimate",
                values[0]
            )));
        }
        Ok(())
    }

    /// Starting point in the optimiser's parameter space:
    /// `[mean?, ar_1..ar_p, ma_1..ma_q]`.
    fn initial_params(&self, working: &[f64]) -> Result<Vec<f64>> {
        let ModelOrder { p, q, .. } = self.order;
        let mut params = Vec::with_capacity(p + q + 1);

        if self.order.has_intercept() {
            params.push(stats::mean(working)?);
        }

        let mut ar = vec![0.0; p];
        if p > 0 {
            // A constant working series has no defined autocorrelation.
            let r1 = stats::autocorrelation(working, 1).unwrap_or(0.0);
            ar[0] = r1.clamp(-0.9, 0.9);
        }
        params.extend(unconstrain_stationary(&ar)?);
        params.extend(unconstrain_invertible(&vec![0.0; q])?);
        Ok(params)
    }

    /// Split an optimiser point into `(mean, ar, ma)`
    fn unpack(&self, params: &[f64]) -> (f64, Vec<f64>, Vec<f64>) {
        let ModelOrder { p, .. } = self.order;
        let offset = usize::from(self.order.has_intercept());
        let mean = if offset == 1 { params[0] } else { 0.0 };
        let ar = constrain_stationary(&params[offset..offset + p]);
        let ma = constrain_invertible(&params[offset + p..]);
        (mean, ar, ma)
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        let ModelOrder { p, q, .. } = self.order;
        let mut bounds = Vec::with_capacity(p + q + 1);
        if self.order.has_intercept() {
            bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        bounds.extend(std::iter::repeat((-COEFFICIENT_BOUND, COEFFICIENT_BOUND)).take(p + q));
        bounds
    }
}

impl Default for Arima {
    fn default() -> Self {
        Self {
            name: ModelOrder::default().to_string(),
            order: ModelOrder::default(),
            min_observations: MIN_OBSERVATIONS,
            optimizer: NelderMeadConfig::default(),
        }
    }
}

fn centred(values: &[f64], mean: f64) -> Vec<f64> {
    values.iter().map(|v| v - mean).collect()
}

impl ForecastModel for Arima {
    type Fitted = FittedArima;

    fn fit_interruptible(
        &self,
        series: &TimeSeries,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<FittedArima> {
        let history = series.values();
        self.validate_series(&history)?;

        let working = difference(&history, self.order.d)?;
        if working.iter().all(|v| *v == 0.0) {
            return Err(ForecastError::ModelFitError(format!(
                "series is identically zero after {} rounds of differencing",
                self.order.d
            )));
        }
        let nobs = working.len();

        let ModelOrder { p, q, .. } = self.order;
        let (params, iterations, converged) = if p + q + usize::from(self.order.has_intercept()) == 0 {
            (Vec::new(), 0, true)
        } else {
            let initial = self.initial_params(&working)?;
            let bounds = self.bounds();
            let objective = |params: &[f64]| {
                let (mean, ar, ma) = self.unpack(params);
                match ArmaStateSpace::new(&ar, &ma).filter(&centred(&working, mean)) {
                    Ok(out) => -out.log_likelihood / nobs as f64,
                    Err(_) => f64::INFINITY,
                }
            };
            let result = nelder_mead_with_interrupt(
                objective,
                &initial,
                Some(bounds.as_slice()),
                &self.optimizer,
                interrupt,
            )?;

            if result.interrupted {
                return Err(ForecastError::Cancelled(format!(
                    "{} fit interrupted after {} iterations",
                    self.name, result.iterations
                )));
            }
            if !result.converged {
                return Err(ForecastError::ModelFitError(format!(
                    "likelihood optimisation for {} did not converge within {} iterations",
                    self.name, result.iterations
                )));
            }
            (result.optimal_point, result.iterations, result.converged)
        };

        let (mean, ar, ma) = self.unpack(&params);
        let state_space = ArmaStateSpace::new(&ar, &ma);
        let output = state_space.filter(&centred(&working, mean))?;

        debug!(
            model = %self.name,
            ?ar,
            ?ma,
            sigma2 = output.sigma2,
            log_likelihood = output.log_likelihood,
            iterations,
            "fitted model"
        );

        Ok(FittedArima {
            name: self.name.clone(),
            order: self.order,
            ar_coefficients: ar,
            ma_coefficients: ma,
            intercept: self.order.has_intercept().then_some(mean),
            sigma2: output.sigma2,
            log_likelihood: output.log_likelihood,
            nobs,
            iterations,
            converged,
            state_space,
            next_state: output.next_state,
            history,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedArima {
    /// Fitted AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coefficients
    }

    /// Fitted MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coefficients
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Maximised log-likelihood
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }
}

impl FittedModel for FittedArima {
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        if horizon == 0 {
            return Err(ForecastError::InvalidRequestError(
                "horizon must be at least 1".to_string(),
            ));
        }

        let mean = self.intercept.unwrap_or(0.0);
        let mut state = self.next_state.clone();
        let mut working = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            working.push(state[0] + mean);
            state = self.state_space.propagate(&state);
        }

        Ok(integrate(&working, &self.history, self.order.d)?)
    }

    fn diagnostics(&self) -> ModelDiagnostics {
        let k = self.order.num_params() as f64;
        let n = self.nobs as f64;
        ModelDiagnostics {
            order: self.order,
            ar_coefficients: self.ar_coefficients.clone(),
            ma_coefficients: self.ma_coefficients.clone(),
            intercept: self.intercept,
            sigma2: self.sigma2,
            log_likelihood: self.log_likelihood,
            aic: -2.0 * self.log_likelihood + 2.0 * k,
            bic: -2.0 * self.log_likelihood + k * n.ln(),
            nobs: self.nobs,
            iterations: self.iterations,
            converged: self.converged,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn yearly(values: &[f64]) -> TimeSeries {
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (2000 + i as i32, *v))
                .collect(),
        )
        .unwrap()
    }

    /// Deterministic pseudo-noise so tests do not depend on an RNG.
    fn wiggle(i: usize) -> f64 {
        ((i as f64) * 1.7).sin() + 0.5 * ((i as f64) * 0.37).cos()
    }

    #[test]
    fn fits_default_order_and_forecasts_horizon() {
        let series = yearly(&[100.0, 120.0, 90.0, 140.0, 160.0]);
        let fitted = Arima::default().fit(&series).unwrap();
        let forecast = fitted.forecast(3).unwrap();

        assert_eq!(forecast.len(), 3);
        assert!(forecast.iter().all(|v| v.is_finite()));
        assert_eq!(fitted.ar_coefficients().len(), 1);
        assert_eq!(fitted.ma_coefficients().len(), 1);
        assert!(fitted.ar_coefficients()[0].abs() < 1.0);
        assert!(fitted.ma_coefficients()[0].abs() < 1.0);
        assert!(fitted.sigma2() > 0.0);
    }

    #[test]
    fn recovers_ar_coefficient_of_simulated_process() {
        let mut values = vec![0.0];
        for i in 1..200 {
            values.push(0.7 * values[i - 1] + wiggle(i));
        }
        let fitted = Arima::new(1, 0, 0).unwrap().fit(&yearly(&values)).unwrap();
        let diag = fitted.diagnostics();
        assert!(diag.ar_coefficients[0] > 0.4, "phi = {}", diag.ar_coefficients[0]);
        assert!(diag.intercept.is_some());
    }

    #[test]
    fn random_walk_forecast_is_flat_for_pure_difference() {
        let series = yearly(&[10.0, 12.0, 11.0, 13.0, 12.5]);
        let fitted = Arima::new(0, 1, 0).unwrap().fit(&series).unwrap();
        let forecast = fitted.forecast(4).unwrap();
        for value in forecast {
            assert_abs_diff_eq!(value, 12.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn short_series_is_rejected() {
        let err = Arima::default().fit(&yearly(&[50.0])).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
        let err = Arima::default().fit(&yearly(&[50.0, 55.0])).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
    }

    #[test]
    fn constant_and_non_finite_series_are_rejected() {
        let err = Arima::default().fit(&yearly(&[7.0; 6])).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
        let err = Arima::default().fit(&yearly(&[0.0; 6])).unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
        let err = Arima::default()
            .fit(&yearly(&[1.0, f64::NAN, 3.0, 4.0]))
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
    }

    #[test]
    fn linear_trend_vanishes_under_second_difference() {
        let err = Arima::new(0, 2, 1)
            .unwrap()
            .fit(&yearly(&[1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
    }

    #[test]
    fn interrupted_fit_reports_cancellation() {
        let series = yearly(&[100.0, 120.0, 90.0, 140.0, 160.0]);
        let err = Arima::default()
            .fit_interruptible(&series, &|| true)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Cancelled(_)));
    }

    #[test]
    fn exhausted_iteration_budget_is_a_fit_error() {
        let series = yearly(&[100.0, 120.0, 90.0, 140.0, 160.0, 150.0, 175.0]);
        let optimizer = NelderMeadConfig {
            max_iter: 1,
            ..Default::default()
        };
        let err = Arima::default()
            .with_optimizer(optimizer)
            .fit(&series)
            .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFitError(_)));
    }

    #[test]
    fn diagnostics_are_consistent() {
        let values: Vec<f64> = (0..30).map(|i| 50.0 + 2.0 * i as f64 + 3.0 * wiggle(i)).collect();
        let fitted = Arima::default().fit(&yearly(&values)).unwrap();
        let diag = fitted.diagnostics();
        assert_eq!(diag.nobs, 29);
        assert_eq!(diag.order, ModelOrder::default());
        assert!(diag.converged);
        assert!(diag.intercept.is_none());
        assert_abs_diff_eq!(diag.aic, -2.0 * diag.log_likelihood + 6.0, epsilon = 1e-9);
        assert!(diag.bic > diag.aic);
    }

    #[test]
    fn fitting_is_deterministic() {
        let series = yearly(&[3.0, 5.0, 4.0, 8.0, 9.0, 7.0, 12.0]);
        let a = Arima::default().fit(&series).unwrap();
        let b = Arima::default().fit(&series).unwrap();
        assert_eq!(a.forecast(5).unwrap(), b.forecast(5).unwrap());
        assert_eq!(a.diagnostics(), b.diagnostics());
    }
}
