//! Forecasting models for yearly series

use crate::error::{ForecastError, Result};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

pub mod arima;
mod kalman;

pub use arima::{Arima, FittedArima};

/// Largest AR or MA order accepted
pub const MAX_ARMA_ORDER: usize = 4;

/// Largest differencing order accepted
pub const MAX_DIFFERENCING: usize = 2;

/// ARIMA order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    /// Autoregressive terms
    pub p: usize,
    /// Differencing passes
    pub d: usize,
    /// Moving-average terms
    pub q: usize,
}

impl ModelOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Reject orders the estimator does not support
    pub fn validate(&self) -> Result<()> {
        if self.p > MAX_ARMA_ORDER || self.q > MAX_ARMA_ORDER || self.d > MAX_DIFFERENCING {
            return Err(ForecastError::InvalidRequestError(format!(
                "unsupported model order {}: p and q must be at most {}, d at most {}",
                self, MAX_ARMA_ORDER, MAX_DIFFERENCING
            )));
        }
        Ok(())
    }

    /// Fewest observations the order can be estimated from
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + 1
    }

    /// Whether a constant is estimated alongside the ARMA terms.
    ///
    /// Integrated models are fitted without one, so their forecasts carry no drift.
    pub fn has_intercept(&self) -> bool {
        self.d == 0
    }

    /// Number of estimated parameters including the innovation variance
    pub fn num_params(&self) -> usize {
        self.p + self.q + usize::from(self.has_intercept()) + 1
    }
}

impl Default for ModelOrder {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Summary of a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    /// Order that was fitted
    pub order: ModelOrder,
    /// AR coefficients `phi_1 .. phi_p`
    pub ar_coefficients: Vec<f64>,
    /// MA coefficients `theta_1 .. theta_q`
    pub ma_coefficients: Vec<f64>,
    /// Estimated mean, only for models without differencing
    pub intercept: Option<f64>,
    /// Innovation variance
    pub sigma2: f64,
    /// Maximised Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Akaike information criterion
    pub aic: f64,
    /// Bayesian information criterion
    pub bic: f64,
    /// Observations entering the likelihood (after differencing)
    pub nobs: usize,
    /// Optimiser iterations used
    pub iterations: usize,
    /// Whether the optimiser met its convergence criterion
    pub converged: bool,
}

/// Model fitted to a particular series
pub trait FittedModel: Debug {
    /// Point forecasts for the next `horizon` steps
    fn forecast(&self, horizon: usize) -> Result<Vec<f64>>;

    /// Parameters and fit statistics
    fn diagnostics(&self) -> ModelDiagnostics;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model specification that can be fitted to a series
pub trait ForecastModel: Debug + Clone {
    /// The type of fitted model produced
    type Fitted: FittedModel;

    /// Fit the model, polling `interrupt` during estimation; a `true` answer
    /// abandons the fit with [`ForecastError::Cancelled`].
    fn fit_interruptible(
        &self,
        series: &TimeSeries,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<Self::Fitted>;

    /// Fit the model to completion
    fn fit(&self, series: &TimeSeries) -> Result<Self::Fitted> {
        self.fit_interruptible(series, &|| false)
    }

    /// Get the name of the model
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_one_one_one() {
        let order = ModelOrder::default();
        assert_eq!(order, ModelOrder::new(1, 1, 1));
        assert_eq!(order.min_observations(), 3);
        assert!(!order.has_intercept());
        assert_eq!(order.num_params(), 3);
        assert_eq!(order.to_string(), "ARIMA(1,1,1)");
    }

    #[test]
    fn oversized_orders_are_rejected() {
        assert!(ModelOrder::new(5, 1, 0).validate().is_err());
        assert!(ModelOrder::new(1, 3, 1).validate().is_err());
        assert!(ModelOrder::new(2, 0, 2).validate().is_ok());
        assert_eq!(ModelOrder::new(2, 0, 2).num_params(), 6);
    }
}
