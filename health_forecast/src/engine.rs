//! Forecast Engine
//!
//! Glues extraction and model fitting together. One engine serves every
//! metric; metric-specific behaviour stays in the extractor.

use crate::config::ForecastConfig;
use crate::data::DataProvider;
use crate::error::{ForecastError, Result};
use crate::extract::{Metric, SeriesExtractor};
use crate::models::{Arima, FittedModel, ForecastModel, ModelDiagnostics, ModelOrder};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A request to forecast one metric of one city
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastRequest {
    city: String,
    metric: Metric,
    horizon: usize,
    order: ModelOrder,
}

impl ForecastRequest {
    /// Create a request with the default ARIMA(1,1,1) order
    pub fn new(city: impl Into<String>, metric: Metric, horizon: usize) -> Result<Self> {
        validate_horizon(horizon)?;
        Ok(Self {
            city: city.into(),
            metric,
            horizon,
            order: ModelOrder::default(),
        })
    }

    /// Same request with a different model order
    pub fn with_order(mut self, order: ModelOrder) -> Result<Self> {
        order.validate()?;
        self.order = order;
        Ok(self)
    }

    /// City the forecast is for
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Metric to forecast
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Number of periods to forecast
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// ARIMA order to fit
    pub fn order(&self) -> ModelOrder {
        self.order
    }
}

/// Observed series plus its forecast continuation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// The input series, unchanged
    pub actual: TimeSeries,
    /// Point forecasts for periods `last + 1 ..= last + horizon`
    pub forecast: TimeSeries,
    /// Fitted parameters and fit statistics
    pub model_diagnostics: Option<ModelDiagnostics>,
}

impl ForecastResult {
    /// Serialize for a presentation layer
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ForecastError::DataError(format!("failed to serialize forecast: {}", e)))
    }

    /// Chart title in the dashboard's format, e.g.
    /// `"Boston - Population Forecast (2025–2029)"`.
    pub fn chart_title(&self, city: &str, metric: Metric) -> String {
        match (self.forecast.first_period(), self.forecast.last_period()) {
            (Some(first), Some(last)) => {
                format!("{} - {} Forecast ({}–{})", city, metric.label(), first, last)
            }
            _ => format!("{} - {} Forecast", city, metric.label()),
        }
    }
}

fn validate_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(ForecastError::InvalidRequestError(
            "horizon must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Fits ARIMA models to extracted series
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    /// Create an engine after validating `config`
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Extractor configured with this engine's gap policy
    pub fn extractor(&self) -> SeriesExtractor {
        SeriesExtractor::new(self.config.gap_policy)
    }

    /// Forecast `horizon` periods past the end of `series` with the configured order
    pub fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<ForecastResult> {
        self.forecast_with_order(series, horizon, self.config.order)
    }

    /// Forecast with an explicit model order
    pub fn forecast_with_order(
        &self,
        series: &TimeSeries,
        horizon: usize,
        order: ModelOrder,
    ) -> Result<ForecastResult> {
        self.forecast_interruptible(series, horizon, order, &|| false)
    }

    pub(crate) fn forecast_interruptible(
        &self,
        series: &TimeSeries,
        horizon: usize,
        order: ModelOrder,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<ForecastResult> {
        validate_horizon(horizon)?;

        if !series.is_contiguous() {
            warn!(
                missing = ?series.missing_periods(),
                "series has gaps; observations are treated as equally spaced"
            );
        }

        let model = Arima::with_order(order)?
            .with_min_observations(self.config.min_observations)
            .with_optimizer(self.config.optimizer.clone());
        let fitted = model.fit_interruptible(series, interrupt)?;
        let values = fitted.forecast(horizon)?;

        Ok(ForecastResult {
            actual: series.clone(),
            forecast: series.continuation(values),
            model_diagnostics: Some(fitted.diagnostics()),
        })
    }

    /// Extract the requested series and forecast it
    pub fn run(
        &self,
        provider: &dyn DataProvider,
        request: &ForecastRequest,
    ) -> Result<ForecastResult> {
        self.run_interruptible(provider, request, &|| false)
    }

    pub(crate) fn run_interruptible(
        &self,
        provider: &dyn DataProvider,
        request: &ForecastRequest,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<ForecastResult> {
        info!(
            city = request.city(),
            metric = %request.metric(),
            horizon = request.horizon(),
            order = %request.order(),
            "forecast requested"
        );

        let series = self
            .extractor()
            .extract(provider, request.city(), request.metric())?;
        if interrupt() {
            return Err(ForecastError::Cancelled(format!(
                "{} forecast for '{}' abandoned before fitting",
                request.metric(),
                request.city()
            )));
        }
        let result =
            self.forecast_interruptible(&series, request.horizon(), request.order(), interrupt)?;

        info!(
            city = request.city(),
            metric = %request.metric(),
            observations = result.actual.len(),
            "forecast complete"
        );
        Ok(result)
    }

    /// Request for `metric` of `city` carrying the configured model order
    pub fn request(&self, city: &str, metric: Metric, horizon: usize) -> Result<ForecastRequest> {
        ForecastRequest::new(city, metric, horizon)?.with_order(self.config.order)
    }

    /// [`forecast_city`](Self::forecast_city) over the configured horizon
    pub fn forecast_city_default(
        &self,
        provider: &dyn DataProvider,
        city: &str,
    ) -> BTreeMap<Metric, Result<ForecastResult>> {
        self.forecast_city(provider, city, self.config.horizon)
    }

    /// Forecast every metric for `city`. Each metric succeeds or fails on its own.
    pub fn forecast_city(
        &self,
        provider: &dyn DataProvider,
        city: &str,
        horizon: usize,
    ) -> BTreeMap<Metric, Result<ForecastResult>> {
        Metric::ALL
            .into_iter()
            .map(|metric| {
                let result = self
                    .request(city, metric, horizon)
                    .and_then(|request| self.run(provider, &request));
                if let Err(e) = &result {
                    warn!(city, %metric, error = %e, "metric forecast failed");
                }
                (metric, result)
            })
            .collect()
    }
}
