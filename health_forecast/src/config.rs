//! Configuration for extraction and forecasting
//!
//! Both structs deserialize from JSON with every field optional, so a host
//! application only has to spell out what differs from the defaults:
//!
//! ```rust
//! use health_forecast::config::{ForecastConfig, GapPolicy};
//!
//! let config = ForecastConfig::from_json(r#"{ "horizon": 3, "gap_policy": "zero_fill" }"#).unwrap();
//! assert_eq!(config.horizon, 3);
//! assert_eq!(config.gap_policy, GapPolicy::ZeroFill);
//! assert_eq!(config.min_observations, 3);
//! ```

use crate::error::{ForecastError, Result};
use crate::extract::Metric;
use crate::models::ModelOrder;
use health_math::optimization::NelderMeadConfig;
use serde::{Deserialize, Serialize};

/// Default number of years forecast beyond the last observation
pub const DEFAULT_HORIZON: usize = 5;

/// Fewest distinct periods a series may have before fitting is attempted
pub const MIN_OBSERVATIONS: usize = 3;

/// How the extractor treats years with no matching rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Years without rows are absent from the series
    #[default]
    Exclude,
    /// Years without rows between the first and last observed year become 0.0
    ZeroFill,
}

/// Forecasting parameters shared by every metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future periods to forecast
    pub horizon: usize,
    /// ARIMA order used for every metric
    pub order: ModelOrder,
    /// Minimum number of observations required before fitting
    pub min_observations: usize,
    /// Treatment of years with no rows
    pub gap_policy: GapPolicy,
    /// Likelihood optimiser settings
    pub optimizer: NelderMeadConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
            order: ModelOrder::default(),
            min_observations: MIN_OBSERVATIONS,
            gap_policy: GapPolicy::default(),
            optimizer: NelderMeadConfig::default(),
        }
    }
}

impl ForecastConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ForecastError::InvalidRequestError(format!("invalid forecast configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the forecast horizon
    pub fn with_horizon(mut self, horizon: usize) -> Result<Self> {
        self.horizon = horizon;
        self.validate()?;
        Ok(self)
    }

    /// Set the model order
    pub fn with_order(mut self, order: ModelOrder) -> Result<Self> {
        self.order = order;
        self.validate()?;
        Ok(self)
    }

    /// Set the gap policy
    pub fn with_gap_policy(mut self, gap_policy: GapPolicy) -> Self {
        self.gap_policy = gap_policy;
        self
    }

    /// Set the optimiser configuration
    pub fn with_optimizer(mut self, optimizer: NelderMeadConfig) -> Result<Self> {
        self.optimizer = optimizer;
        self.validate()?;
        Ok(self)
    }

    /// Check every field is usable
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidRequestError(
                "horizon must be at least 1".to_string(),
            ));
        }
        if self.min_observations < MIN_OBSERVATIONS {
            return Err(ForecastError::InvalidRequestError(format!(
                "min_observations must be at least {}",
                MIN_OBSERVATIONS
            )));
        }
        self.order.validate()?;
        self.optimizer
            .validate()
            .map_err(|e| ForecastError::InvalidRequestError(e.to_string()))?;
        Ok(())
    }
}

/// Column names of the source datasets
///
/// The transactional frame has one row per encounter, joined with claim,
/// provider and patient attributes. The population frame is wide: one row
/// per city and one column per year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSchema {
    /// City of the encounter
    pub city_column: String,
    /// Encounter start date; its year is the period
    pub date_column: String,
    /// Total claim cost of the encounter
    pub claim_cost_column: String,
    /// Encounter identifier
    pub encounter_id_column: String,
    /// Provider identifier
    pub provider_column: String,
    /// Patient healthcare expenses
    pub expenses_column: String,
    /// City column of the population table
    pub population_city_column: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self {
            city_column: "CITY_x".to_string(),
            date_column: "START_x".to_string(),
            claim_cost_column: "TOTAL_CLAIM_COST".to_string(),
            encounter_id_column: "Id_x".to_string(),
            provider_column: "PROVIDER".to_string(),
            expenses_column: "HEALTHCARE_EXPENSES".to_string(),
            population_city_column: "CITY".to_string(),
        }
    }
}

impl DatasetSchema {
    /// Parse a schema from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            ForecastError::InvalidRequestError(format!("invalid dataset schema: {}", e))
        })
    }

    /// Column of the transactional frame reduced for `metric`.
    ///
    /// Population is read from the wide table and has no such column.
    pub fn value_column(&self, metric: Metric) -> Option<&str> {
        match metric {
            Metric::Population => None,
            Metric::ClaimCost => Some(&self.claim_cost_column),
            Metric::Encounters => Some(&self.encounter_id_column),
            Metric::Providers => Some(&self.provider_column),
            Metric::Expenses => Some(&self.expenses_column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_dashboard() {
        let config = ForecastConfig::default();
        assert_eq!(config.horizon, 5);
        assert_eq!(config.order, ModelOrder::new(1, 1, 1));
        assert_eq!(config.gap_policy, GapPolicy::Exclude);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let err = ForecastConfig::new().with_horizon(0).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidRequestError(_)));
    }

    #[test]
    fn json_overrides_only_given_fields() {
        let config =
            ForecastConfig::from_json(r#"{"order": {"p": 2, "d": 1, "q": 0}, "optimizer": {"max_iter": 500}}"#)
                .unwrap();
        assert_eq!(config.order, ModelOrder::new(2, 1, 0));
        assert_eq!(config.optimizer.max_iter, 500);
        assert_eq!(config.optimizer.tolerance, NelderMeadConfig::default().tolerance);
        assert_eq!(config.horizon, DEFAULT_HORIZON);
    }

    #[test]
    fn invalid_json_is_an_invalid_request() {
        assert!(matches!(
            ForecastConfig::from_json("{ horizon: }"),
            Err(ForecastError::InvalidRequestError(_))
        ));
        assert!(matches!(
            ForecastConfig::from_json(r#"{"horizon": 0}"#),
            Err(ForecastError::InvalidRequestError(_))
        ));
    }

    #[test]
    fn schema_defaults_and_overrides() {
        let schema = DatasetSchema::from_json(r#"{"city_column": "CITY"}"#).unwrap();
        assert_eq!(schema.city_column, "CITY");
        assert_eq!(schema.date_column, "START_x");
        assert_eq!(schema.value_column(Metric::Providers), Some("PROVIDER"));
        assert_eq!(schema.value_column(Metric::Population), None);
    }
}
