//! # Health Forecast
//!
//! Per-city healthcare forecasting: yearly series are extracted from
//! encounter and population tables and extended with ARIMA point forecasts.
//!
//! ## Features
//!
//! - Dataset access through the [`DataProvider`] trait, backed by polars frames
//! - One extractor for every metric (population, claim costs, encounters,
//!   providers, healthcare expenses)
//! - Exact maximum-likelihood ARIMA(p,d,q), ARIMA(1,1,1) by default
//! - A background worker that cancels superseded requests
//!
//! ## Quick Start
//!
//! ```rust
//! use health_forecast::{ForecastEngine, ForecastRequest, HealthDataset, Metric};
//! use polars::prelude::*;
//!
//! let encounters = df!(
//!     "CITY_x" => &["Boston", "Boston", "Boston", "Boston", "Boston", "Boston", "Boston"],
//!     "START_x" => &["2019-01-05", "2020-02-01", "2020-03-09", "2021-07-12",
//!                    "2021-08-30", "2021-11-02", "2022-04-18"],
//!     "TOTAL_CLAIM_COST" => &[120.0, 80.0, 95.5, 300.0, 42.0, 18.0, 260.0],
//!     "Id_x" => &["e1", "e2", "e3", "e4", "e5", "e6", "e7"],
//!     "PROVIDER" => &["p1", "p1", "p2", "p1", "p2", "p3", "p2"],
//!     "HEALTHCARE_EXPENSES" => &[1000.0, 1500.0, 900.0, 2000.0, 1200.0, 700.0, 2500.0]
//! )?;
//! let dataset = HealthDataset::from_encounters(encounters);
//!
//! let engine = ForecastEngine::default();
//! let request = ForecastRequest::new("Boston", Metric::ClaimCost, 2)?;
//! let result = engine.run(&dataset, &request)?;
//!
//! assert_eq!(result.actual.periods(), vec![2019, 2020, 2021, 2022]);
//! assert_eq!(result.forecast.periods(), vec![2023, 2024]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod extract;
pub mod models;
pub mod series;
pub mod worker;

// Re-export commonly used types
pub use crate::config::{DatasetSchema, ForecastConfig, GapPolicy};
pub use crate::data::{DataProvider, HealthDataset};
pub use crate::engine::{ForecastEngine, ForecastRequest, ForecastResult};
pub use crate::error::{ForecastError, Result};
pub use crate::extract::{extract, Metric, SeriesExtractor};
pub use crate::models::{FittedModel, ForecastModel, ModelDiagnostics, ModelOrder};
pub use crate::series::{Observation, TimeSeries};
pub use crate::worker::{ForecastOutcome, ForecastWorker};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
