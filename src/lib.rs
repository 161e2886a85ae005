//! # HealthX
//!
//! `healthx` bundles the forecasting core of the HealthX dashboard:
//!
//! - [`math`]: numeric kernels (optimisation, differencing, stationarity transforms)
//! - [`forecast`]: datasets, per-city series extraction, ARIMA fitting and the
//!   background worker
//!
//! ## Example
//!
//! ```
//! use healthx::forecast::{ForecastEngine, TimeSeries};
//!
//! let series = TimeSeries::new(vec![
//!     (2018, 100.0),
//!     (2019, 120.0),
//!     (2020, 90.0),
//!     (2021, 140.0),
//!     (2022, 160.0),
//! ])
//! .unwrap();
//!
//! let result = ForecastEngine::default().forecast(&series, 3).unwrap();
//! assert_eq!(result.forecast.periods(), vec![2023, 2024, 2025]);
//! ```

pub use health_forecast as forecast;
pub use health_math as math;

/// Version of the facade crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
