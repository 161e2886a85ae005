//! Property-based tests for the forecast engine.
//!
//! Series are generated with a small deterministic ripple so they are never
//! constant.

use health_forecast::{ForecastEngine, ForecastError, TimeSeries};
use proptest::prelude::*;

fn make_series(start: i32, values: &[f64]) -> TimeSeries {
    TimeSeries::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + i as i32, *v))
            .collect(),
    )
    .unwrap()
}

/// Values in a realistic range for yearly counts and costs.
fn values_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    (min_len..max_len).prop_flat_map(|len| {
        prop::collection::vec(1.0..1000.0_f64, len).prop_map(|mut v| {
            for (i, val) in v.iter_mut().enumerate() {
                *val += (i as f64) * 0.001;
            }
            v
        })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn forecast_has_horizon_consecutive_periods(
        start in 1990..2020_i32,
        values in values_strategy(3, 12),
        horizon in 1..8_usize,
    ) {
        let series = make_series(start, &values);
        let result = ForecastEngine::default().forecast(&series, horizon).unwrap();

        let last = series.last_period().unwrap();
        let expected: Vec<i32> = (1..=horizon as i32).map(|h| last + h).collect();
        prop_assert_eq!(result.forecast.periods(), expected);
        prop_assert!(result.forecast.values().iter().all(|v| v.is_finite()));
        prop_assert_eq!(result.actual, series);
    }

    #[test]
    fn forecast_is_deterministic(values in values_strategy(3, 10)) {
        let series = make_series(2000, &values);
        let engine = ForecastEngine::default();
        let a = engine.forecast(&series, 4).unwrap();
        let b = engine.forecast(&series, 4).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn fewer_than_three_points_never_fit(
        values in values_strategy(1, 3),
        horizon in 1..8_usize,
    ) {
        let series = make_series(2010, &values);
        let err = ForecastEngine::default().forecast(&series, horizon).unwrap_err();
        prop_assert!(matches!(err, ForecastError::ModelFitError(_)));
    }

    #[test]
    fn zero_horizon_is_always_invalid(values in values_strategy(1, 10)) {
        let series = make_series(2010, &values);
        let err = ForecastEngine::default().forecast(&series, 0).unwrap_err();
        prop_assert!(matches!(err, ForecastError::InvalidRequestError(_)));
    }
}
