use health_forecast::ForecastError;
use health_math::MathError;
use polars::prelude::PolarsError;

#[test]
fn test_error_conversion() {
    // Numeric kernel failures surface as fit errors
    let math_error = MathError::CalculationError("singular matrix".to_string());
    let forecast_error = ForecastError::from(math_error);

    match forecast_error {
        ForecastError::ModelFitError(msg) => assert!(msg.contains("singular matrix")),
        other => panic!("Expected ModelFitError variant, got {:?}", other),
    }

    let polars_error = PolarsError::ColumnNotFound("START_x".into());
    let forecast_error = ForecastError::from(polars_error);

    match forecast_error {
        ForecastError::PolarsError(msg) => assert!(msg.contains("START_x")),
        other => panic!("Expected PolarsError variant, got {:?}", other),
    }
}

#[test]
fn test_error_display() {
    let error = ForecastError::InvalidRequestError("horizon must be at least 1".to_string());
    let error_string = format!("{}", error);
    assert!(error_string.starts_with("Invalid request"));
    assert!(error_string.contains("horizon must be at least 1"));

    let error = ForecastError::InsufficientDataError("city 'Springfield' has no rows".to_string());
    assert!(error.to_string().contains("Springfield"));
}

#[test]
fn test_error_kinds_are_distinct() {
    let errors = [
        ForecastError::InsufficientDataError(String::new()),
        ForecastError::ModelFitError(String::new()),
        ForecastError::InvalidRequestError(String::new()),
        ForecastError::DataError(String::new()),
        ForecastError::PolarsError(String::new()),
        ForecastError::Cancelled(String::new()),
    ];
    let mut kinds: Vec<&str> = errors.iter().map(ForecastError::kind).collect();
    kinds.sort_unstable();
    kinds.dedup();
    assert_eq!(kinds.len(), errors.len());
}

#[test]
fn test_error_is_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    assert_error(&ForecastError::DataError("bad column".to_string()));
}
