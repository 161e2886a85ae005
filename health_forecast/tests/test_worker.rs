use crossbeam_channel::{unbounded, Receiver, Sender};
use health_forecast::{
    DataProvider, DatasetSchema, ForecastConfig, ForecastEngine, ForecastError, ForecastRequest,
    ForecastWorker, HealthDataset, Metric, ModelOrder,
};
use polars::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(30);

fn dataset() -> HealthDataset {
    let encounters = df!(
        "CITY_x" => &["Boston"; 12],
        "START_x" => &[
            "2016-01-01", "2016-05-01", "2017-01-01", "2017-02-01", "2017-03-01", "2018-01-01",
            "2019-01-01", "2019-02-01", "2019-03-01", "2019-04-01", "2020-01-01", "2020-02-01"
        ],
        "TOTAL_CLAIM_COST" => &[10.0, 12.0, 30.0, 5.0, 8.0, 22.0, 14.0, 3.0, 9.0, 40.0, 18.0, 11.0],
        "Id_x" => &["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"],
        "PROVIDER" => &["p1", "p2", "p1", "p2", "p3", "p1", "p1", "p2", "p3", "p4", "p1", "p2"],
        "HEALTHCARE_EXPENSES" => &[1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0, 55.0, 89.0, 144.0, 233.0]
    )
    .unwrap();
    let population = df!(
        "CITY" => &["Boston"],
        "2016" => &[100.0],
        "2017" => &[104.0],
        "2018" => &[103.0],
        "2019" => &[109.0],
        "2020" => &[115.0]
    )
    .unwrap();
    HealthDataset::new(encounters, population)
}

/// Holds every encounter read until the test hands out a permit.
struct GatedProvider {
    inner: HealthDataset,
    permits: Receiver<()>,
}

impl GatedProvider {
    fn new(inner: HealthDataset) -> (Self, Sender<()>) {
        let (tx, rx) = unbounded();
        (Self { inner, permits: rx }, tx)
    }
}

impl DataProvider for GatedProvider {
    fn encounters(&self) -> health_forecast::Result<&DataFrame> {
        self.permits
            .recv_timeout(TIMEOUT)
            .map_err(|_| ForecastError::DataError("gate was never opened".to_string()))?;
        self.inner.encounters()
    }

    fn population(&self) -> health_forecast::Result<&DataFrame> {
        self.inner.population()
    }

    fn schema(&self) -> &DatasetSchema {
        self.inner.schema()
    }
}

#[test]
fn test_worker_delivers_result() {
    let worker = ForecastWorker::spawn(Arc::new(dataset()), ForecastEngine::default());
    let request = ForecastRequest::new("Boston", Metric::Encounters, 3).unwrap();
    let generation = worker.submit(request).unwrap();

    let outcome = worker.recv_timeout(TIMEOUT).unwrap().expect("no outcome");
    assert_eq!(outcome.generation, generation);
    assert_eq!(outcome.city, "Boston");
    assert_eq!(outcome.metric, Metric::Encounters);
    let result = outcome.result.unwrap();
    assert_eq!(result.forecast.periods(), vec![2021, 2022, 2023]);
}

#[test]
fn test_newer_submission_cancels_older_job() {
    let (provider, permits) = GatedProvider::new(dataset());
    let worker = ForecastWorker::spawn(Arc::new(provider), ForecastEngine::default());

    let first = worker
        .submit(ForecastRequest::new("Boston", Metric::ClaimCost, 3).unwrap())
        .unwrap();
    let second = worker
        .submit(ForecastRequest::new("Boston", Metric::Expenses, 3).unwrap())
        .unwrap();
    assert!(second > first);
    assert_eq!(worker.latest_generation(), second);

    // Enough permits for both jobs, whether or not the first one reached the gate.
    permits.send(()).unwrap();
    permits.send(()).unwrap();

    let superseded = worker.recv_timeout(TIMEOUT).unwrap().expect("no outcome");
    assert_eq!(superseded.generation, first);
    assert!(matches!(superseded.result, Err(ForecastError::Cancelled(_))));

    let latest = worker.recv_timeout(TIMEOUT).unwrap().expect("no outcome");
    assert_eq!(latest.generation, second);
    assert_eq!(latest.metric, Metric::Expenses);
    assert!(latest.result.is_ok());
}

#[test]
fn test_submit_city_shares_one_generation() {
    let worker = ForecastWorker::spawn(Arc::new(dataset()), ForecastEngine::default());
    let generation = worker.submit_city("Boston", 2).unwrap();

    let mut metrics = BTreeSet::new();
    for _ in 0..Metric::ALL.len() {
        let outcome = worker.recv_timeout(TIMEOUT).unwrap().expect("no outcome");
        assert_eq!(outcome.generation, generation);
        metrics.insert(outcome.metric);
    }
    assert_eq!(metrics.len(), Metric::ALL.len());
}

#[test]
fn test_submit_city_uses_configured_order() {
    let config = ForecastConfig::default()
        .with_order(ModelOrder::new(0, 1, 0))
        .unwrap();
    let engine = ForecastEngine::new(config).unwrap();
    let worker = ForecastWorker::spawn(Arc::new(dataset()), engine);
    worker.submit_city("Boston", 2).unwrap();

    for _ in 0..Metric::ALL.len() {
        let outcome = worker.recv_timeout(TIMEOUT).unwrap().expect("no outcome");
        let result = outcome
            .result
            .unwrap_or_else(|e| panic!("{} failed: {}", outcome.metric, e));
        assert_eq!(
            result.model_diagnostics.unwrap().order,
            ModelOrder::new(0, 1, 0),
            "{}",
            outcome.metric
        );
    }
}

#[test]
fn test_submit_city_default_uses_configured_horizon() {
    let config = ForecastConfig::default().with_horizon(3).unwrap();
    let engine = ForecastEngine::new(config).unwrap();
    let worker = ForecastWorker::spawn(Arc::new(dataset()), engine);
    let generation = worker.submit_city_default("Boston").unwrap();

    let outcome = worker.recv_timeout(TIMEOUT).unwrap().expect("no outcome");
    assert_eq!(outcome.generation, generation);
    let result = outcome.result.unwrap();
    assert_eq!(result.forecast.periods(), vec![2021, 2022, 2023]);
}

#[test]
fn test_submit_city_rejects_zero_horizon() {
    let worker = ForecastWorker::spawn(Arc::new(dataset()), ForecastEngine::default());
    let err = worker.submit_city("Boston", 0).unwrap_err();
    assert!(matches!(err, ForecastError::InvalidRequestError(_)));
    assert_eq!(worker.latest_generation(), 0);
}

#[test]
fn test_drop_stops_worker_with_pending_jobs() {
    let (provider, permits) = GatedProvider::new(dataset());
    let worker = ForecastWorker::spawn(Arc::new(provider), ForecastEngine::default());
    worker
        .submit(ForecastRequest::new("Boston", Metric::Population, 3).unwrap())
        .unwrap();
    worker
        .submit(ForecastRequest::new("Boston", Metric::Encounters, 3).unwrap())
        .unwrap();

    // A closed gate fails the encounter read instead of blocking.
    drop(permits);
    drop(worker);
}
