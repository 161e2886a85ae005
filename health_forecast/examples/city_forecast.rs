use health_forecast::{
    DataProvider, ForecastConfig, ForecastEngine, ForecastRequest, ForecastWorker, HealthDataset, Metric,
};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_forecast=info".into()),
        )
        .init();

    println!("HealthX: City Forecast Example");
    println!("==============================\n");

    let dataset = create_sample_dataset()?;
    println!("Cities in dataset: {:?}\n", dataset.cities()?);

    // Every metric for one city, synchronously, over the configured horizon
    let engine = ForecastEngine::new(ForecastConfig::from_json(r#"{ "horizon": 5 }"#)?)?;
    for (metric, result) in engine.forecast_city_default(&dataset, "Boston") {
        match result {
            Ok(result) => {
                println!("{}", result.chart_title("Boston", metric));
                for obs in result.actual.iter() {
                    println!("  {}  {:>12.1}  actual", obs.period, obs.value);
                }
                for obs in result.forecast.iter() {
                    println!("  {}  {:>12.1}  forecast", obs.period, obs.value);
                }
                if let Some(diag) = &result.model_diagnostics {
                    println!(
                        "  {} ar={:?} ma={:?} sigma2={:.3} aic={:.2}",
                        diag.order, diag.ar_coefficients, diag.ma_coefficients, diag.sigma2, diag.aic
                    );
                }
            }
            Err(e) => println!("{}: {}", metric.label(), e),
        }
        println!();
    }

    // A city with too little history fails without hiding anything else
    let request = ForecastRequest::new("Salem", Metric::Encounters, 3)?;
    match engine.run(&dataset, &request) {
        Ok(_) => println!("Salem unexpectedly forecast"),
        Err(e) => println!("Salem encounters [{}]: {}\n", e.kind(), e),
    }

    // Background worker: the second selection supersedes the first
    let worker = ForecastWorker::spawn(Arc::new(dataset), engine);
    worker.submit_city_default("Salem")?;
    let latest = worker.submit(ForecastRequest::new("Boston", Metric::ClaimCost, 3)?)?;

    while let Some(outcome) = worker.recv_timeout(Duration::from_secs(10))? {
        match &outcome.result {
            Ok(result) => println!(
                "generation {} {} {}: {}",
                outcome.generation,
                outcome.city,
                outcome.metric,
                result.to_json()?
            ),
            Err(e) => println!(
                "generation {} {} {}: {}",
                outcome.generation, outcome.city, outcome.metric, e
            ),
        }
        if outcome.generation == latest {
            break;
        }
    }

    Ok(())
}

fn create_sample_dataset() -> Result<HealthDataset, PolarsError> {
    let yearly_visits = [
        (2015, 3),
        (2016, 5),
        (2017, 4),
        (2018, 7),
        (2019, 6),
        (2020, 4),
        (2021, 8),
        (2022, 9),
    ];

    let mut city = Vec::new();
    let mut start = Vec::new();
    let mut cost = Vec::new();
    let mut id = Vec::new();
    let mut provider = Vec::new();
    let mut expenses = Vec::new();

    let mut n = 0usize;
    for (year, visits) in yearly_visits {
        for v in 0..visits {
            city.push("Boston");
            start.push(format!("{}-{:02}-{:02}T08:00:00Z", year, v % 12 + 1, v % 28 + 1));
            cost.push(120.0 + 35.0 * ((n * 7) % 13) as f64);
            id.push(format!("enc-{:04}", n));
            provider.push(format!("prov-{}", n % 6));
            expenses.push(2_000.0 + 150.0 * ((n * 5) % 11) as f64);
            n += 1;
        }
    }
    city.push("Salem");
    start.push("2022-03-01T08:00:00Z".to_string());
    cost.push(90.0);
    id.push(format!("enc-{:04}", n));
    provider.push("prov-9".to_string());
    expenses.push(1_800.0);

    let encounters = df!(
        "CITY_x" => city,
        "START_x" => start,
        "TOTAL_CLAIM_COST" => cost,
        "Id_x" => id,
        "PROVIDER" => provider,
        "HEALTHCARE_EXPENSES" => expenses
    )?;

    let population = df!(
        "CITY" => &["Boston", "Salem"],
        "2015" => &["667,137", "42,600"],
        "2016" => &["673,184", "42,900"],
        "2017" => &["685,094", "43,200"],
        "2018" => &["694,583", "43,400"],
        "2019" => &["692,600", "43,700"],
        "2020" => &["675,647", "44,400"],
        "2021" => &["654,776", "44,800"],
        "2022" => &["650,706", "45,100"]
    )?;

    Ok(HealthDataset::new(encounters, population))
}
