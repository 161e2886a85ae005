//! Background forecasting
//!
//! [`ForecastWorker`] owns one thread that runs forecasts in submission
//! order. Every submission gets a generation number; once a newer generation
//! is submitted, older jobs still queued or being fitted are abandoned and
//! reported as [`ForecastError::Cancelled`]. A dashboard can therefore fire a
//! request on every selection change and only ever render the latest one.

use crate::data::DataProvider;
use crate::engine::{ForecastEngine, ForecastRequest, ForecastResult};
use crate::error::{ForecastError, Result};
use crate::extract::Metric;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Result of one job, tagged with what was asked for
#[derive(Debug)]
pub struct ForecastOutcome {
    pub generation: u64,
    pub city: String,
    pub metric: Metric,
    pub result: Result<ForecastResult>,
}

struct Job {
    generation: u64,
    request: ForecastRequest,
}

/// Runs forecasts on a dedicated thread
pub struct ForecastWorker {
    jobs: Option<Sender<Job>>,
    outcomes: Receiver<ForecastOutcome>,
    latest: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    /// Copy of the thread's engine, used to build requests with its configuration
    engine: ForecastEngine,
}

impl ForecastWorker {
    /// Start the worker thread
    pub fn spawn(provider: Arc<dyn DataProvider>, engine: ForecastEngine) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (outcome_tx, outcome_rx) = unbounded();
        let latest = Arc::new(AtomicU64::new(0));

        let handle = {
            let latest = Arc::clone(&latest);
            let engine = engine.clone();
            thread::spawn(move || run_jobs(provider, engine, job_rx, outcome_tx, latest))
        };

        Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            latest,
            handle: Some(handle),
            engine,
        }
    }

    /// Queue a request, superseding everything submitted before it.
    /// Returns the generation its outcome will carry.
    pub fn submit(&self, request: ForecastRequest) -> Result<u64> {
        let generation = self.next_generation();
        self.send(Job {
            generation,
            request,
        })?;
        Ok(generation)
    }

    /// Queue every metric of `city` under a single generation, using the
    /// engine's configured model order
    pub fn submit_city(&self, city: &str, horizon: usize) -> Result<u64> {
        let requests = Metric::ALL
            .into_iter()
            .map(|metric| self.engine.request(city, metric, horizon))
            .collect::<Result<Vec<_>>>()?;

        let generation = self.next_generation();
        for request in requests {
            self.send(Job {
                generation,
                request,
            })?;
        }
        Ok(generation)
    }

    /// [`submit_city`](Self::submit_city) over the configured horizon
    pub fn submit_city_default(&self, city: &str) -> Result<u64> {
        self.submit_city(city, self.engine.config().horizon)
    }

    /// Generation of the most recent submission
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Channel on which outcomes arrive
    pub fn outcomes(&self) -> &Receiver<ForecastOutcome> {
        &self.outcomes
    }

    /// Block until the next outcome
    pub fn recv(&self) -> Result<ForecastOutcome> {
        self.outcomes
            .recv()
            .map_err(|_| ForecastError::Cancelled("forecast worker has stopped".to_string()))
    }

    /// Wait up to `timeout` for the next outcome
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<ForecastOutcome>> {
        match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ForecastError::Cancelled(
                "forecast worker has stopped".to_string(),
            )),
        }
    }

    fn next_generation(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn send(&self, job: Job) -> Result<()> {
        let sender = self.jobs.as_ref().ok_or_else(|| {
            ForecastError::Cancelled("forecast worker is shutting down".to_string())
        })?;
        sender
            .send(job)
            .map_err(|_| ForecastError::Cancelled("forecast worker has stopped".to_string()))
    }
}

impl Drop for ForecastWorker {
    fn drop(&mut self) {
        // Supersede whatever is in flight so the thread exits promptly.
        self.latest.store(u64::MAX, Ordering::SeqCst);
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_jobs(
    provider: Arc<dyn DataProvider>,
    engine: ForecastEngine,
    jobs: Receiver<Job>,
    outcomes: Sender<ForecastOutcome>,
    latest: Arc<AtomicU64>,
) {
    for job in jobs.iter() {
        let Job {
            generation,
            request,
        } = job;
        let superseded = || latest.load(Ordering::SeqCst) > generation;

        let result = if superseded() {
            Err(cancelled(generation, &latest))
        } else {
            match engine.run_interruptible(provider.as_ref(), &request, &superseded) {
                Err(ForecastError::Cancelled(_)) => Err(cancelled(generation, &latest)),
                other => other,
            }
        };

        debug!(
            generation,
            city = request.city(),
            metric = %request.metric(),
            ok = result.is_ok(),
            "job finished"
        );

        let outcome = ForecastOutcome {
            generation,
            city: request.city().to_string(),
            metric: request.metric(),
            result,
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

fn cancelled(generation: u64, latest: &AtomicU64) -> ForecastError {
    let newer = latest.load(Ordering::SeqCst);
    if newer == u64::MAX {
        ForecastError::Cancelled(format!("job {} abandoned at shutdown", generation))
    } else {
        ForecastError::Cancelled(format!(
            "job {} superseded by generation {}",
            generation, newer
        ))
    }
}
