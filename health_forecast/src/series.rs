//! Year-indexed numeric series

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// One `(period, value)` pair; the period is a calendar year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub period: i32,
    pub value: f64,
}

/// Chronologically ordered observations with strictly increasing periods.
///
/// Periods need not be contiguous. Models fitted on a series treat
/// consecutive observations as one step apart regardless of missing years.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series from `(period, value)` pairs.
    ///
    /// Fails with `InvalidRequestError` if periods are not strictly increasing.
    pub fn new(points: Vec<(i32, f64)>) -> Result<Self> {
        Self::from_observations(
            points
                .into_iter()
                .map(|(period, value)| Observation { period, value })
                .collect(),
        )
    }

    /// Build a series from observations, checking their order
    pub fn from_observations(observations: Vec<Observation>) -> Result<Self> {
        if let Some(w) = observations
            .windows(2)
            .find(|w| w[1].period <= w[0].period)
        {
            return Err(ForecastError::InvalidRequestError(format!(
                "periods must be strictly increasing, found {} followed by {}",
                w[0].period, w[1].period
            )));
        }
        Ok(Self { observations })
    }

    /// Values continuing this series: periods `last + 1 ..= last + values.len()`.
    ///
    /// An empty series starts the continuation at period 0.
    pub fn continuation(&self, values: Vec<f64>) -> Self {
        let start = self.last_period().map_or(0, |p| p + 1);
        let observations = values
            .into_iter()
            .zip(start..)
            .map(|(value, period)| Observation { period, value })
            .collect();
        Self { observations }
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether there are no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// All observations in period order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Iterate over observations
    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Periods in order
    pub fn periods(&self) -> Vec<i32> {
        self.observations.iter().map(|o| o.period).collect()
    }

    /// Values in period order
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Earliest period, `None` when empty
    pub fn first_period(&self) -> Option<i32> {
        self.observations.first().map(|o| o.period)
    }

    /// Latest period, `None` when empty
    pub fn last_period(&self) -> Option<i32> {
        self.observations.last().map(|o| o.period)
    }

    /// Value recorded for `period`, if any
    pub fn value_at(&self, period: i32) -> Option<f64> {
        self.observations
            .binary_search_by_key(&period, |o| o.period)
            .ok()
            .map(|i| self.observations[i].value)
    }

    /// Whether every year between the first and last period is present
    pub fn is_contiguous(&self) -> bool {
        self.observations
            .windows(2)
            .all(|w| w[1].period == w[0].period + 1)
    }

    /// Years between the first and last period that have no observation
    pub fn missing_periods(&self) -> Vec<i32> {
        self.observations
            .windows(2)
            .flat_map(|w| (w[0].period + 1)..w[1].period)
            .collect()
    }

    /// Copy of this series with every missing year filled with 0.0
    pub fn zero_filled(&self) -> Self {
        let (Some(first), Some(last)) = (self.first_period(), self.last_period()) else {
            return self.clone();
        };
        let observations = (first..=last)
            .map(|period| Observation {
                period,
                value: self.value_at(period).unwrap_or(0.0),
            })
            .collect();
        Self { observations }
    }
}

impl TryFrom<Vec<Observation>> for TimeSeries {
    type Error = ForecastError;

    fn try_from(observations: Vec<Observation>) -> Result<Self> {
        Self::from_observations(observations)
    }
}

impl From<TimeSeries> for Vec<Observation> {
    fn from(series: TimeSeries) -> Self {
        series.observations
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}
