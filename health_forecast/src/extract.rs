//! Series Extractor
//!
//! Turns a city's slice of the source datasets into a year-indexed series.
//! Metric-specific behaviour lives entirely in [`Metric::reduction`]; the
//! forecasting side sees one uniform [`TimeSeries`].

use crate::config::GapPolicy;
use crate::data::{cell_as_f64, filter_city, numeric_column, text_column, year_column, DataProvider};
use crate::error::{ForecastError, Result};
use crate::series::TimeSeries;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Healthcare metric that can be forecast per city
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Metric {
    Population,
    ClaimCost,
    Encounters,
    Providers,
    Expenses,
}

/// How rows falling in the same year are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Read the city's row of the wide per-year table
    Transpose,
    /// Sum of the value column
    Sum,
    /// Number of non-null identifiers
    Count,
    /// Number of distinct non-null identifiers
    DistinctCount,
}

impl Metric {
    /// Every metric, in dashboard order
    pub const ALL: [Metric; 5] = [
        Metric::Population,
        Metric::ClaimCost,
        Metric::Encounters,
        Metric::Providers,
        Metric::Expenses,
    ];

    /// Human-readable label used in chart titles and axes
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Population => "Population",
            Metric::ClaimCost => "Claim Costs",
            Metric::Encounters => "Encounters",
            Metric::Providers => "Providers",
            Metric::Expenses => "Healthcare Expenses",
        }
    }

    /// Reduction applied to the rows of one year
    pub fn reduction(&self) -> Reduction {
        match self {
            Metric::Population => Reduction::Transpose,
            Metric::ClaimCost | Metric::Expenses => Reduction::Sum,
            Metric::Encounters => Reduction::Count,
            Metric::Providers => Reduction::DistinctCount,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            Metric::Population => "POPULATION",
            Metric::ClaimCost => "CLAIM_COST",
            Metric::Encounters => "ENCOUNTERS",
            Metric::Providers => "PROVIDERS",
            Metric::Expenses => "EXPENSES",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Metric::ALL
            .into_iter()
            .find(|m| m.key() == normalized)
            .ok_or_else(|| ForecastError::InvalidRequestError(format!("unrecognized metric '{}'", s)))
    }
}

/// Builds per-city series from a [`DataProvider`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesExtractor {
    gap_policy: GapPolicy,
}

impl SeriesExtractor {
    /// Create an extractor with the given gap policy
    pub fn new(gap_policy: GapPolicy) -> Self {
        Self { gap_policy }
    }

    /// Gap policy in use
    pub fn gap_policy(&self) -> GapPolicy {
        self.gap_policy
    }

    /// Series of `metric` for `city`.
    ///
    /// Fails with `InsufficientDataError` when the city has no rows, or when
    /// none of its rows carries a usable year.
    pub fn extract(
        &self,
        provider: &dyn DataProvider,
        city: &str,
        metric: Metric,
    ) -> Result<TimeSeries> {
        let by_period = match metric.reduction() {
            Reduction::Transpose => population_by_period(provider, city)?,
            reduction => transactional_by_period(provider, city, metric, reduction)?,
        };

        if by_period.is_empty() {
            return Err(ForecastError::InsufficientDataError(format!(
                "no dated {} observations for city '{}'",
                metric.label().to_lowercase(),
                city
            )));
        }

        let series = TimeSeries::new(by_period.into_iter().collect())?;
        debug!(
            city,
            %metric,
            points = series.len(),
            first = series.first_period(),
            last = series.last_period(),
            "extracted series"
        );

        Ok(match self.gap_policy {
            GapPolicy::Exclude => series,
            GapPolicy::ZeroFill => series.zero_filled(),
        })
    }
}

/// Convenience wrapper using the default gap policy
pub fn extract(provider: &dyn DataProvider, city: &str, metric: Metric) -> Result<TimeSeries> {
    SeriesExtractor::default().extract(provider, city, metric)
}

fn transactional_by_period(
    provider: &dyn DataProvider,
    city: &str,
    metric: Metric,
    reduction: Reduction,
) -> Result<BTreeMap<i32, f64>> {
    let schema = provider.schema();
    let rows = filter_city(provider.encounters()?, &schema.city_column, city)?;
    if rows.height() == 0 {
        return Err(ForecastError::InsufficientDataError(format!(
            "city '{}' has no rows in the encounter dataset",
            city
        )));
    }

    let value_column = schema.value_column(metric).ok_or_else(|| {
        ForecastError::InvalidRequestError(format!("{} is not read from encounter rows", metric))
    })?;
    let years = year_column(&rows, &schema.date_column)?;

    match reduction {
        Reduction::Sum => Ok(sum_by_period(&years, &numeric_column(&rows, value_column)?)),
        Reduction::Count => Ok(count_by_period(&years, &text_column(&rows, value_column)?)),
        Reduction::DistinctCount => {
            Ok(distinct_by_period(&years, &text_column(&rows, value_column)?))
        }
        Reduction::Transpose => Err(ForecastError::InvalidRequestError(format!(
            "{} is read from the population table",
            metric
        ))),
    }
}

/// Rows without a year are dropped; null values contribute nothing to the sum
fn sum_by_period(years: &[Option<i32>], values: &[Option<f64>]) -> BTreeMap<i32, f64> {
    let mut sums = BTreeMap::new();
    for (year, value) in years.iter().zip(values) {
        if let Some(year) = year {
            let total = sums.entry(*year).or_insert(0.0);
            if let Some(v) = value.filter(|v| !v.is_nan()) {
                *total += v;
            }
        }
    }
    sums
}

fn count_by_period(years: &[Option<i32>], ids: &[Option<String>]) -> BTreeMap<i32, f64> {
    let mut counts = BTreeMap::new();
    for (year, id) in years.iter().zip(ids) {
        if let Some(year) = year {
            let count = counts.entry(*year).or_insert(0.0);
            if id.is_some() {
                *count += 1.0;
            }
        }
    }
    counts
}

fn distinct_by_period(years: &[Option<i32>], ids: &[Option<String>]) -> BTreeMap<i32, f64> {
    let mut seen: BTreeMap<i32, HashSet<&str>> = BTreeMap::new();
    for (year, id) in years.iter().zip(ids) {
        if let Some(year) = year {
            let set = seen.entry(*year).or_default();
            if let Some(id) = id {
                set.insert(id.as_str());
            }
        }
    }
    seen.into_iter()
        .map(|(year, ids)| (year, ids.len() as f64))
        .collect()
}

fn population_by_period(provider: &dyn DataProvider, city: &str) -> Result<BTreeMap<i32, f64>> {
    let city_column = &provider.schema().population_city_column;
    let row = filter_city(provider.population()?, city_column, city)?;
    match row.height() {
        0 => {
            return Err(ForecastError::InsufficientDataError(format!(
                "city '{}' has no row in the population dataset",
                city
            )))
        }
        1 => {}
        n => {
            return Err(ForecastError::DataError(format!(
                "city '{}' has {} rows in the population dataset, expected one",
                city, n
            )))
        }
    }
    transpose_row(&row, city_column)
}

/// Year columns of a single-row frame as `year -> value`
fn transpose_row(row: &DataFrame, city_column: &str) -> Result<BTreeMap<i32, f64>> {
    let mut by_year = BTreeMap::new();
    for series in row.get_columns() {
        if series.name() == city_column {
            continue;
        }
        let Ok(year) = series.name().trim().parse::<i32>() else {
            debug!(column = series.name(), "skipping non-year population column");
            continue;
        };
        let Some(value) = cell_as_f64(series, 0)? else {
            continue;
        };
        if by_year.insert(year, value).is_some() {
            return Err(ForecastError::DataError(format!(
                "population dataset has more than one column for year {}",
                year
            )));
        }
    }
    Ok(by_year)
}
