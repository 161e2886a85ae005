//! Source datasets and column access
//!
//! The forecasting core never loads files itself. Callers hand it a
//! [`DataProvider`], usually a [`HealthDataset`] wrapping frames they already
//! loaded, and the extractor reads columns through the helpers below.

use crate::config::DatasetSchema;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeSet;

/// Read-only access to the datasets a forecast is computed from
pub trait DataProvider: Send + Sync {
    /// Transactional frame: one row per encounter with city, start date,
    /// claim cost, provider and expense columns
    fn encounters(&self) -> Result<&DataFrame>;

    /// Wide population frame: one row per city, one column per year
    fn population(&self) -> Result<&DataFrame>;

    /// Column names used to read both frames
    fn schema(&self) -> &DatasetSchema;

    /// Distinct cities of the transactional frame, sorted
    fn cities(&self) -> Result<Vec<String>> {
        let frame = self.encounters()?;
        let column = text_column(frame, &self.schema().city_column)?;
        let cities: BTreeSet<String> = column.into_iter().flatten().collect();
        Ok(cities.into_iter().collect())
    }
}

/// In-memory datasets backed by polars frames
#[derive(Debug, Clone, Default)]
pub struct HealthDataset {
    encounters: Option<DataFrame>,
    population: Option<DataFrame>,
    schema: DatasetSchema,
}

impl HealthDataset {
    /// Create a dataset from both frames with the default schema
    pub fn new(encounters: DataFrame, population: DataFrame) -> Self {
        Self {
            encounters: Some(encounters),
            population: Some(population),
            schema: DatasetSchema::default(),
        }
    }

    /// Create a dataset holding only the transactional frame
    pub fn from_encounters(encounters: DataFrame) -> Self {
        Self {
            encounters: Some(encounters),
            ..Self::default()
        }
    }

    /// Create a dataset holding only the population frame
    pub fn from_population(population: DataFrame) -> Self {
        Self {
            population: Some(population),
            ..Self::default()
        }
    }

    /// Replace the population frame
    pub fn with_population(mut self, population: DataFrame) -> Self {
        self.population = Some(population);
        self
    }

    /// Replace the column naming
    pub fn with_schema(mut self, schema: DatasetSchema) -> Self {
        self.schema = schema;
        self
    }
}

impl DataProvider for HealthDataset {
    fn encounters(&self) -> Result<&DataFrame> {
        self.encounters
            .as_ref()
            .ok_or_else(|| ForecastError::DataError("no encounter dataset loaded".to_string()))
    }

    fn population(&self) -> Result<&DataFrame> {
        self.population
            .as_ref()
            .ok_or_else(|| ForecastError::DataError("no population dataset loaded".to_string()))
    }

    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }
}

/// Look up a column, turning a missing name into a `DataError`
pub(crate) fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map_err(|e| ForecastError::DataError(format!("Column '{}' not found: {}", name, e)))
}

/// Rows of `df` whose `city_column` equals `city`
pub(crate) fn filter_city(df: &DataFrame, city_column: &str, city: &str) -> Result<DataFrame> {
    let cities = column(df, city_column)?.cast(&DataType::Utf8)?;
    let mask = cities.utf8()?.equal(city);
    Ok(df.filter(&mask)?)
}

/// Numeric column as `f64`, preserving nulls so rows stay aligned
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = column(df, name)?;
    if !col.dtype().is_numeric() {
        return Err(ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64 (dtype {})",
            name,
            col.dtype()
        )));
    }
    let casted = col.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Any column rendered as text, preserving nulls
pub(crate) fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let casted = column(df, name)?.cast(&DataType::Utf8)?;
    Ok(casted
        .utf8()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Calendar year of each row of a date-like column.
///
/// Accepts polars `Date` and `Datetime` columns, text columns holding ISO
/// dates or timestamps, and integer columns that already hold years.
/// Values that cannot be interpreted become `None`.
pub(crate) fn year_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let col = column(df, name)?;
    match col.dtype() {
        DataType::Date => Ok(col.date()?.year().into_iter().collect()),
        DataType::Datetime(_, _) => Ok(col.datetime()?.year().into_iter().collect()),
        DataType::Utf8 => Ok(col
            .utf8()?
            .into_iter()
            .map(|v| v.and_then(parse_year))
            .collect()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let casted = col.cast(&DataType::Int32)?;
            Ok(casted.i32()?.into_iter().collect())
        }
        other => Err(ForecastError::DataError(format!(
            "Column '{}' has dtype {} which carries no date",
            name, other
        ))),
    }
}

/// Year of a textual date; `None` when the text is not a recognised date.
pub(crate) fn parse_year(text: &str) -> Option<i32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.year());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.year());
        }
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.year());
        }
    }
    if text.len() == 4 {
        return text.parse::<i32>().ok();
    }
    None
}

/// Numeric value of a single population cell.
///
/// Text cells may carry thousands separators ("12,345").
pub(crate) fn cell_as_f64(series: &Series, row: usize) -> Result<Option<f64>> {
    let value = series.get(row)?;
    let parsed = match value {
        AnyValue::Null => None,
        AnyValue::Utf8(text) => {
            let cleaned: String = text.chars().filter(|c| *c != ',').collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.parse::<f64>().map_err(|_| {
                    ForecastError::DataError(format!(
                        "Column '{}' holds non-numeric value '{}'",
                        series.name(),
                        text
                    ))
                })?)
            }
        }
        other => Some(other.extract::<f64>().ok_or_else(|| {
            ForecastError::DataError(format!(
                "Column '{}' cannot be converted to f64 (dtype {})",
                series.name(),
                series.dtype()
            ))
        })?),
    };
    Ok(parsed.filter(|v| !v.is_nan()))
}
