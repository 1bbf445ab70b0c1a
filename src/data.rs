//! Data loading helpers for return matrices.
//!
//! File-based tooling for tests and demos: a dated CSV with one column per
//! instrument. Production data retrieval and persistence live outside this
//! crate.

use crate::error::{EngineError, Result};
use crate::types::ReturnMatrix;
use chrono::{NaiveDate, NaiveTime};
use ndarray::Array2;
use std::path::Path;

/// CSV parsing options.
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Format of the first (date) column.
    pub date_format: String,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            delimiter: b',',
        }
    }
}

/// Load a return matrix from a CSV file.
///
/// Expected layout: a header of `date,<instrument>,<instrument>,...`
/// followed by one row per day. Empty cells become NaN (allowed only as a
/// leading warm-up prefix per instrument).
pub fn load_returns_csv<P: AsRef<Path>>(path: P, config: &CsvConfig) -> Result<ReturnMatrix> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(EngineError::DataError(
            "expected a date column plus at least one instrument column".to_string(),
        ));
    }
    let instruments: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut timestamps = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(EngineError::DataError(format!(
                "row {} has {} fields, expected {}",
                rows.len() + 2,
                record.len(),
                headers.len()
            )));
        }
        let date = NaiveDate::parse_from_str(&record[0], &config.date_format)?;
        timestamps.push(date.and_time(NaiveTime::MIN).and_utc());

        let mut row = Vec::with_capacity(instruments.len());
        for field in record.iter().skip(1) {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                row.push(f64::NAN);
            } else {
                row.push(trimmed.parse::<f64>().map_err(|e| {
                    EngineError::DataError(format!("invalid value '{trimmed}': {e}"))
                })?);
            }
        }
        rows.push(row);
    }

    let mut values = Array2::from_elem((rows.len(), instruments.len()), f64::NAN);
    for (i, row) in rows.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            values[[i, j]] = value;
        }
    }
    ReturnMatrix::new(timestamps, instruments, values)
}

/// Load a price matrix from a CSV file and convert it to daily returns.
pub fn load_prices_csv<P: AsRef<Path>>(path: P, config: &CsvConfig) -> Result<ReturnMatrix> {
    let prices = load_returns_csv(path, config)?;
    pct_change(&prices)
}

/// Day-over-day percentage change of a dated matrix. The first row (and the
/// first observation after each instrument's warm-up prefix) has no prior
/// value and becomes NaN.
pub fn pct_change(prices: &ReturnMatrix) -> Result<ReturnMatrix> {
    let (rows, cols) = prices.values().dim();
    let mut returns = Array2::from_elem((rows, cols), f64::NAN);
    for j in 0..cols {
        for i in 1..rows {
            let prev = prices.values()[[i - 1, j]];
            let current = prices.values()[[i, j]];
            if prev.is_finite() && current.is_finite() && prev != 0.0 {
                returns[[i, j]] = current / prev - 1.0;
            }
        }
    }
    ReturnMatrix::new(
        prices.timestamps().to_vec(),
        prices.instruments().to_vec(),
        returns,
    )
}
