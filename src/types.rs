//! Core data types for the weighting engine.

use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Trading days per year, used for annualization throughout the engine.
pub const TRADING_DAYS: f64 = 252.0;

/// Observations required before the first weights can be solved.
pub const WARM_UP: usize = 252;

/// Length of the rolling training window, in observations.
pub const WINDOW_SIZE: usize = 252;

/// Upper bound on the volatility-targeting leverage factor.
pub const LEVERAGE_CAP: f64 = 20.0;

/// Tolerance for the unit-sum weight invariant.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Daily return series for a single instrument or strategy.
///
/// Timestamps are strictly increasing with no duplicates; values are simple
/// (not log) returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    /// Create a new return series with validation.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(EngineError::DataError(format!(
                "timestamp/value length mismatch: {} vs {}",
                timestamps.len(),
                values.len()
            )));
        }
        if !is_strictly_increasing(&timestamps) {
            return Err(EngineError::DataError(
                "timestamps must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { timestamps, values })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Cumulative growth curve: running product of (1 + r).
    pub fn cumulative_growth(&self) -> Vec<f64> {
        let mut level = 1.0;
        self.values
            .iter()
            .map(|r| {
                level *= 1.0 + r;
                level
            })
            .collect()
    }
}

/// Dated matrix of daily returns with a fixed instrument order.
///
/// Rows are observations, columns are instruments. Non-finite entries are
/// permitted only in a leading warm-up prefix of each column; once an
/// instrument has started printing returns it must keep printing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMatrix {
    timestamps: Vec<DateTime<Utc>>,
    instruments: Vec<String>,
    values: Array2<f64>,
}

impl ReturnMatrix {
    /// Create a new return matrix with validation.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        instruments: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if values.nrows() != timestamps.len() {
            return Err(EngineError::DataError(format!(
                "row count {} does not match index length {}",
                values.nrows(),
                timestamps.len()
            )));
        }
        if values.ncols() != instruments.len() {
            return Err(EngineError::DataError(format!(
                "column count {} does not match instrument count {}",
                values.ncols(),
                instruments.len()
            )));
        }
        if !is_strictly_increasing(&timestamps) {
            return Err(EngineError::DataError(
                "timestamps must be strictly increasing".to_string(),
            ));
        }
        for (j, name) in instruments.iter().enumerate() {
            let column = values.column(j);
            let first_finite = column.iter().position(|v| v.is_finite());
            if let Some(start) = first_finite {
                if column.iter().skip(start).any(|v| !v.is_finite()) {
                    return Err(EngineError::DataError(format!(
                        "instrument '{name}' has missing values after its first observation"
                    )));
                }
            }
        }
        Ok(Self {
            timestamps,
            instruments,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn num_instruments(&self) -> usize {
        self.instruments.len()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Returns for a single observation.
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    /// Half-open observation window `[start, end)`.
    pub fn window(&self, start: usize, end: usize) -> ArrayView2<'_, f64> {
        self.values.slice(s![start..end, ..])
    }

    /// Single instrument as a return series. Leading missing values are kept
    /// as NaN so the index stays aligned.
    pub fn series(&self, instrument: &str) -> Option<ReturnSeries> {
        let j = self.instruments.iter().position(|s| s == instrument)?;
        Some(ReturnSeries {
            timestamps: self.timestamps.clone(),
            values: self.values.column(j).to_vec(),
        })
    }

    /// Check that another matrix shares this matrix's index.
    pub fn same_index(&self, other: &ReturnMatrix) -> bool {
        self.timestamps == other.timestamps
    }
}

/// Daily portfolio weights sharing the index of the matrix they were
/// computed from.
///
/// Rows produced by a fresh solve or a fresh drift renormalization hold
/// weights in [0, 1] summing to 1; rows shifted out by a trade lag are NaN
/// placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightMatrix {
    timestamps: Vec<DateTime<Utc>>,
    instruments: Vec<String>,
    values: Array2<f64>,
}

impl WeightMatrix {
    pub(crate) fn from_parts(
        timestamps: Vec<DateTime<Utc>>,
        instruments: Vec<String>,
        values: Array2<f64>,
    ) -> Self {
        Self {
            timestamps,
            instruments,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn num_instruments(&self) -> usize {
        self.instruments.len()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Weight row for a single observation.
    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    /// Lag every row by `lag` observations; the first `lag` rows become NaN
    /// placeholders. Models the delay between deciding weights and holding
    /// them.
    pub fn shift(&self, lag: usize) -> WeightMatrix {
        let (rows, cols) = self.values.dim();
        let mut shifted = Array2::from_elem((rows, cols), f64::NAN);
        if lag < rows {
            shifted
                .slice_mut(s![lag.., ..])
                .assign(&self.values.slice(s![..rows - lag, ..]));
        }
        WeightMatrix {
            timestamps: self.timestamps.clone(),
            instruments: self.instruments.clone(),
            values: shifted,
        }
    }

    /// Export as JSON for downstream consumers.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn is_strictly_increasing(timestamps: &[DateTime<Utc>]) -> bool {
    timestamps.windows(2).all(|pair| pair[0] < pair[1])
}
