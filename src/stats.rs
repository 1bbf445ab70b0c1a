//! Performance statistics for daily return streams.
//!
//! Pure functions: a return series in, a metrics record out. Charting and
//! report rendering belong to downstream consumers.

use crate::error::{EngineError, Result};
use crate::types::{ReturnSeries, WeightMatrix, TRADING_DAYS};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Weight moves smaller than this are not counted as trades.
const TRADE_EPSILON: f64 = 0.01;

/// Performance metrics for a strategy return stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfStats {
    /// Compound annual growth rate, from calendar-day elapsed time.
    pub annualized_return: f64,
    /// Annualized standard deviation of daily returns.
    pub annualized_volatility: f64,
    /// Annualized return over annualized volatility; 0 when volatility is 0.
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline of the growth curve, as a positive magnitude.
    pub max_drawdown: f64,
    /// Annualized return over max drawdown; 0 when drawdown is 0.
    pub calmar_ratio: f64,
}

impl PerfStats {
    /// Human-readable summary block.
    pub fn summary(&self) -> String {
        format!(
            "Annualized Return: {:.2}%\n\
             Annualized Volatility: {:.2}%\n\
             Sharpe Ratio: {:.2}\n\
             Maximum Drawdown: {:.2}%\n\
             Calmar Ratio: {:.2}",
            self.annualized_return * 100.0,
            self.annualized_volatility * 100.0,
            self.sharpe_ratio,
            self.max_drawdown * 100.0,
            self.calmar_ratio
        )
    }
}

/// Sample standard deviation (ddof = 1). NaN for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

/// Compute performance statistics for a daily return series.
///
/// Requires at least two observations spanning a positive number of calendar
/// days. Division hazards (flat volatility, zero drawdown) produce 0 rather
/// than an error.
pub fn perf_stats(returns: &ReturnSeries) -> Result<PerfStats> {
    if returns.len() < 2 {
        return Err(EngineError::DataError(
            "need at least two observations for performance statistics".to_string(),
        ));
    }
    let elapsed_days = (*returns.timestamps.last().unwrap() - returns.timestamps[0]).num_days();
    if elapsed_days <= 0 {
        return Err(EngineError::DataError(
            "return series spans no calendar time".to_string(),
        ));
    }

    let growth = returns.cumulative_growth();
    let final_growth = *growth.last().unwrap();
    let annualized_return = final_growth.powf(365.0 / elapsed_days as f64) - 1.0;
    let annualized_volatility = TRADING_DAYS.sqrt() * sample_std(&returns.values);
    let max_drawdown = max_drawdown_of_curve(&growth);

    let sharpe_ratio = if annualized_volatility == 0.0 {
        0.0
    } else {
        annualized_return / annualized_volatility
    };
    let calmar_ratio = if max_drawdown == 0.0 {
        0.0
    } else {
        annualized_return / max_drawdown
    };

    Ok(PerfStats {
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        max_drawdown,
        calmar_ratio,
    })
}

/// Largest peak-to-trough decline of a cumulative growth curve, as a
/// positive magnitude (0 for a curve that never falls below its peak).
fn max_drawdown_of_curve(growth: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &level in growth {
        peak = peak.max(level);
        let drawdown = level / peak - 1.0;
        worst = worst.min(drawdown);
    }
    -worst
}

/// Calendar-year returns of the growth curve. The first year in the series
/// has no prior year-end to compare against and is dropped.
pub fn yearly_returns(returns: &ReturnSeries) -> Vec<(i32, f64)> {
    let growth = returns.cumulative_growth();
    let mut year_ends: Vec<(i32, f64)> = Vec::new();
    for (ts, level) in returns.timestamps.iter().zip(growth.iter()) {
        let year = ts.year();
        match year_ends.last_mut() {
            Some((last_year, last_level)) if *last_year == year => *last_level = *level,
            _ => year_ends.push((year, *level)),
        }
    }
    year_ends
        .windows(2)
        .map(|pair| (pair[1].0, pair[1].1 / pair[0].1 - 1.0))
        .collect()
}

/// Annualized count of weight moves larger than 1% across all instruments.
///
/// A proxy for portfolio turnover: each per-instrument day-over-day weight
/// change beyond the threshold counts as one trade.
pub fn annualized_trade_count(weights: &WeightMatrix) -> Result<f64> {
    if weights.len() < 2 {
        return Err(EngineError::DataError(
            "need at least two weight rows for a trade count".to_string(),
        ));
    }
    let elapsed_days =
        (*weights.timestamps().last().unwrap() - weights.timestamps()[0]).num_days();
    if elapsed_days <= 0 {
        return Err(EngineError::DataError(
            "weight matrix spans no calendar time".to_string(),
        ));
    }

    let values = weights.values();
    let mut trades = 0usize;
    for i in 1..values.nrows() {
        for j in 0..values.ncols() {
            let delta = values[[i, j]] - values[[i - 1, j]];
            if delta.is_finite() && delta.abs() > TRADE_EPSILON {
                trades += 1;
            }
        }
    }
    Ok(trades as f64 * 365.0 / elapsed_days as f64)
}
