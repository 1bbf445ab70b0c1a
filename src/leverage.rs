//! Volatility-targeting leverage overlay.
//!
//! Independent of the weight track: a strategy's own return stream is
//! compared against a target annualized volatility at each rebalance date,
//! producing a capped integer-ish multiplier that forward-fills between
//! rebalances. Flat stretches (zero returns) are excluded from the
//! volatility estimate so that dormant strategies do not read as low-risk.

use crate::error::{EngineError, Result};
use crate::schedule::rebalance_flags;
use crate::stats::sample_std;
use crate::types::{ReturnSeries, LEVERAGE_CAP, TRADING_DAYS, WARM_UP, WINDOW_SIZE};
use crate::walkforward::TrainingMethod;
use serde::{Deserialize, Serialize};

/// Configuration for the leverage overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageConfig {
    /// Recompute the factor every `rebal_freq` index positions.
    pub rebal_freq: usize,
    /// Training window mode for the volatility estimate.
    pub training: TrainingMethod,
    /// Target annualized volatility, e.g. 0.20 for 20%.
    pub target_vol: f64,
}

impl LeverageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rebal_freq == 0 {
            return Err(EngineError::ConfigError(
                "rebalance frequency must be at least 1".to_string(),
            ));
        }
        if !self.target_vol.is_finite() || self.target_vol <= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "target volatility must be positive, got {}",
                self.target_vol
            )));
        }
        Ok(())
    }
}

/// Compute the leverage factor series, aligned 1:1 with the input index.
///
/// At each rebalance position `i >= WARM_UP`: with no non-zero history the
/// factor is 1; otherwise it is `min(LEVERAGE_CAP, round(target_vol /
/// realized_vol))` over the strictly non-zero returns of the training
/// window. Between rebalances the last value forward-fills, and anything
/// still undefined or non-positive falls back to the neutral factor 1.
pub fn leverage_factors(series: &ReturnSeries, config: &LeverageConfig) -> Result<Vec<f64>> {
    config.validate()?;
    let len = series.len();
    let flags = rebalance_flags(len, config.rebal_freq)?;

    let mut raw: Vec<Option<f64>> = vec![None; len];
    for i in WARM_UP..len {
        if !flags[i] {
            continue;
        }
        let has_history = series.values[..i]
            .iter()
            .any(|v| *v != 0.0 && v.is_finite());
        if !has_history {
            raw[i] = Some(1.0);
            continue;
        }
        let window = match config.training {
            TrainingMethod::Expanding => &series.values[..i],
            TrainingMethod::Rolling => &series.values[i - WINDOW_SIZE..i],
        };
        let active: Vec<f64> = window
            .iter()
            .copied()
            .filter(|v| *v != 0.0 && v.is_finite())
            .collect();
        if active.len() < 2 {
            continue;
        }
        let realized_vol = sample_std(&active) * TRADING_DAYS.sqrt();
        if !realized_vol.is_finite() || realized_vol <= 0.0 {
            continue;
        }
        let factor = (config.target_vol / realized_vol).round().min(LEVERAGE_CAP);
        if factor.is_finite() {
            raw[i] = Some(factor);
        }
    }

    let mut factors = Vec::with_capacity(len);
    let mut last: Option<f64> = None;
    for value in raw {
        if let Some(v) = value {
            last = Some(v);
        }
        let filled = last.unwrap_or(1.0);
        factors.push(if filled > 0.0 { filled } else { 1.0 });
    }
    Ok(factors)
}

/// Scale a return stream by its leverage factors.
pub fn leveraged_returns(series: &ReturnSeries, config: &LeverageConfig) -> Result<ReturnSeries> {
    let factors = leverage_factors(series, config)?;
    let values = series
        .values
        .iter()
        .zip(factors.iter())
        .map(|(r, f)| r * f)
        .collect();
    ReturnSeries::new(series.timestamps.clone(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap() + chrono::Duration::days(i as i64)
    }

    fn series(values: Vec<f64>) -> ReturnSeries {
        let timestamps = (0..values.len()).map(day).collect();
        ReturnSeries::new(timestamps, values).unwrap()
    }

    /// Alternating +/-a returns: realized annualized vol ~ a * sqrt(252).
    fn alternating(len: usize, amplitude: f64) -> ReturnSeries {
        series(
            (0..len)
                .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
                .collect(),
        )
    }

    fn config(training: TrainingMethod, target_vol: f64) -> LeverageConfig {
        LeverageConfig {
            rebal_freq: 21,
            training,
            target_vol,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(config(TrainingMethod::Expanding, 0.2).validate().is_ok());
        assert!(config(TrainingMethod::Expanding, 0.0).validate().is_err());
        assert!(config(TrainingMethod::Expanding, -0.1).validate().is_err());
        let zero_freq = LeverageConfig {
            rebal_freq: 0,
            training: TrainingMethod::Expanding,
            target_vol: 0.2,
        };
        assert!(zero_freq.validate().is_err());
    }

    #[test]
    fn test_double_leverage_at_half_target_vol() {
        // Realized vol ~ 10% annualized, target 20% -> factor 2.
        let amplitude = 0.10 / TRADING_DAYS.sqrt();
        let returns = alternating(505, amplitude);
        let factors =
            leverage_factors(&returns, &config(TrainingMethod::Expanding, 0.20)).unwrap();
        assert!((factors[WARM_UP] - 2.0).abs() < 1e-12);
        assert!((factors[504] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_warm_up_defaults_to_one() {
        let returns = alternating(505, 0.01);
        let factors =
            leverage_factors(&returns, &config(TrainingMethod::Expanding, 0.20)).unwrap();
        for &f in &factors[..WARM_UP] {
            assert_eq!(f, 1.0);
        }
    }

    #[test]
    fn test_all_zero_history_is_neutral() {
        let returns = series(vec![0.0; 400]);
        let factors =
            leverage_factors(&returns, &config(TrainingMethod::Expanding, 0.20)).unwrap();
        assert!(factors.iter().all(|&f| f == 1.0));
    }

    #[test]
    fn test_cap_applies() {
        // Vanishingly small realized vol would imply huge leverage.
        let returns = alternating(505, 1e-6);
        let factors =
            leverage_factors(&returns, &config(TrainingMethod::Expanding, 0.20)).unwrap();
        assert_eq!(factors[504], LEVERAGE_CAP);
    }

    #[test]
    fn test_zero_rounding_falls_back_to_one() {
        // Realized vol ~ 10%, target 4% -> ratio 0.4 rounds to 0 -> neutral.
        let amplitude = 0.10 / TRADING_DAYS.sqrt();
        let returns = alternating(505, amplitude);
        let factors =
            leverage_factors(&returns, &config(TrainingMethod::Expanding, 0.04)).unwrap();
        assert!(factors.iter().all(|&f| f == 1.0));
    }

    #[test]
    fn test_rolling_reacts_to_regime_change() {
        // High-vol first year, low-vol afterwards: the rolling estimate
        // forgets the old regime and levers up more than the expanding one.
        let mut values: Vec<f64> = Vec::new();
        let high = 0.20 / TRADING_DAYS.sqrt();
        let low = 0.05 / TRADING_DAYS.sqrt();
        for i in 0..300 {
            values.push(if i % 2 == 0 { high } else { -high });
        }
        for i in 300..700 {
            values.push(if i % 2 == 0 { low } else { -low });
        }
        let returns = series(values);
        let rolling =
            leverage_factors(&returns, &config(TrainingMethod::Rolling, 0.20)).unwrap();
        let expanding =
            leverage_factors(&returns, &config(TrainingMethod::Expanding, 0.20)).unwrap();
        assert!(rolling[699] > expanding[699]);
    }

    #[test]
    fn test_factors_always_in_range() {
        let returns = alternating(600, 0.004);
        let factors =
            leverage_factors(&returns, &config(TrainingMethod::Rolling, 0.25)).unwrap();
        assert!(factors.iter().all(|&f| f > 0.0 && f <= LEVERAGE_CAP));
    }

    #[test]
    fn test_leveraged_returns_scale() {
        let amplitude = 0.10 / TRADING_DAYS.sqrt();
        let returns = alternating(505, amplitude);
        let levered =
            leveraged_returns(&returns, &config(TrainingMethod::Expanding, 0.20)).unwrap();
        // Before the first rebalance the factor is 1.
        assert!((levered.values[0] - returns.values[0]).abs() < 1e-15);
        // After it, returns are doubled.
        assert!((levered.values[504] - 2.0 * returns.values[504]).abs() < 1e-15);
    }
}
