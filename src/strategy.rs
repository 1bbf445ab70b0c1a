//! Strategy contract and composition helpers.
//!
//! A strategy variant owns its own signal research and supplies return
//! matrices; the shared engine turns those into weights, leverage, and
//! statistics. The trait covers the output side of the contract; data and
//! parameter setting happen in each variant's constructor.

use crate::error::{EngineError, Result};
use crate::leverage::{leveraged_returns, LeverageConfig};
use crate::stats::{perf_stats, PerfStats};
use crate::types::{ReturnMatrix, ReturnSeries, WeightMatrix};
use crate::walkforward::{TrackConfig, WeightTracker};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Days between deciding weights and actually holding them.
pub const TRADE_LAG: usize = 2;

/// Output bundle a strategy hands to downstream consumers.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyOutput {
    pub timestamps: Vec<DateTime<Utc>>,
    /// Cumulative growth levels of the strategy returns.
    pub levels: Vec<f64>,
    /// Freshly decided daily weights.
    pub target_weights: WeightMatrix,
    /// Target weights lagged by [`TRADE_LAG`]; leading rows are NaN
    /// placeholders until the first decided weights take effect.
    pub effective_weights: WeightMatrix,
}

/// Trait implemented by every strategy variant.
pub trait Strategy: Send + Sync {
    /// Name of the strategy.
    fn name(&self) -> &str;

    /// Daily returns of the combined strategy.
    fn strategy_returns(&self) -> Result<ReturnSeries>;

    /// Daily constituent weights.
    fn strategy_weights(&self) -> Result<WeightMatrix>;

    /// Assemble the full output bundle.
    fn output(&self) -> Result<StrategyOutput> {
        let returns = self.strategy_returns()?;
        let weights = self.strategy_weights()?;
        Ok(StrategyOutput {
            timestamps: returns.timestamps.clone(),
            levels: returns.cumulative_growth(),
            effective_weights: weights.shift(TRADE_LAG),
            target_weights: weights,
        })
    }

    /// Cumulative growth levels of the strategy returns.
    fn levels(&self) -> Result<Vec<f64>> {
        Ok(self.strategy_returns()?.cumulative_growth())
    }

    /// Performance statistics of the strategy returns.
    fn statistics(&self) -> Result<PerfStats> {
        perf_stats(&self.strategy_returns()?)
    }
}

/// Combine sub-strategy returns under a weight track: each day applies the
/// previous day's weights to that day's returns. The first day has no prior
/// weights and returns 0; non-finite terms (warm-up gaps) are skipped.
pub fn composite_returns(
    sub_returns: &ReturnMatrix,
    weights: &WeightMatrix,
) -> Result<ReturnSeries> {
    if sub_returns.timestamps() != weights.timestamps() {
        return Err(EngineError::DataError(
            "sub-strategy returns and weights must share the same index".to_string(),
        ));
    }
    if sub_returns.num_instruments() != weights.num_instruments() {
        return Err(EngineError::DataError(
            "sub-strategy returns and weights must have the same columns".to_string(),
        ));
    }

    let mut values = Vec::with_capacity(sub_returns.len());
    for i in 0..sub_returns.len() {
        if i == 0 {
            values.push(0.0);
            continue;
        }
        let day_return: f64 = weights
            .row(i - 1)
            .iter()
            .zip(sub_returns.row(i).iter())
            .map(|(w, r)| w * r)
            .filter(|term| term.is_finite())
            .sum();
        values.push(day_return);
    }
    ReturnSeries::new(sub_returns.timestamps().to_vec(), values)
}

/// A strategy that weights a basket of sub-strategy return streams with a
/// walk-forward track, optionally scaling the combined stream to a target
/// volatility.
pub struct CompositeStrategy {
    name: String,
    sub_returns: ReturnMatrix,
    fitting_returns: ReturnMatrix,
    track: TrackConfig,
    vol_target: Option<f64>,
}

impl CompositeStrategy {
    /// Create a composite strategy. The two matrices must share one index;
    /// the track configuration is validated immediately.
    pub fn new(
        name: impl Into<String>,
        sub_returns: ReturnMatrix,
        fitting_returns: ReturnMatrix,
        track: TrackConfig,
    ) -> Result<Self> {
        track.validate()?;
        if !sub_returns.same_index(&fitting_returns) {
            return Err(EngineError::DataError(
                "sub-strategy and fitting matrices must share the same index".to_string(),
            ));
        }
        Ok(Self {
            name: name.into(),
            sub_returns,
            fitting_returns,
            track,
            vol_target: None,
        })
    }

    /// Scale the combined return stream to this annualized volatility.
    pub fn with_vol_target(mut self, target_vol: f64) -> Self {
        self.vol_target = Some(target_vol);
        self
    }
}

impl Strategy for CompositeStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn strategy_weights(&self) -> Result<WeightMatrix> {
        WeightTracker::new(self.track)?.compute(&self.sub_returns, &self.fitting_returns)
    }

    fn strategy_returns(&self) -> Result<ReturnSeries> {
        let weights = self.strategy_weights()?;
        let combined = composite_returns(&self.sub_returns, &weights)?;
        match self.vol_target {
            Some(target_vol) => leveraged_returns(
                &combined,
                &LeverageConfig {
                    rebal_freq: self.track.rebal_freq,
                    training: self.track.training,
                    target_vol,
                },
            ),
            None => Ok(combined),
        }
    }
}
