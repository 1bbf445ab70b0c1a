//! Walk-forward weight tracks.
//!
//! A track re-optimizes allocations on scheduled rebalance dates and lets
//! them drift with realized returns in between. Rebalance solves are pure
//! functions of read-only historical windows and run in parallel; the drift
//! recurrence is strictly sequential because every row reads the previous
//! one.

use crate::error::{EngineError, Result};
use crate::optimize::{ProjectedGradient, SimplexMinimizer};
use crate::schedule::rebalance_flags;
use crate::solver::{solve_rebalance_weights, WeightingScheme};
use crate::types::{ReturnMatrix, WeightMatrix, WARM_UP, WINDOW_SIZE};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// How the training window grows as the track walks forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMethod {
    /// All observations from the start of the series up to the rebalance date.
    Expanding,
    /// A fixed trailing window of [`WINDOW_SIZE`] observations.
    Rolling,
}

impl FromStr for TrainingMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "expanding" => Ok(TrainingMethod::Expanding),
            "rolling" => Ok(TrainingMethod::Rolling),
            other => Err(EngineError::ConfigError(format!(
                "invalid training method '{other}' - choose from 'expanding' or 'rolling'"
            ))),
        }
    }
}

impl fmt::Display for TrainingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingMethod::Expanding => write!(f, "expanding"),
            TrainingMethod::Rolling => write!(f, "rolling"),
        }
    }
}

/// Configuration for one walk-forward weight track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Rebalance every `rebal_freq` index positions.
    pub rebal_freq: usize,
    /// Weighting scheme solved at each rebalance date.
    pub scheme: WeightingScheme,
    /// Training window mode.
    pub training: TrainingMethod,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            rebal_freq: 21,
            scheme: WeightingScheme::Equal,
            training: TrainingMethod::Expanding,
        }
    }
}

impl TrackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rebal_freq == 0 {
            return Err(EngineError::ConfigError(
                "rebalance frequency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Computes daily weight tracks from return matrices.
pub struct WeightTracker {
    config: TrackConfig,
    minimizer: Box<dyn SimplexMinimizer>,
}

impl WeightTracker {
    /// Create a tracker with the default minimizer. Configuration is
    /// validated immediately.
    pub fn new(config: TrackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            minimizer: Box::new(ProjectedGradient::default()),
        })
    }

    /// Swap in a different minimizer implementation.
    pub fn with_minimizer(mut self, minimizer: Box<dyn SimplexMinimizer>) -> Self {
        self.minimizer = minimizer;
        self
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    /// Compute the full daily weight matrix.
    ///
    /// `weighted` is the matrix whose columns receive weights and whose
    /// returns drive drift; `fitting` supplies the training windows (the two
    /// may differ, e.g. strategy-level columns weighted while risk is fit on
    /// instrument-level returns). Both must share one index and column
    /// count.
    ///
    /// Rows before [`WARM_UP`], rows before the first successful rebalance,
    /// and rows whose solve failed are filled with uniform 1/n.
    pub fn compute(&self, weighted: &ReturnMatrix, fitting: &ReturnMatrix) -> Result<WeightMatrix> {
        if !weighted.same_index(fitting) {
            return Err(EngineError::DataError(
                "weighted and fitting matrices must share the same index".to_string(),
            ));
        }
        let n = weighted.num_instruments();
        if n == 0 {
            return Err(EngineError::DataError(
                "cannot weight a matrix with zero instruments".to_string(),
            ));
        }
        if fitting.num_instruments() != n {
            return Err(EngineError::DataError(format!(
                "fitting matrix has {} instruments, weighted matrix has {}",
                fitting.num_instruments(),
                n
            )));
        }

        let len = weighted.len();
        let flags = rebalance_flags(len, self.config.rebal_freq)?;
        info!(
            rows = len,
            instruments = n,
            scheme = %self.config.scheme,
            training = %self.config.training,
            "computing walk-forward weight track"
        );

        // Rebalance solves are independent reads of the fitting matrix;
        // solve them in parallel and assemble in index order.
        let rebalance_rows: Vec<usize> = (WARM_UP..len).filter(|&i| flags[i]).collect();
        let solved: Vec<(usize, Option<Vec<f64>>)> = rebalance_rows
            .par_iter()
            .map(|&i| {
                let start = match self.config.training {
                    TrainingMethod::Expanding => 0,
                    TrainingMethod::Rolling => i - WINDOW_SIZE,
                };
                let window = complete_rows(&fitting.window(start, i));
                match solve_rebalance_weights(window.view(), self.config.scheme, &*self.minimizer)
                {
                    Ok(weights) => (i, Some(weights)),
                    Err(err) => {
                        warn!(row = i, error = %err, "rebalance solve failed; row left undefined");
                        (i, None)
                    }
                }
            })
            .collect();

        let mut solved_rows: Vec<Option<Vec<f64>>> = vec![None; len];
        for (i, weights) in solved {
            solved_rows[i] = weights;
        }

        // Sequential recurrence: a rebalance row replaces the state, a drift
        // row evolves it. Failed solves reset the state so stale weights are
        // not carried across them.
        let mut rows: Vec<Option<Array1<f64>>> = vec![None; len];
        let mut previous: Option<Array1<f64>> = None;
        for i in WARM_UP..len {
            if flags[i] {
                previous = solved_rows[i].take().map(Array1::from_vec);
            } else if let Some(prev) = &previous {
                previous = Some(drift_step(prev.view(), weighted.row(i)));
            }
            if let Some(weights) = &previous {
                rows[i] = Some(weights.clone());
            }
        }

        // Undefined rows fall back to a uniform allocation.
        let uniform = 1.0 / n as f64;
        let mut values = Array2::from_elem((len, n), uniform);
        for (i, row) in rows.into_iter().enumerate() {
            if let Some(weights) = row {
                values.row_mut(i).assign(&weights);
            }
        }

        Ok(WeightMatrix::from_parts(
            weighted.timestamps().to_vec(),
            weighted.instruments().to_vec(),
            values,
        ))
    }
}

/// One buy-and-hold drift step: grow each weight by its realized return,
/// then renormalize to unit sum.
///
/// Degenerate rows keep the allocation observable: a component driven below
/// zero (return under -100%) is wiped to zero, and if the grown row sums to
/// nothing or is non-finite the prior weights are held unchanged.
pub fn drift_step(previous: ArrayView1<'_, f64>, returns: ArrayView1<'_, f64>) -> Array1<f64> {
    let grown: Vec<f64> = previous
        .iter()
        .zip(returns.iter())
        .map(|(w, r)| w * (1.0 + r))
        .collect();
    if grown.iter().any(|v| !v.is_finite()) {
        return previous.to_owned();
    }
    let floored: Vec<f64> = grown.into_iter().map(|v| v.max(0.0)).collect();
    let total: f64 = floored.iter().sum();
    if total <= 1e-12 {
        return previous.to_owned();
    }
    Array1::from_vec(floored.into_iter().map(|v| v / total).collect())
}

/// Drop observations that contain any non-finite value, keeping only fully
/// populated rows for fitting. Missing values occur only in warm-up
/// prefixes, so this trims late-starting instruments' gap rows.
fn complete_rows(window: &ArrayView2<'_, f64>) -> Array2<f64> {
    let complete: Vec<usize> = (0..window.nrows())
        .filter(|&t| window.row(t).iter().all(|v| v.is_finite()))
        .collect();
    let mut out = Array2::zeros((complete.len(), window.ncols()));
    for (dest, &src) in complete.iter().enumerate() {
        out.row_mut(dest).assign(&window.row(src));
    }
    out
}
