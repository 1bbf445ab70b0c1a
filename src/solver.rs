//! Portfolio weighting schemes and the per-window weight solver.
//!
//! Each rebalance date hands a fully-populated historical return window to
//! [`solve_rebalance_weights`], which returns a weight vector on the unit
//! simplex. Equal weighting is closed form; the other schemes minimize a
//! portfolio objective through the pluggable [`SimplexMinimizer`] seam.

use crate::error::{EngineError, Result};
use crate::optimize::SimplexMinimizer;
use crate::types::TRADING_DAYS;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// How rebalance weights are determined from a historical window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingScheme {
    /// Uniform 1/n allocation.
    Equal,
    /// Minimize annualized portfolio volatility.
    MinVariance,
    /// Maximize annualized Sharpe ratio.
    MaxSharpe,
    /// Equalize annualized risk contributions across instruments.
    RiskParity,
}

impl FromStr for WeightingScheme {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "equal" => Ok(WeightingScheme::Equal),
            "min_variance" => Ok(WeightingScheme::MinVariance),
            "max_sharpe" => Ok(WeightingScheme::MaxSharpe),
            "risk_parity" => Ok(WeightingScheme::RiskParity),
            other => Err(EngineError::ConfigError(format!(
                "invalid weighting scheme '{other}' - choose from 'equal', \
                 'min_variance', 'max_sharpe', or 'risk_parity'"
            ))),
        }
    }
}

impl fmt::Display for WeightingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightingScheme::Equal => "equal",
            WeightingScheme::MinVariance => "min_variance",
            WeightingScheme::MaxSharpe => "max_sharpe",
            WeightingScheme::RiskParity => "risk_parity",
        };
        write!(f, "{name}")
    }
}

/// Per-instrument mean of a return window.
pub fn sample_mean(window: &ArrayView2<f64>) -> Array1<f64> {
    let rows = window.nrows() as f64;
    window.sum_axis(ndarray::Axis(0)) / rows
}

/// Sample covariance (ddof = 1) of a return window. Requires two rows.
pub fn sample_covariance(window: &ArrayView2<f64>) -> Array2<f64> {
    let (rows, cols) = window.dim();
    let mean = sample_mean(window);
    let mut cov = Array2::zeros((cols, cols));
    for t in 0..rows {
        let row = window.row(t);
        for j in 0..cols {
            let dj = row[j] - mean[j];
            for k in j..cols {
                cov[[j, k]] += dj * (row[k] - mean[k]);
            }
        }
    }
    let denom = (rows as f64 - 1.0).max(1.0);
    for j in 0..cols {
        for k in j..cols {
            let value = cov[[j, k]] / denom;
            cov[[j, k]] = value;
            cov[[k, j]] = value;
        }
    }
    cov
}

/// Annualized portfolio volatility `sqrt(252 * w' C w)`.
pub fn portfolio_volatility(weights: &[f64], covariance: &Array2<f64>) -> f64 {
    let w = ArrayView1::from(weights);
    (w.dot(&covariance.dot(&w)) * TRADING_DAYS).sqrt()
}

/// Negative annualized Sharpe ratio. Negated because the minimizer
/// minimizes; non-finite when the portfolio has zero variance.
pub fn negative_sharpe(weights: &[f64], mean: &Array1<f64>, covariance: &Array2<f64>) -> f64 {
    let w = ArrayView1::from(weights);
    let annual_return = w.dot(mean) * TRADING_DAYS;
    -(annual_return / portfolio_volatility(weights, covariance))
}

/// Sum of squared deviations of each instrument's annualized risk
/// contribution from the cross-sectional mean. Zero at perfect risk parity.
pub fn excess_risk_contributions(weights: &[f64], covariance: &Array2<f64>) -> f64 {
    let w = ArrayView1::from(weights);
    let volatility = portfolio_volatility(weights, covariance);
    let marginal = covariance.dot(&w);
    let contributions: Vec<f64> = weights
        .iter()
        .zip(marginal.iter())
        .map(|(wi, mi)| TRADING_DAYS * wi * mi / volatility)
        .collect();
    let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
    contributions.iter().map(|rc| (rc - mean).powi(2)).sum()
}

/// Solve target weights for one rebalance date from a historical window.
///
/// The window must be fully populated: any non-finite entry is a data
/// error. Non-convergence of the minimizer is accepted silently (logged);
/// the best-effort iterate is still on the simplex.
pub fn solve_rebalance_weights(
    window: ArrayView2<f64>,
    scheme: WeightingScheme,
    minimizer: &dyn SimplexMinimizer,
) -> Result<Vec<f64>> {
    let n = window.ncols();
    if n == 0 {
        return Err(EngineError::DataError(
            "cannot solve weights for zero instruments".to_string(),
        ));
    }
    let uniform = vec![1.0 / n as f64; n];
    if scheme == WeightingScheme::Equal {
        return Ok(uniform);
    }

    if window.nrows() < 2 {
        return Err(EngineError::DataError(format!(
            "training window has {} observations, need at least 2",
            window.nrows()
        )));
    }
    if window.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::DataError(
            "training window contains missing values".to_string(),
        ));
    }

    let mean = sample_mean(&window);
    let covariance = sample_covariance(&window);

    let solution = match scheme {
        WeightingScheme::MinVariance => {
            let objective = |w: &[f64]| portfolio_volatility(w, &covariance);
            minimizer.minimize(&objective, &uniform)
        }
        WeightingScheme::MaxSharpe => {
            let objective = |w: &[f64]| negative_sharpe(w, &mean, &covariance);
            minimizer.minimize(&objective, &uniform)
        }
        WeightingScheme::RiskParity => {
            let objective = |w: &[f64]| excess_risk_contributions(w, &covariance);
            minimizer.minimize(&objective, &uniform)
        }
        WeightingScheme::Equal => unreachable!(),
    };

    if !solution.converged {
        warn!(
            scheme = %scheme,
            iterations = solution.iterations,
            "weight solver stopped before converging; using best-effort weights"
        );
    }
    Ok(solution.weights)
}
