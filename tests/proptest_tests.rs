//! Property-based tests using proptest for invariant testing.
//!
//! These tests verify that:
//! 1. The simplex invariant (weights in [0, 1], unit sum) survives solving,
//!    projection, and drift under random inputs
//! 2. Rebalance flags always follow the ceil(T/N) law
//! 3. Leverage factors stay inside (0, LEVERAGE_CAP]

use ndarray::{Array1, Array2};
use proptest::prelude::*;

use ballast::leverage::{leverage_factors, LeverageConfig};
use ballast::optimize::{project_to_simplex, ProjectedGradient};
use ballast::schedule::rebalance_flags;
use ballast::solver::{solve_rebalance_weights, WeightingScheme};
use ballast::types::{ReturnSeries, LEVERAGE_CAP};
use ballast::walkforward::{drift_step, TrainingMethod};
use chrono::{TimeZone, Utc};

const SIMPLEX_TOLERANCE: f64 = 1e-6;

fn assert_on_simplex(weights: &[f64]) {
    let sum: f64 = weights.iter().sum();
    prop_assert_simplex(weights, sum).unwrap();
}

fn prop_assert_simplex(weights: &[f64], sum: f64) -> Result<(), TestCaseError> {
    prop_assert!(
        (sum - 1.0).abs() < SIMPLEX_TOLERANCE,
        "weights sum to {sum}: {weights:?}"
    );
    for &w in weights {
        prop_assert!(
            (-SIMPLEX_TOLERANCE..=1.0 + SIMPLEX_TOLERANCE).contains(&w),
            "weight {w} out of [0, 1]: {weights:?}"
        );
    }
    Ok(())
}

/// Strategy for an arbitrary finite pre-projection vector.
fn raw_vector_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-10.0..10.0f64, 1..8)
}

/// Strategy for a simplex-feasible weight vector (normalized positives).
fn weight_vector_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.01..1.0f64, 1..8).prop_map(|raw| {
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|v| v / total).collect()
    })
}

/// Strategy for a daily return window with the given column count.
fn window_strategy(cols: usize) -> impl Strategy<Value = Array2<f64>> {
    prop::collection::vec(-0.05..0.05f64, 30 * cols).prop_map(move |flat| {
        Array2::from_shape_vec((30, cols), flat).unwrap()
    })
}

proptest! {
    #[test]
    fn projection_always_lands_on_simplex(raw in raw_vector_strategy()) {
        let projected = project_to_simplex(&raw);
        let sum: f64 = projected.iter().sum();
        prop_assert_simplex(&projected, sum)?;
    }

    #[test]
    fn drift_preserves_simplex_for_ordinary_returns(
        weights in weight_vector_strategy(),
        seed in 0u64..1000,
    ) {
        // Returns in (-60%, +60%): no wipeouts, plain drift.
        let returns: Vec<f64> = (0..weights.len())
            .map(|j| {
                let x = ((seed as f64 + j as f64 * 7.3) * 0.61).sin();
                0.6 * x
            })
            .collect();
        let drifted = drift_step(
            Array1::from_vec(weights).view(),
            Array1::from_vec(returns).view(),
        );
        let sum = drifted.sum();
        prop_assert_simplex(drifted.as_slice().unwrap(), sum)?;
    }

    #[test]
    fn drift_preserves_simplex_even_through_wipeouts(
        weights in weight_vector_strategy(),
        seed in 0u64..1000,
    ) {
        // Returns down to -150%: components can be wiped or floored.
        let returns: Vec<f64> = (0..weights.len())
            .map(|j| {
                let x = ((seed as f64 * 1.7 + j as f64 * 3.1) * 0.37).sin();
                -1.5 + 2.5 * (x + 1.0) / 2.0
            })
            .collect();
        let drifted = drift_step(
            Array1::from_vec(weights).view(),
            Array1::from_vec(returns).view(),
        );
        let sum = drifted.sum();
        prop_assert_simplex(drifted.as_slice().unwrap(), sum)?;
    }

    #[test]
    fn rebalance_flag_count_is_ceil(len in 0usize..600, stride in 1usize..60) {
        let flags = rebalance_flags(len, stride).unwrap();
        let expected = len.div_ceil(stride);
        prop_assert_eq!(flags.iter().filter(|&&f| f).count(), expected);
        for (i, flag) in flags.iter().enumerate() {
            prop_assert_eq!(*flag, i % stride == 0);
        }
    }

    #[test]
    fn equal_scheme_is_uniform(cols in 1usize..8) {
        let window = Array2::zeros((10, cols));
        let minimizer = ProjectedGradient::default();
        let weights = solve_rebalance_weights(
            window.view(),
            WeightingScheme::Equal,
            &minimizer,
        ).unwrap();
        for &w in &weights {
            prop_assert!((w - 1.0 / cols as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn min_variance_stays_on_simplex(window in window_strategy(3)) {
        let minimizer = ProjectedGradient::default();
        let weights = solve_rebalance_weights(
            window.view(),
            WeightingScheme::MinVariance,
            &minimizer,
        ).unwrap();
        let sum: f64 = weights.iter().sum();
        prop_assert_simplex(&weights, sum)?;
    }

    #[test]
    fn risk_parity_stays_on_simplex(window in window_strategy(4)) {
        let minimizer = ProjectedGradient::default();
        let weights = solve_rebalance_weights(
            window.view(),
            WeightingScheme::RiskParity,
            &minimizer,
        ).unwrap();
        let sum: f64 = weights.iter().sum();
        prop_assert_simplex(&weights, sum)?;
    }

    #[test]
    fn leverage_factors_stay_in_range(
        values in prop::collection::vec(-0.04..0.04f64, 300..420),
        rebal_freq in 1usize..40,
        target_vol in 0.01..0.5f64,
    ) {
        let start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..values.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        let series = ReturnSeries::new(timestamps, values).unwrap();
        let factors = leverage_factors(&series, &LeverageConfig {
            rebal_freq,
            training: TrainingMethod::Expanding,
            target_vol,
        }).unwrap();
        prop_assert_eq!(factors.len(), series.len());
        for &f in &factors {
            prop_assert!(f > 0.0 && f <= LEVERAGE_CAP, "factor {f} out of range");
        }
    }
}

#[test]
fn max_sharpe_handles_degenerate_flat_window() {
    // A window with zero variance everywhere: the Sharpe objective is
    // undefined, so the solver must fall back to the feasible start.
    let window = Array2::from_elem((30, 3), 0.01);
    let minimizer = ProjectedGradient::default();
    let weights =
        solve_rebalance_weights(window.view(), WeightingScheme::MaxSharpe, &minimizer).unwrap();
    assert_on_simplex(&weights);
}
