//! Example: walk-forward portfolio weighting.
//!
//! Builds a synthetic three-strategy return matrix, computes a risk-parity
//! weight track with monthly rebalancing, applies a volatility target to
//! the combined stream, and prints performance statistics.
//!
//! Run with: cargo run --example walkforward

use ballast::solver::WeightingScheme;
use ballast::stats::{annualized_trade_count, perf_stats};
use ballast::strategy::{composite_returns, CompositeStrategy, Strategy};
use ballast::types::ReturnMatrix;
use ballast::walkforward::{TrackConfig, TrainingMethod, WeightTracker};
use chrono::{TimeZone, Utc};
use ndarray::Array2;

/// Generate synthetic sub-strategy returns with distinct vol regimes.
fn generate_returns(days: usize) -> ReturnMatrix {
    let start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
    let timestamps = (0..days)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    let names = vec![
        "Trend".to_string(),
        "Carry".to_string(),
        "Hedge".to_string(),
    ];

    let mut values = Array2::zeros((days, 3));
    for i in 0..days {
        let t = i as f64;
        values[[i, 0]] = 0.0004 + 0.009 * (t * 0.41).sin();
        values[[i, 1]] = 0.0003 + 0.004 * (t * 0.93).cos();
        values[[i, 2]] = -0.0001 + 0.012 * (t * 1.37).sin();
    }
    ReturnMatrix::new(timestamps, names, values).unwrap()
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== Walk-Forward Portfolio Weighting ===\n");

    let returns = generate_returns(1000);
    let config = TrackConfig {
        rebal_freq: 21,
        scheme: WeightingScheme::RiskParity,
        training: TrainingMethod::Expanding,
    };

    // 1. The raw weight track.
    let tracker = WeightTracker::new(config).unwrap();
    let weights = tracker.compute(&returns, &returns).unwrap();

    let last = weights.len() - 1;
    println!("Final weights:");
    for (name, weight) in returns.instruments().iter().zip(weights.row(last).iter()) {
        println!("  {name:<8} {:.2}%", weight * 100.0);
    }
    println!(
        "\nAnnualized trades: {:.1}",
        annualized_trade_count(&weights).unwrap()
    );

    // 2. Unlevered combined returns.
    let combined = composite_returns(&returns, &weights).unwrap();
    println!("\n--- Unlevered ---");
    println!("{}", perf_stats(&combined).unwrap().summary());

    // 3. The same basket with a 15% volatility target.
    let strategy = CompositeStrategy::new("Demo Basket", returns.clone(), returns, config)
        .unwrap()
        .with_vol_target(0.15);
    println!("\n--- Vol-targeted at 15% ---");
    println!("{}", strategy.statistics().unwrap().summary());
}
