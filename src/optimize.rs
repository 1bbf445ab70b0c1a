//! Pluggable constrained minimization over the unit simplex.
//!
//! The weight solver needs a bounded, equality-constrained nonlinear
//! minimizer: weights in [0, 1] summing to 1. Both constraints together are
//! the unit simplex, so the seam is a trait that minimizes an arbitrary
//! objective over that domain. Swapping in a different NLP implementation
//! touches nothing but the trait impl.

use serde::Serialize;

/// Result of a constrained minimization.
///
/// The point is always feasible (on the simplex). `converged` is false when
/// the iteration budget ran out before the objective stopped improving; the
/// best-effort point is still returned.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub weights: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// A minimizer over the unit simplex `{w : w_i in [0, 1], sum(w) = 1}`.
pub trait SimplexMinimizer: Send + Sync {
    fn minimize(&self, objective: &(dyn Fn(&[f64]) -> f64 + Sync), init: &[f64]) -> Solution;
}

/// Deterministic projected-gradient minimizer.
///
/// Central-difference gradients, backtracking line search, and Euclidean
/// projection back onto the simplex after every step. No randomness, so
/// identical inputs always produce identical output.
#[derive(Debug, Clone)]
pub struct ProjectedGradient {
    /// Hard cap on gradient iterations; guarantees termination.
    pub max_iterations: usize,
    /// Step size the line search starts from.
    pub initial_step: f64,
    /// Objective improvement below which iteration stops.
    pub tolerance: f64,
    /// Finite-difference half-step for gradient estimation.
    pub gradient_step: f64,
}

impl Default for ProjectedGradient {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            initial_step: 1.0,
            tolerance: 1e-10,
            gradient_step: 1e-7,
        }
    }
}

impl SimplexMinimizer for ProjectedGradient {
    fn minimize(&self, objective: &(dyn Fn(&[f64]) -> f64 + Sync), init: &[f64]) -> Solution {
        let n = init.len();
        let mut x = project_to_simplex(init);
        let mut fx = objective(&x);
        let mut iterations = 0;
        let mut converged = false;

        if n == 0 || !fx.is_finite() {
            return Solution {
                weights: x,
                objective: fx,
                iterations,
                converged,
            };
        }

        for _ in 0..self.max_iterations {
            iterations += 1;

            let gradient = match self.finite_difference_gradient(objective, &x) {
                Some(g) => g,
                None => break,
            };

            // Backtrack until a strictly improving feasible step is found.
            let mut step = self.initial_step;
            let mut improvement = None;
            while step > 1e-12 {
                let candidate: Vec<f64> = x
                    .iter()
                    .zip(gradient.iter())
                    .map(|(xi, gi)| xi - step * gi)
                    .collect();
                let candidate = project_to_simplex(&candidate);
                let fc = objective(&candidate);
                if fc.is_finite() && fc < fx {
                    improvement = Some((candidate, fc));
                    break;
                }
                step *= 0.5;
            }

            match improvement {
                Some((candidate, fc)) => {
                    let delta = fx - fc;
                    x = candidate;
                    fx = fc;
                    if delta < self.tolerance {
                        converged = true;
                        break;
                    }
                }
                None => {
                    // No descent direction within the step budget: stationary.
                    converged = true;
                    break;
                }
            }
        }

        Solution {
            weights: x,
            objective: fx,
            iterations,
            converged,
        }
    }
}

impl ProjectedGradient {
    fn finite_difference_gradient(
        &self,
        objective: &(dyn Fn(&[f64]) -> f64 + Sync),
        x: &[f64],
    ) -> Option<Vec<f64>> {
        let h = self.gradient_step;
        let mut gradient = Vec::with_capacity(x.len());
        let mut probe = x.to_vec();
        for j in 0..x.len() {
            let original = probe[j];
            probe[j] = original + h;
            let upper = objective(&probe);
            probe[j] = original - h;
            let lower = objective(&probe);
            probe[j] = original;
            let slope = (upper - lower) / (2.0 * h);
            if !slope.is_finite() {
                return None;
            }
            gradient.push(slope);
        }
        Some(gradient)
    }
}

/// Euclidean projection onto the unit simplex.
///
/// Sort-based algorithm: find the threshold theta such that the clipped
/// shifted vector sums to 1. Output components are non-negative and sum to
/// 1 up to floating-point error.
pub fn project_to_simplex(v: &[f64]) -> Vec<f64> {
    let n = v.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, &value) in sorted.iter().enumerate() {
        cumulative += value;
        let candidate = (cumulative - 1.0) / (i as f64 + 1.0);
        if value - candidate > 0.0 {
            theta = candidate;
        }
    }
    v.iter().map(|&vi| (vi - theta).max(0.0)).collect()
}
