use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RiskParityError;
use crate::RiskParityResult;

const GRADIENT_BUMP: Decimal = dec!(0.000001);
const MAX_BACKTRACKS: u32 = 40;
const DEFAULT_MAX_ITERATIONS: u32 = 5_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single linear equality constraint: coefficients . x = target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub coefficients: Vec<Decimal>,
    pub target: Decimal,
}

impl LinearConstraint {
    /// The full-investment constraint: weights sum to one.
    pub fn full_investment(n: usize) -> Self {
        LinearConstraint {
            coefficients: vec![Decimal::ONE; n],
            target: Decimal::ONE,
        }
    }
}

/// Result of a constrained minimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimizeOutcome {
    pub point: Vec<Decimal>,
    pub objective: Decimal,
    pub iterations: u32,
    pub converged: bool,
}

/// Capability interface over a constrained scalar minimizer.
///
/// Any nonlinear optimization backend able to honour one linear equality
/// plus per-coordinate box bounds can be substituted behind this trait.
/// `converged` in the outcome means the objective reached `tolerance`; a
/// `false` flag must never be silently upgraded by callers.
pub trait ConstrainedMinimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(&[Decimal]) -> Decimal,
        initial: &[Decimal],
        equality: &LinearConstraint,
        bounds: &[(Decimal, Decimal)],
        tolerance: Decimal,
    ) -> RiskParityResult<MinimizeOutcome>;
}

// ---------------------------------------------------------------------------
// Default implementation
// ---------------------------------------------------------------------------

/// Projected gradient descent with a backtracking line search.
///
/// Gradients are central finite differences. Feasibility is restored after
/// every step by clamping to the box bounds and rescaling onto the equality
/// constraint; only uniform-coefficient equalities are supported, which
/// covers the full-investment constraint this crate needs.
#[derive(Debug, Clone)]
pub struct ProjectedGradient {
    /// Iteration cap; bounds worst-case latency of a solve.
    pub max_iterations: u32,
}

impl Default for ProjectedGradient {
    fn default() -> Self {
        ProjectedGradient {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Clamp into the box, then rescale onto the equality constraint. The
/// rescale keeps every coordinate inside the box as long as lower bounds
/// are non-negative.
fn project(
    point: &[Decimal],
    coeff: Decimal,
    target: Decimal,
    bounds: &[(Decimal, Decimal)],
) -> Vec<Decimal> {
    let mut projected: Vec<Decimal> = point
        .iter()
        .zip(bounds.iter())
        .map(|(x, &(lo, hi))| {
            if *x < lo {
                lo
            } else if *x > hi {
                hi
            } else {
                *x
            }
        })
        .collect();

    let total: Decimal = projected.iter().map(|x| coeff * *x).sum();
    if total.is_zero() {
        // Nothing survived the clamp; restart from the feasible centroid.
        let n = Decimal::from(projected.len() as i64);
        let even = target / (coeff * n);
        for x in &mut projected {
            *x = even;
        }
        return projected;
    }

    let scale = target / total;
    for x in &mut projected {
        *x *= scale;
    }
    projected
}

impl ConstrainedMinimizer for ProjectedGradient {
    fn minimize(
        &self,
        objective: &dyn Fn(&[Decimal]) -> Decimal,
        initial: &[Decimal],
        equality: &LinearConstraint,
        bounds: &[(Decimal, Decimal)],
        tolerance: Decimal,
    ) -> RiskParityResult<MinimizeOutcome> {
        let n = initial.len();
        if n == 0 {
            return Err(RiskParityError::InvalidInput {
                field: "initial".into(),
                reason: "initial point must not be empty".into(),
            });
        }
        if equality.coefficients.len() != n || bounds.len() != n {
            return Err(RiskParityError::InvalidInput {
                field: "equality".into(),
                reason: format!(
                    "dimension mismatch: point {}, equality {}, bounds {}",
                    n,
                    equality.coefficients.len(),
                    bounds.len()
                ),
            });
        }
        let coeff = equality.coefficients[0];
        if coeff.is_zero() || equality.coefficients.iter().any(|c| *c != coeff) {
            return Err(RiskParityError::InvalidInput {
                field: "equality".into(),
                reason: "only uniform non-zero coefficient equalities are supported".into(),
            });
        }

        let mut x = project(initial, coeff, equality.target, bounds);
        let mut fx = objective(&x);
        let mut iterations = 0u32;

        while iterations < self.max_iterations {
            if fx <= tolerance {
                return Ok(MinimizeOutcome {
                    point: x,
                    objective: fx,
                    iterations,
                    converged: true,
                });
            }
            iterations += 1;

            let mut grad = vec![Decimal::ZERO; n];
            for (i, g) in grad.iter_mut().enumerate() {
                let mut up = x.clone();
                up[i] += GRADIENT_BUMP;
                let mut down = x.clone();
                down[i] -= GRADIENT_BUMP;
                *g = (objective(&up) - objective(&down)) / (dec!(2) * GRADIENT_BUMP);
            }

            let mut step = Decimal::ONE;
            let mut improved = false;
            for _ in 0..MAX_BACKTRACKS {
                let trial: Vec<Decimal> = x
                    .iter()
                    .zip(grad.iter())
                    .map(|(xi, gi)| *xi - step * *gi)
                    .collect();
                let trial = project(&trial, coeff, equality.target, bounds);
                let ft = objective(&trial);
                if ft < fx {
                    x = trial;
                    fx = ft;
                    improved = true;
                    break;
                }
                step /= dec!(2);
            }
            if !improved {
                // Line search stalled; no descent direction left.
                break;
            }
        }

        let converged = fx <= tolerance;
        Ok(MinimizeOutcome {
            point: x,
            objective: fx,
            iterations,
            converged,
        })
    }
}
