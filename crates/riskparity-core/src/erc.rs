use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::RiskParityError;
use crate::math::{portfolio_variance, sqrt_decimal};
use crate::risk_contribution::decompose_risk;
use crate::solver::{ConstrainedMinimizer, LinearConstraint, ProjectedGradient};
use crate::types::{with_metadata, AssetAllocation, ComputationOutput, RiskContribution};
use crate::RiskParityResult;

const SYMMETRY_TOLERANCE: Decimal = dec!(0.0000001);
/// Objective assigned to trial points with zero portfolio volatility, large
/// enough that the line search always backs away from them.
const DEGENERATE_PENALTY: Decimal = dec!(1000000000000);
const CONCENTRATION_LIMIT: Decimal = dec!(0.50);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tuning knobs for the ERC solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErcConfig {
    /// Convergence threshold on the dispersion objective. Scaled internally
    /// by the starting portfolio variance so it is unit-free.
    pub objective_tolerance: Decimal,
    /// Maximum accepted relative spread between the largest and smallest
    /// risk contribution at the returned weights.
    pub dispersion_tolerance: Decimal,
}

impl Default for ErcConfig {
    fn default() -> Self {
        ErcConfig {
            objective_tolerance: dec!(0.000000001),
            dispersion_tolerance: dec!(0.001),
        }
    }
}

/// Input for the equal-risk-contribution solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErcInput {
    /// Asset identifiers, positionally aligned with the covariance rows.
    pub asset_names: Vec<String>,
    /// NxN covariance matrix (row-major, symmetric, PSD).
    pub covariance_matrix: Vec<Vec<Decimal>>,
    /// Solver tuning; defaults apply when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ErcConfig>,
}

/// Output of the equal-risk-contribution solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErcOutput {
    /// Long-only weights summing to one.
    pub weights: Vec<AssetAllocation>,
    /// Diagnostic risk decomposition at the returned weights.
    pub risk_contributions: Vec<RiskContribution>,
    pub portfolio_volatility: Decimal,
    /// Final dispersion objective at the returned weights.
    pub objective_value: Decimal,
    pub iterations: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Solve for equal-risk-contribution weights with the built-in minimizer.
pub fn solve_erc(input: &ErcInput) -> RiskParityResult<ComputationOutput<ErcOutput>> {
    solve_erc_with(&ProjectedGradient::default(), input)
}

/// Solve for equal-risk-contribution weights with a caller-supplied
/// constrained minimizer.
///
/// The objective minimizes the dispersion of risk contributions around
/// their current mean; total contribution is invariant under reweighting,
/// so the global minimum of zero sits exactly at the ERC solution. The
/// surface is non-convex in the weights, so no global optimum is assumed:
/// the solve starts from equal weights, retries from inverse-volatility
/// weights, and only accepts a point whose risk-contribution spread passes
/// the post-hoc dispersion check. Anything else surfaces
/// [`RiskParityError::ConvergenceFailure`].
pub fn solve_erc_with(
    minimizer: &dyn ConstrainedMinimizer,
    input: &ErcInput,
) -> RiskParityResult<ComputationOutput<ErcOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let n = input.asset_names.len();
    if n == 0 {
        return Err(RiskParityError::InvalidInput {
            field: "asset_names".into(),
            reason: "at least one asset required".into(),
        });
    }
    validate_covariance_matrix(&input.covariance_matrix, n)?;
    let config = input.config.clone().unwrap_or_default();
    let cov = &input.covariance_matrix;

    // Single asset is trivially fully invested
    let (raw_weights, objective_value, iterations) = if n == 1 {
        (vec![Decimal::ONE], Decimal::ZERO, 0)
    } else {
        optimize(minimizer, cov, &config)?
    };

    let decomposition = decompose_risk(&raw_weights, cov)?;
    let vol = decomposition.portfolio_volatility;

    let weights: Vec<AssetAllocation> = input
        .asset_names
        .iter()
        .zip(raw_weights.iter())
        .map(|(name, w)| AssetAllocation {
            name: name.clone(),
            weight: *w,
        })
        .collect();

    let risk_contributions: Vec<RiskContribution> = input
        .asset_names
        .iter()
        .enumerate()
        .map(|(i, name)| RiskContribution {
            name: name.clone(),
            marginal_risk: decomposition.marginal[i],
            risk_contribution: decomposition.absolute[i],
            risk_pct: decomposition.absolute[i] / vol,
        })
        .collect();

    if n > 1 {
        for alloc in &weights {
            if alloc.weight > CONCENTRATION_LIMIT {
                warnings.push(format!(
                    "Concentrated position: {} has weight {:.2}%",
                    alloc.name,
                    alloc.weight * dec!(100)
                ));
            }
        }
    }

    let output = ErcOutput {
        weights,
        risk_contributions,
        portfolio_volatility: vol,
        objective_value,
        iterations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Equal Risk Contribution",
        &serde_json::json!({
            "num_assets": n,
            "objective_tolerance": config.objective_tolerance.to_string(),
            "dispersion_tolerance": config.dispersion_tolerance.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

fn optimize(
    minimizer: &dyn ConstrainedMinimizer,
    cov: &[Vec<Decimal>],
    config: &ErcConfig,
) -> RiskParityResult<(Vec<Decimal>, Decimal, u32)> {
    let n = cov.len();
    let n_dec = Decimal::from(n as i64);

    let objective = |weights: &[Decimal]| -> Decimal {
        match decompose_risk(weights, cov) {
            Ok(d) => {
                let mean: Decimal = d.absolute.iter().copied().sum::<Decimal>() / n_dec;
                d.absolute
                    .iter()
                    .map(|rc| (*rc - mean) * (*rc - mean))
                    .sum()
            }
            Err(_) => DEGENERATE_PENALTY,
        }
    };

    let equal_start = vec![Decimal::ONE / n_dec; n];

    // The objective carries the units of variance, so the tolerance is
    // scaled by the variance at the symmetric starting point.
    let start_var = portfolio_variance(&equal_start, cov);
    let tolerance = if start_var.is_zero() {
        config.objective_tolerance
    } else {
        config.objective_tolerance * start_var
    };

    let equality = LinearConstraint::full_investment(n);
    let bounds = vec![(Decimal::ZERO, Decimal::ONE); n];
    let starts = [equal_start, inverse_vol_weights(cov)];

    let mut last_iterations = 0u32;
    let mut last_objective = Decimal::ZERO;
    for start in &starts {
        let outcome = minimizer.minimize(&objective, start, &equality, &bounds, tolerance)?;
        if outcome.converged
            && dispersion_within(&outcome.point, cov, config.dispersion_tolerance)
        {
            return Ok((outcome.point, outcome.objective, outcome.iterations));
        }
        last_iterations = outcome.iterations;
        last_objective = outcome.objective;
    }

    Err(RiskParityError::ConvergenceFailure {
        function: "solve_erc".into(),
        iterations: last_iterations,
        last_objective,
    })
}

/// Inverse-volatility weights from the covariance diagonal, used as the
/// second start of the multi-start safeguard. Exact for diagonal matrices.
fn inverse_vol_weights(cov: &[Vec<Decimal>]) -> Vec<Decimal> {
    let inv: Vec<Decimal> = cov
        .iter()
        .enumerate()
        .map(|(i, row)| Decimal::ONE / sqrt_decimal(row[i]))
        .collect();
    let total: Decimal = inv.iter().sum();
    inv.iter().map(|v| *v / total).collect()
}

/// Post-hoc acceptance check: relative spread between the largest and
/// smallest risk contribution at the candidate weights.
fn dispersion_within(weights: &[Decimal], cov: &[Vec<Decimal>], tolerance: Decimal) -> bool {
    let decomposition = match decompose_risk(weights, cov) {
        Ok(d) => d,
        Err(_) => return false,
    };
    let mut lo = Decimal::MAX;
    let mut hi = Decimal::MIN;
    for rc in &decomposition.absolute {
        if *rc < lo {
            lo = *rc;
        }
        if *rc > hi {
            hi = *rc;
        }
    }
    let mean = decomposition.portfolio_volatility / Decimal::from(weights.len() as i64);
    if mean <= Decimal::ZERO {
        return false;
    }
    (hi - lo) / mean <= tolerance
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_covariance_matrix(cov: &[Vec<Decimal>], n: usize) -> RiskParityResult<()> {
    if cov.len() != n {
        return Err(RiskParityError::InvalidInput {
            field: "covariance_matrix".into(),
            reason: format!("Expected {}x{} matrix but got {} rows", n, n, cov.len()),
        });
    }
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(RiskParityError::InvalidInput {
                field: "covariance_matrix".into(),
                reason: format!("Row {} has {} columns, expected {}", i, row.len(), n),
            });
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (cov[i][j] - cov[j][i]).abs() > SYMMETRY_TOLERANCE {
                return Err(RiskParityError::InvalidInput {
                    field: "covariance_matrix".into(),
                    reason: format!(
                        "Matrix is not symmetric: cov[{}][{}]={} != cov[{}][{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                });
            }
        }
    }
    for (i, row) in cov.iter().enumerate() {
        let variance = row[i];
        if variance < Decimal::ZERO {
            return Err(RiskParityError::InvalidInput {
                field: format!("covariance_matrix[{}][{}]", i, i),
                reason: "Variance must be non-negative".into(),
            });
        }
        // A zero row makes the asset absorb unbounded weight without risk;
        // a zero diagonal with non-zero covariances is not PSD. Both show
        // up as a zero variance.
        if variance.is_zero() {
            return Err(RiskParityError::InvalidInput {
                field: format!("covariance_matrix[{}][{}]", i, i),
                reason: "Zero-variance asset makes the ERC problem degenerate".into(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
