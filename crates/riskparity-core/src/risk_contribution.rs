use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskParityError;
use crate::math::{mat_vec_multiply, sqrt_decimal, vec_dot};
use crate::RiskParityResult;

/// Decomposition of portfolio risk across assets.
///
/// The `absolute` entries sum to the portfolio volatility; equivalently the
/// unscaled products `w_i * (Sigma*w)_i` sum to the portfolio variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecomposition {
    /// sqrt(w' Sigma w)
    pub portfolio_volatility: Decimal,
    /// Marginal risk contribution per asset: (Sigma*w)_i / vol
    pub marginal: Vec<Decimal>,
    /// Absolute risk contribution per asset: w_i * marginal_i
    pub absolute: Vec<Decimal>,
}

/// Decompose portfolio risk into per-asset contributions.
///
/// Pure function of its inputs. Fails with
/// [`RiskParityError::DegenerateAllocation`] when the portfolio volatility
/// is numerically zero (all-zero weights, or a zero-variance covariance),
/// rather than dividing by zero.
pub fn decompose_risk(
    weights: &[Decimal],
    cov: &[Vec<Decimal>],
) -> RiskParityResult<RiskDecomposition> {
    let sigma_w = mat_vec_multiply(cov, weights);
    let variance = vec_dot(weights, &sigma_w);
    let vol = sqrt_decimal(variance);
    if vol.is_zero() {
        return Err(RiskParityError::DegenerateAllocation(
            "portfolio volatility is zero; risk contributions are undefined".into(),
        ));
    }

    let marginal: Vec<Decimal> = sigma_w.iter().map(|s| *s / vol).collect();
    let absolute: Vec<Decimal> = weights
        .iter()
        .zip(marginal.iter())
        .map(|(w, m)| *w * *m)
        .collect();

    Ok(RiskDecomposition {
        portfolio_volatility: vol,
        marginal,
        absolute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::portfolio_variance;
    use rust_decimal_macros::dec;

    fn two_asset_cov(vol1: Decimal, vol2: Decimal, corr: Decimal) -> Vec<Vec<Decimal>> {
        let cov12 = corr * vol1 * vol2;
        vec![vec![vol1 * vol1, cov12], vec![cov12, vol2 * vol2]]
    }

    #[test]
    fn test_absolute_contributions_sum_to_volatility() {
        let cov = two_asset_cov(dec!(0.20), dec!(0.10), dec!(0.3));
        let w = vec![dec!(0.4), dec!(0.6)];
        let d = decompose_risk(&w, &cov).unwrap();

        let total: Decimal = d.absolute.iter().sum();
        assert!(
            (total - d.portfolio_volatility).abs() < dec!(0.000001),
            "Contributions sum {} should equal portfolio vol {}",
            total,
            d.portfolio_volatility
        );
    }

    #[test]
    fn test_unscaled_contributions_sum_to_variance() {
        // w_i * (Sigma*w)_i summed over i recovers w' Sigma w
        let cov = two_asset_cov(dec!(0.25), dec!(0.15), dec!(0.5));
        let w = vec![dec!(0.7), dec!(0.3)];
        let d = decompose_risk(&w, &cov).unwrap();

        let variance = portfolio_variance(&w, &cov);
        let total: Decimal = d
            .absolute
            .iter()
            .map(|rc| *rc * d.portfolio_volatility)
            .sum();
        assert!(
            (total - variance).abs() < dec!(0.000001),
            "Vol-scaled contribution sum {} should equal variance {}",
            total,
            variance
        );
    }

    #[test]
    fn test_equal_weights_equal_variance_uncorrelated() {
        let cov = two_asset_cov(dec!(0.20), dec!(0.20), Decimal::ZERO);
        let w = vec![dec!(0.5), dec!(0.5)];
        let d = decompose_risk(&w, &cov).unwrap();
        assert!((d.absolute[0] - d.absolute[1]).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_contributions_non_negative_for_long_only() {
        let cov = two_asset_cov(dec!(0.20), dec!(0.10), dec!(0.3));
        let w = vec![dec!(0.4), dec!(0.6)];
        let d = decompose_risk(&w, &cov).unwrap();
        for rc in &d.absolute {
            assert!(*rc >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_zero_weights_is_degenerate() {
        let cov = two_asset_cov(dec!(0.20), dec!(0.10), dec!(0.3));
        let w = vec![Decimal::ZERO, Decimal::ZERO];
        let err = decompose_risk(&w, &cov).unwrap_err();
        assert!(matches!(err, RiskParityError::DegenerateAllocation(_)));
    }

    #[test]
    fn test_zero_covariance_is_degenerate() {
        let cov = vec![
            vec![Decimal::ZERO, Decimal::ZERO],
            vec![Decimal::ZERO, Decimal::ZERO],
        ];
        let w = vec![dec!(0.5), dec!(0.5)];
        let err = decompose_risk(&w, &cov).unwrap_err();
        assert!(matches!(err, RiskParityError::DegenerateAllocation(_)));
    }
}
