use rust_decimal::{Decimal, MathematicalOps};

/// Dot product of two vectors.
pub(crate) fn vec_dot(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter().zip(b.iter()).map(|(x, y)| *x * *y).sum()
}

/// Matrix-vector multiplication: result_i = sum_j(mat[i][j] * v[j]).
pub(crate) fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> Vec<Decimal> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Portfolio variance: w' * Sigma * w.
pub(crate) fn portfolio_variance(weights: &[Decimal], cov: &[Vec<Decimal>]) -> Decimal {
    let sigma_w = mat_vec_multiply(cov, weights);
    vec_dot(weights, &sigma_w)
}

/// Square root, clamped to zero for non-positive inputs.
pub(crate) fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_vec_dot() {
        let a = vec![dec!(1), dec!(2), dec!(3)];
        let b = vec![dec!(4), dec!(5), dec!(6)];
        assert_eq!(vec_dot(&a, &b), dec!(32));
    }

    #[test]
    fn test_mat_vec_multiply_identity() {
        let identity = vec![
            vec![Decimal::ONE, Decimal::ZERO],
            vec![Decimal::ZERO, Decimal::ONE],
        ];
        let v = vec![dec!(3), dec!(5)];
        assert_eq!(mat_vec_multiply(&identity, &v), v);
    }

    #[test]
    fn test_portfolio_variance_diagonal() {
        // w = [0.5, 0.5], Sigma = diag(0.04, 0.16) => var = 0.25*0.04 + 0.25*0.16
        let cov = vec![
            vec![dec!(0.04), Decimal::ZERO],
            vec![Decimal::ZERO, dec!(0.16)],
        ];
        let w = vec![dec!(0.5), dec!(0.5)];
        assert_eq!(portfolio_variance(&w, &cov), dec!(0.05));
    }

    #[test]
    fn test_sqrt_decimal() {
        assert!((sqrt_decimal(dec!(4)) - dec!(2)).abs() < dec!(0.0000001));
        assert!((sqrt_decimal(dec!(0.0225)) - dec!(0.15)).abs() < dec!(0.0000001));
        assert_eq!(sqrt_decimal(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(sqrt_decimal(dec!(-1)), Decimal::ZERO);
    }
}
