use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskParityError;
use crate::RiskParityResult;

/// Final allocation after applying the trend gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayOutput {
    /// Final weights, positionally aligned with the inputs. They sum to
    /// one, or are all zero when fully in cash.
    pub weights: Vec<Decimal>,
    /// True when every asset was bearish. The all-zero weight vector is
    /// the designated cash representation: a valid terminal state of the
    /// rebalance cycle, not an error.
    pub fully_in_cash: bool,
}

/// Merge ERC weights with per-asset trend signals.
///
/// Bearish assets are zeroed and the surviving weights renormalized to sum
/// to one. When every signal is bearish the allocation goes fully to cash.
pub fn apply_trend_overlay(
    weights: &[Decimal],
    bullish: &[bool],
) -> RiskParityResult<OverlayOutput> {
    if weights.len() != bullish.len() {
        return Err(RiskParityError::InvalidInput {
            field: "bullish".into(),
            reason: format!(
                "{} signals supplied for {} weights",
                bullish.len(),
                weights.len()
            ),
        });
    }

    let gated: Vec<Decimal> = weights
        .iter()
        .zip(bullish.iter())
        .map(|(w, keep)| if *keep { *w } else { Decimal::ZERO })
        .collect();

    let total: Decimal = gated.iter().sum();
    if total > Decimal::ZERO {
        Ok(OverlayOutput {
            weights: gated.iter().map(|w| *w / total).collect(),
            fully_in_cash: false,
        })
    } else {
        Ok(OverlayOutput {
            weights: vec![Decimal::ZERO; gated.len()],
            fully_in_cash: true,
        })
    }
}
