use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::erc::{solve_erc, ErcConfig, ErcInput};
use crate::error::RiskParityError;
use crate::overlay::apply_trend_overlay;
use crate::trend::{sma_trend_signals, AssetTrendSignal, TrendSignalInput, DEFAULT_SMA_WINDOW};
use crate::types::{
    with_metadata, AssetAllocation, ComputationOutput, PriceHistory, RiskContribution,
};
use crate::RiskParityResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for one full rebalance cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceInput {
    /// Asset identifiers, aligned with the covariance rows and expected to
    /// match the price history columns positionally.
    pub asset_names: Vec<String>,
    /// NxN covariance matrix (row-major, symmetric, PSD).
    pub covariance_matrix: Vec<Vec<Decimal>>,
    /// Price history on the rebalance calendar.
    pub history: PriceHistory,
    /// SMA window; defaults to 200 periods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_window: Option<usize>,
    /// ERC solver tuning; defaults apply when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erc_config: Option<ErcConfig>,
}

/// Output of one full rebalance cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceOutput {
    /// Evaluation date (latest date in the price history).
    pub as_of: NaiveDate,
    /// Raw ERC weights before the trend gate.
    pub raw_weights: Vec<AssetAllocation>,
    /// Diagnostic risk decomposition at the raw weights.
    pub risk_contributions: Vec<RiskContribution>,
    pub portfolio_volatility: Decimal,
    /// Per-asset trend state at the evaluation date.
    pub signals: Vec<AssetTrendSignal>,
    /// Final allocation after the overlay; sums to one, or all zero when
    /// fully in cash.
    pub final_weights: Vec<AssetAllocation>,
    pub fully_in_cash: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run one rebalance cycle: solve ERC weights from the covariance matrix,
/// derive trend signals from the price history, and gate the weights
/// through the overlay.
pub fn run_rebalance(input: &RebalanceInput) -> RiskParityResult<ComputationOutput<RebalanceOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // Price columns must line up with the covariance rows
    if input.history.assets.len() != input.asset_names.len() {
        return Err(RiskParityError::InvalidInput {
            field: "history.assets".into(),
            reason: format!(
                "{} price series supplied for {} assets",
                input.history.assets.len(),
                input.asset_names.len()
            ),
        });
    }
    for (i, (name, series)) in input
        .asset_names
        .iter()
        .zip(input.history.assets.iter())
        .enumerate()
    {
        if *name != series.name {
            return Err(RiskParityError::InvalidInput {
                field: format!("history.assets[{}]", i),
                reason: format!(
                    "Price column '{}' does not match asset '{}'",
                    series.name, name
                ),
            });
        }
    }

    let erc = solve_erc(&ErcInput {
        asset_names: input.asset_names.clone(),
        covariance_matrix: input.covariance_matrix.clone(),
        config: input.erc_config.clone(),
    })?;
    warnings.extend(erc.warnings.iter().cloned());
    let erc = erc.result;

    let trend = sma_trend_signals(&TrendSignalInput {
        history: input.history.clone(),
        window: input.sma_window,
    })?;

    let raw: Vec<Decimal> = erc.weights.iter().map(|a| a.weight).collect();
    let bullish: Vec<bool> = trend.signals.iter().map(|s| s.bullish).collect();
    let overlay = apply_trend_overlay(&raw, &bullish)?;
    if overlay.fully_in_cash {
        warnings.push("All assets are in a downtrend; allocation is fully in cash".to_string());
    }

    let final_weights: Vec<AssetAllocation> = input
        .asset_names
        .iter()
        .zip(overlay.weights.iter())
        .map(|(name, w)| AssetAllocation {
            name: name.clone(),
            weight: *w,
        })
        .collect();

    let output = RebalanceOutput {
        as_of: trend.as_of,
        raw_weights: erc.weights,
        risk_contributions: erc.risk_contributions,
        portfolio_volatility: erc.portfolio_volatility,
        signals: trend.signals,
        final_weights,
        fully_in_cash: overlay.fully_in_cash,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "ERC with SMA trend overlay",
        &serde_json::json!({
            "num_assets": input.asset_names.len(),
            "sma_window": input.sma_window.unwrap_or(DEFAULT_SMA_WINDOW),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetPriceSeries;
    use rust_decimal_macros::dec;

    fn calendar(days: usize) -> Vec<NaiveDate> {
        (0..days)
            .map(|i| {
                NaiveDate::from_ymd_opt(2024, 6, 1)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(i as u64))
                    .unwrap()
            })
            .collect()
    }

    /// Two uncorrelated assets with equal variance plus a 4-day calendar.
    fn two_asset_input(prices_a: Vec<Decimal>, prices_b: Vec<Decimal>) -> RebalanceInput {
        RebalanceInput {
            asset_names: vec!["EQ".into(), "FI".into()],
            covariance_matrix: vec![
                vec![dec!(0.04), Decimal::ZERO],
                vec![Decimal::ZERO, dec!(0.04)],
            ],
            history: PriceHistory {
                dates: calendar(prices_a.len()),
                assets: vec![
                    AssetPriceSeries {
                        name: "EQ".into(),
                        prices: prices_a,
                    },
                    AssetPriceSeries {
                        name: "FI".into(),
                        prices: prices_b,
                    },
                ],
            },
            sma_window: Some(3),
            erc_config: None,
        }
    }

    #[test]
    fn test_cycle_gates_bearish_asset() {
        let input = two_asset_input(
            vec![dec!(100), dec!(102), dec!(104), dec!(108)],
            vec![dec!(108), dec!(104), dec!(102), dec!(100)],
        );
        let result = run_rebalance(&input).unwrap().result;

        // Equal-variance uncorrelated ERC splits 50/50
        assert!((result.raw_weights[0].weight - dec!(0.5)).abs() < dec!(0.0001));
        // Only the uptrending asset survives the overlay
        assert!((result.final_weights[0].weight - Decimal::ONE).abs() < dec!(0.0001));
        assert_eq!(result.final_weights[1].weight, Decimal::ZERO);
        assert!(!result.fully_in_cash);
    }

    #[test]
    fn test_cycle_all_bearish_lands_in_cash() {
        let input = two_asset_input(
            vec![dec!(108), dec!(104), dec!(102), dec!(100)],
            vec![dec!(109), dec!(105), dec!(103), dec!(101)],
        );
        let output = run_rebalance(&input).unwrap();

        assert!(output.result.fully_in_cash);
        for alloc in &output.result.final_weights {
            assert_eq!(alloc.weight, Decimal::ZERO);
        }
        assert!(output.warnings.iter().any(|w| w.contains("cash")));
    }

    #[test]
    fn test_cycle_all_bullish_keeps_erc_weights() {
        let input = two_asset_input(
            vec![dec!(100), dec!(102), dec!(104), dec!(108)],
            vec![dec!(100), dec!(103), dec!(105), dec!(109)],
        );
        let result = run_rebalance(&input).unwrap().result;

        for (raw, fin) in result.raw_weights.iter().zip(result.final_weights.iter()) {
            assert!((raw.weight - fin.weight).abs() < dec!(0.000001));
        }
        let total: Decimal = result.final_weights.iter().map(|a| a.weight).sum();
        assert!((total - Decimal::ONE).abs() < dec!(0.000001));
    }

    #[test]
    fn test_misaligned_price_columns_rejected() {
        let mut input = two_asset_input(
            vec![dec!(100), dec!(102), dec!(104), dec!(108)],
            vec![dec!(108), dec!(104), dec!(102), dec!(100)],
        );
        input.history.assets.swap(0, 1);
        let err = run_rebalance(&input).unwrap_err();
        assert!(matches!(err, RiskParityError::InvalidInput { .. }));
    }

    #[test]
    fn test_missing_price_series_rejected() {
        let mut input = two_asset_input(
            vec![dec!(100), dec!(102), dec!(104), dec!(108)],
            vec![dec!(108), dec!(104), dec!(102), dec!(100)],
        );
        input.history.assets.pop();
        let err = run_rebalance(&input).unwrap_err();
        assert!(matches!(err, RiskParityError::InvalidInput { .. }));
    }

    #[test]
    fn test_diagnostics_carried_through() {
        let input = two_asset_input(
            vec![dec!(100), dec!(102), dec!(104), dec!(108)],
            vec![dec!(100), dec!(103), dec!(105), dec!(109)],
        );
        let result = run_rebalance(&input).unwrap().result;

        assert_eq!(result.risk_contributions.len(), 2);
        let rc_total: Decimal = result
            .risk_contributions
            .iter()
            .map(|r| r.risk_contribution)
            .sum();
        assert!((rc_total - result.portfolio_volatility).abs() < dec!(0.000001));
        assert_eq!(result.as_of, calendar(4)[3]);
    }
}
