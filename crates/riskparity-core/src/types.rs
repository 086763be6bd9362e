use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Portfolio weights expressed as decimals (0.25 = 25%). Never percentages.
pub type Weight = Decimal;

/// A single asset weight in a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub name: String,
    pub weight: Weight,
}

/// Risk contribution breakdown for a single asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskContribution {
    pub name: String,
    /// Marginal risk contribution = (Sigma * w)_i / sigma_p
    pub marginal_risk: Decimal,
    /// Absolute risk contribution = w_i * marginal_risk
    pub risk_contribution: Decimal,
    /// Share of total portfolio risk
    pub risk_pct: Decimal,
}

/// Price history for a single asset, aligned to the common rebalance calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPriceSeries {
    pub name: String,
    pub prices: Vec<Decimal>,
}

/// Time-indexed price table: one column per asset, rows sorted ascending by
/// date. Every series must have exactly one price per calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
    pub dates: Vec<NaiveDate>,
    pub assets: Vec<AssetPriceSeries>,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
