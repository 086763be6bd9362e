use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskParityError;
use crate::types::PriceHistory;
use crate::RiskParityResult;

/// Default trailing window for the SMA trend test, in periods.
pub const DEFAULT_SMA_WINDOW: usize = 200;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for trend signal generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSignalInput {
    pub history: PriceHistory,
    /// Trailing SMA window in periods; defaults to [`DEFAULT_SMA_WINDOW`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
}

/// Trend state for a single asset at the evaluation date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetTrendSignal {
    pub name: String,
    pub current_price: Decimal,
    pub moving_average: Decimal,
    /// True when the latest price sits strictly above its trailing SMA.
    pub bullish: bool,
}

/// Trend signals for every asset, evaluated at the latest date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSignalOutput {
    pub as_of: NaiveDate,
    pub signals: Vec<AssetTrendSignal>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate binary trend signals from a trailing simple moving average.
///
/// An asset with fewer than `window` observations fails with
/// [`RiskParityError::InsufficientData`]; a silent default signal would
/// mask missing data upstream.
pub fn sma_trend_signals(input: &TrendSignalInput) -> RiskParityResult<TrendSignalOutput> {
    let window = input.window.unwrap_or(DEFAULT_SMA_WINDOW);
    if window == 0 {
        return Err(RiskParityError::InvalidInput {
            field: "window".into(),
            reason: "SMA window must be at least 1 period".into(),
        });
    }

    let history = &input.history;
    if history.dates.is_empty() {
        return Err(RiskParityError::InsufficientData(
            "Price history contains no observations".into(),
        ));
    }
    if history.assets.is_empty() {
        return Err(RiskParityError::InvalidInput {
            field: "history.assets".into(),
            reason: "At least one price series required".into(),
        });
    }
    for pair in history.dates.windows(2) {
        if pair[1] <= pair[0] {
            return Err(RiskParityError::InvalidInput {
                field: "history.dates".into(),
                reason: format!("Dates not strictly ascending: {} then {}", pair[0], pair[1]),
            });
        }
    }

    let n_periods = history.dates.len();
    for series in &history.assets {
        if series.prices.len() != n_periods {
            return Err(RiskParityError::InvalidInput {
                field: format!("history.assets[{}].prices", series.name),
                reason: format!(
                    "Length {} differs from calendar length {}",
                    series.prices.len(),
                    n_periods
                ),
            });
        }
    }

    let as_of = history.dates[n_periods - 1];
    let mut signals = Vec::with_capacity(history.assets.len());
    for series in &history.assets {
        if n_periods < window {
            return Err(RiskParityError::InsufficientData(format!(
                "Asset '{}' has {} price observations but {} required for the SMA window",
                series.name, n_periods, window
            )));
        }
        let tail = &series.prices[n_periods - window..];
        let sma = tail.iter().copied().sum::<Decimal>() / Decimal::from(window as i64);
        let current = series.prices[n_periods - 1];
        signals.push(AssetTrendSignal {
            name: series.name.clone(),
            current_price: current,
            moving_average: sma,
            bullish: current > sma,
        });
    }

    Ok(TrendSignalOutput { as_of, signals })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
