//! Market snapshot: spot price and annualized implied volatility
//!
//! Two independent fetches (trades and option implied volatility) with
//! distinct request ids and independent deadlines.

use std::time::Duration;

use chrono::NaiveDateTime;
use common::{Bar, RequestId, WhatToShow};
use serde::Serialize;
use tracing::info;

use crate::bridge::{GatewayBridge, HistoryRequestSpec};
use crate::error::BridgeError;
use crate::Result;

/// Settings for [`fetch_market_and_volatility_history`]
#[derive(Debug, Clone)]
pub struct SnapshotSettings {
    pub price_request_id: RequestId,
    pub iv_request_id: RequestId,
    pub duration: String,
    pub bar_size: String,
    pub use_rth: bool,
    /// Deadline applied to each fetch separately
    pub timeout: Duration,
    /// Periods per year used to annualize the IV series
    pub vol_annualization: f64,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            price_request_id: 99,
            iv_request_id: 100,
            duration: "3 D".to_string(),
            bar_size: "1 min".to_string(),
            use_rth: true,
            timeout: Duration::from_secs(15),
            vol_annualization: 252.0,
        }
    }
}

impl SnapshotSettings {
    fn spec(&self, symbol: &str, what_to_show: WhatToShow) -> HistoryRequestSpec {
        HistoryRequestSpec::new(symbol, what_to_show)
            .with_window(self.duration.clone(), self.bar_size.clone())
            .with_use_rth(self.use_rth)
    }
}

/// Latest spot and implied volatility for one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub spot_price: f64,
    pub spot_time: NaiveDateTime,
    /// Last IV close as delivered by the gateway
    pub raw_iv: f64,
    /// `raw_iv` annualized, as a fraction
    pub implied_vol: f64,
    pub iv_time: NaiveDateTime,
}

/// Chronologically last bar; among equal timestamps the last to arrive
pub fn latest_bar(rows: &[Bar]) -> Option<&Bar> {
    rows.iter().max_by_key(|bar| bar.time)
}

/// Scale a per-period volatility by the square root of periods per year
pub fn annualize_volatility(raw: f64, periods_per_year: f64) -> f64 {
    raw * periods_per_year.sqrt()
}

fn latest_close(
    rows: &[Bar],
    request_id: RequestId,
    what: &str,
) -> std::result::Result<Bar, BridgeError> {
    let bar = latest_bar(rows).copied().ok_or(BridgeError::NoData {
        request_id,
        timeout: Duration::ZERO,
    })?;

    if !bar.close.is_finite() || bar.close <= 0.0 {
        return Err(BridgeError::InvalidInput(common::Error::invalid_input(format!(
            "latest {what} close {} is not a positive number",
            bar.close
        ))));
    }
    Ok(bar)
}

/// Fetch the spot price and the annualized implied volatility for `symbol`
pub fn fetch_market_and_volatility_history(
    bridge: &GatewayBridge,
    symbol: &str,
    settings: &SnapshotSettings,
) -> Result<MarketSnapshot> {
    let trades = bridge.fetch(
        settings.price_request_id,
        &settings.spec(symbol, WhatToShow::Trades),
        settings.timeout,
    )?;
    let spot = latest_close(&trades, settings.price_request_id, "trade")?;

    let ivs = bridge.fetch(
        settings.iv_request_id,
        &settings.spec(symbol, WhatToShow::OptionImpliedVolatility),
        settings.timeout,
    )?;
    let iv = latest_close(&ivs, settings.iv_request_id, "implied volatility")?;
    let implied_vol = annualize_volatility(iv.close, settings.vol_annualization);

    let snapshot = MarketSnapshot {
        symbol: symbol.trim().to_uppercase(),
        spot_price: spot.close,
        spot_time: spot.time,
        raw_iv: iv.close,
        implied_vol,
        iv_time: iv.time,
    };

    info!(
        symbol = %snapshot.symbol,
        spot = snapshot.spot_price,
        implied_vol = snapshot.implied_vol,
        trade_rows = trades.len(),
        iv_rows = ivs.len(),
        "Market snapshot"
    );
    Ok(snapshot)
}
