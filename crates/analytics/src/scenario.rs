//! Scenario analysis
//!
//! Re-prices the same straddle (strike and expiry fixed) under a hypothetical
//! spot and implied volatility and reports the P/L of either side against the
//! value the position was opened at.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::straddle::{price_straddle, StraddleGreeks};
use crate::types::{OptionParameters, PositionSide};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub original_straddle_value: f64,
    pub new_straddle_value: f64,
    /// new - original
    pub long_pnl: f64,
    /// original - new
    pub short_pnl: f64,
    pub new_greeks: StraddleGreeks,
}

impl ScenarioAnalysis {
    /// P/L of the given side
    pub fn pnl(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.long_pnl,
            PositionSide::Short => self.short_pnl,
        }
    }
}

/// Re-price a straddle under `scenario` and compare with the value it was
/// opened at.
///
/// `scenario` must describe the same contract as `original`: only spot,
/// volatility (and rate) may differ.
pub fn analyze_scenario(
    original: &OptionParameters,
    scenario: &OptionParameters,
    original_straddle_value: f64,
) -> Result<ScenarioAnalysis> {
    original.validate()?;
    if !original_straddle_value.is_finite() || original_straddle_value < 0.0 {
        return Err(AnalyticsError::invalid(
            "original straddle value",
            format!("must be a non-negative number, got {original_straddle_value}"),
        ));
    }
    if !same(original.strike, scenario.strike) {
        return Err(AnalyticsError::invalid(
            "strike",
            format!(
                "scenario strike {} differs from position strike {}",
                scenario.strike, original.strike
            ),
        ));
    }
    if !same(original.time, scenario.time) {
        return Err(AnalyticsError::invalid(
            "time to expiry",
            format!(
                "scenario expiry {} differs from position expiry {}",
                scenario.time, original.time
            ),
        ));
    }

    let quote = price_straddle(scenario)?;
    let long_pnl = quote.straddle_value - original_straddle_value;

    Ok(ScenarioAnalysis {
        original_straddle_value,
        new_straddle_value: quote.straddle_value,
        long_pnl,
        short_pnl: -long_pnl,
        new_greeks: quote.greeks(),
    })
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn position() -> OptionParameters {
        OptionParameters::from_days(100.0, 100.0, 30, 0.05, 0.30)
    }

    #[test]
    fn test_vol_crush_profits_short() {
        let original = position();
        let scenario = original.with_market(100.0, 0.15);

        let analysis = analyze_scenario(&original, &scenario, 5.00).unwrap();

        assert!(analysis.new_straddle_value < 5.00);
        assert!((analysis.new_straddle_value - 3.440).abs() < 1e-3);
        assert!((analysis.long_pnl - (analysis.new_straddle_value - 5.00)).abs() < 1e-12);
        assert!(analysis.long_pnl < 0.0);
        assert!(analysis.short_pnl > 0.0);
        assert_eq!(analysis.short_pnl, -analysis.long_pnl);
        assert_eq!(analysis.pnl(PositionSide::Short), analysis.short_pnl);
        assert_eq!(analysis.pnl(PositionSide::Long), analysis.long_pnl);
    }

    #[test]
    fn test_unchanged_market_has_zero_pnl() {
        let original = position();
        let opened_at = price_straddle(&original).unwrap().straddle_value;

        let analysis = analyze_scenario(&original, &original, opened_at).unwrap();

        assert_eq!(analysis.long_pnl, 0.0);
        assert_eq!(analysis.short_pnl, 0.0);
    }

    #[test]
    fn test_large_move_hurts_short() {
        let original = position();
        let opened_at = price_straddle(&original).unwrap().straddle_value;
        let scenario = original.with_market(120.0, 0.30);

        let analysis = analyze_scenario(&original, &scenario, opened_at).unwrap();

        assert!(analysis.short_pnl < 0.0);
        assert!(analysis.new_greeks.delta > 0.5);
    }

    #[test]
    fn test_new_greeks_match_repricing() {
        let original = position();
        let scenario = original.with_market(95.0, 0.2);

        let analysis = analyze_scenario(&original, &scenario, 6.0).unwrap();
        let quote = price_straddle(&scenario).unwrap();

        assert_eq!(analysis.new_greeks, quote.greeks());
    }

    #[test]
    fn test_different_contract_rejected() {
        let original = position();
        let moved_strike = OptionParameters { strike: 105.0, ..original };
        let moved_expiry = OptionParameters::from_days(100.0, 100.0, 31, 0.05, 0.3);

        assert_matches!(
            analyze_scenario(&original, &moved_strike, 5.0),
            Err(AnalyticsError::InvalidInput { field: "strike", .. })
        );
        assert_matches!(
            analyze_scenario(&original, &moved_expiry, 5.0),
            Err(AnalyticsError::InvalidInput { field: "time to expiry", .. })
        );
    }

    #[test]
    fn test_scenario_vol_must_be_positive() {
        let original = position();
        let scenario = original.with_market(100.0, 0.0);

        assert_matches!(
            analyze_scenario(&original, &scenario, 5.0),
            Err(AnalyticsError::InvalidInput { field: "volatility", .. })
        );
    }

    #[test]
    fn test_original_value_must_be_finite() {
        let original = position();
        assert_matches!(
            analyze_scenario(&original, &original, f64::NAN),
            Err(AnalyticsError::InvalidInput { field: "original straddle value", .. })
        );
    }
}
