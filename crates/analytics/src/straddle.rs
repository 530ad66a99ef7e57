//! Straddle aggregation
//!
//! A straddle is one call and one put at the same strike and expiry. Value,
//! delta and theta are the sum of both legs. Gamma is reported once: it is
//! identical for the two legs and the analyzer surfaces the single-leg figure.
//! Vega is counted once per leg, i.e. twice the single-leg vega.

use serde::{Deserialize, Serialize};

use crate::black_scholes::{option_greeks, option_value};
use crate::types::{Greeks, OptionParameters, OptionType};
use crate::Result;

/// Aggregated sensitivities of a long straddle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StraddleGreeks {
    pub delta: f64,
    pub gamma: f64,
    /// Per 1.00 of volatility, both legs
    pub vega: f64,
    /// Per year, both legs
    pub theta: f64,
}

impl StraddleGreeks {
    pub fn from_legs(call: &Greeks, put: &Greeks) -> Self {
        Self {
            delta: call.delta + put.delta,
            gamma: call.gamma,
            vega: call.vega * 2.0,
            theta: call.theta + put.theta,
        }
    }

    /// Vega per one volatility point (1%)
    pub fn vega_per_point(&self) -> f64 {
        self.vega / 100.0
    }

    /// Theta per calendar day
    pub fn theta_per_day(&self) -> f64 {
        self.theta / crate::types::DAYS_PER_YEAR
    }
}

/// Fair value and Greeks of a straddle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StraddleQuote {
    pub call_value: f64,
    pub put_value: f64,
    pub straddle_value: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
}

impl StraddleQuote {
    pub fn greeks(&self) -> StraddleGreeks {
        StraddleGreeks {
            delta: self.delta,
            gamma: self.gamma,
            vega: self.vega,
            theta: self.theta,
        }
    }
}

/// Price a straddle at `params`
pub fn price_straddle(params: &OptionParameters) -> Result<StraddleQuote> {
    let call_value = option_value(params, OptionType::Call)?;
    let put_value = option_value(params, OptionType::Put)?;

    let call = option_greeks(params, OptionType::Call)?;
    let put = option_greeks(params, OptionType::Put)?;
    let greeks = StraddleGreeks::from_legs(&call, &put);

    Ok(StraddleQuote {
        call_value,
        put_value,
        straddle_value: call_value + put_value,
        delta: greeks.delta,
        gamma: greeks.gamma,
        vega: greeks.vega,
        theta: greeks.theta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use assert_matches::assert_matches;

    fn atm() -> OptionParameters {
        OptionParameters::from_days(100.0, 100.0, 30, 0.05, 0.30)
    }

    #[test]
    fn test_straddle_value_is_sum_of_legs() {
        let quote = price_straddle(&atm()).unwrap();
        assert_eq!(quote.straddle_value, quote.call_value + quote.put_value);
        assert!((quote.straddle_value - 6.854).abs() < 1e-3);
    }

    #[test]
    fn test_vega_doubled_gamma_not() {
        let params = atm();
        let call = option_greeks(&params, OptionType::Call).unwrap();
        let put = option_greeks(&params, OptionType::Put).unwrap();
        let quote = price_straddle(&params).unwrap();

        assert_eq!(quote.vega, 2.0 * call.vega);
        assert_eq!(quote.gamma, call.gamma);
        assert_eq!(quote.gamma, put.gamma);
        assert_eq!(quote.delta, call.delta + put.delta);
        assert_eq!(quote.theta, call.theta + put.theta);
    }

    #[test]
    fn test_atm_straddle_is_nearly_delta_neutral() {
        let quote = price_straddle(&atm()).unwrap();
        assert!(quote.delta.abs() < 0.1);
        assert!(quote.theta < 0.0);
    }

    #[test]
    fn test_pricing_is_bit_identical() {
        let first = price_straddle(&atm()).unwrap();
        let second = price_straddle(&atm()).unwrap();
        assert_eq!(first.call_value.to_bits(), second.call_value.to_bits());
        assert_eq!(first.put_value.to_bits(), second.put_value.to_bits());
        assert_eq!(first.vega.to_bits(), second.vega.to_bits());
        assert_eq!(first.theta.to_bits(), second.theta.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_units() {
        let greeks = price_straddle(&atm()).unwrap().greeks();
        assert!((greeks.vega_per_point() - greeks.vega / 100.0).abs() < 1e-15);
        assert!((greeks.theta_per_day() * 365.0 - greeks.theta).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_params_fail() {
        let params = OptionParameters { vol: -0.2, ..atm() };
        assert_matches!(price_straddle(&params), Err(AnalyticsError::InvalidInput { .. }));
    }
}
