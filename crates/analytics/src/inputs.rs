//! Text entry boundary
//!
//! The analyzer is driven from free-text fields: spot, strike, IV in percent
//! and whole days to expiry. These are parsed and validated here so that
//! nothing malformed reaches the pricing functions.

use common::{parse_days, parse_decimal};

use crate::types::OptionParameters;
use crate::Result;

/// Position inputs as entered by the user
#[derive(Debug, Clone, Copy)]
pub struct StraddleInputs<'a> {
    pub spot: &'a str,
    pub strike: &'a str,
    /// Implied volatility in percent, e.g. `42.5`
    pub iv_percent: &'a str,
    pub days_to_expiry: &'a str,
}

impl StraddleInputs<'_> {
    pub fn to_parameters(&self, rate: f64) -> Result<OptionParameters> {
        let spot = parse_decimal("spot price", self.spot)?;
        let strike = parse_decimal("strike price", self.strike)?;
        let iv_percent = parse_decimal("IV (%)", self.iv_percent)?;
        let days = parse_days("days to expiry", self.days_to_expiry)?;

        let params = OptionParameters::from_days(spot, strike, days, rate, iv_percent / 100.0);
        params.validate()?;
        Ok(params)
    }
}

/// Hypothetical market as entered by the user
#[derive(Debug, Clone, Copy)]
pub struct ScenarioInputs<'a> {
    pub new_spot: &'a str,
    /// Implied volatility in percent
    pub new_iv_percent: &'a str,
}

impl ScenarioInputs<'_> {
    /// The position's contract under the entered market
    pub fn apply(&self, position: &OptionParameters) -> Result<OptionParameters> {
        let spot = parse_decimal("new spot price", self.new_spot)?;
        let iv_percent = parse_decimal("new IV (%)", self.new_iv_percent)?;

        let params = position.with_market(spot, iv_percent / 100.0);
        params.validate()?;
        Ok(params)
    }
}
