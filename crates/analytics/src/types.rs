//! Shared types for the analytics engine

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Calendar days used to convert days-to-expiry into years
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

/// Side of the straddle position whose P/L is of interest.
///
/// The analyzer treats a **short** straddle (sold ahead of an expected
/// volatility crush) as the home position, hence the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    #[default]
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for Black-Scholes pricing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionParameters {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry (in years)
    pub time: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Implied volatility (as decimal, e.g., 0.3 = 30%)
    pub vol: f64,
}

impl OptionParameters {
    pub fn new(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> Self {
        Self {
            spot,
            strike,
            time,
            rate,
            vol,
        }
    }

    /// Build parameters from a whole number of calendar days to expiry
    pub fn from_days(spot: f64, strike: f64, days_to_expiry: u32, rate: f64, vol: f64) -> Self {
        Self::new(spot, strike, f64::from(days_to_expiry) / DAYS_PER_YEAR, rate, vol)
    }

    /// Same contract (strike, expiry, rate) under a different market
    pub fn with_market(&self, spot: f64, vol: f64) -> Self {
        Self { spot, vol, ..*self }
    }

    /// Reject inputs outside the model's domain
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        positive("spot", self.spot)?;
        positive("strike", self.strike)?;
        positive("time to expiry", self.time)?;
        positive("volatility", self.vol)?;
        if !self.rate.is_finite() {
            return Err(AnalyticsError::invalid("rate", format!("must be finite, got {}", self.rate)));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), AnalyticsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::invalid(field, format!("must be a positive number, got {value}")))
    }
}

/// Option Greeks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// Delta: ∂V/∂S (rate of change with spot)
    pub delta: f64,
    /// Gamma: ∂²V/∂S² (curvature of delta)
    pub gamma: f64,
    /// Vega: ∂V/∂σ per 1.00 of volatility
    pub vega: f64,
    /// Theta: time decay per year
    pub theta: f64,
    /// Rho: ∂V/∂r (sensitivity to interest rate)
    pub rho: f64,
}
