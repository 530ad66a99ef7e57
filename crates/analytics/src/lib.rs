//! Options analytics for Volcrush
//!
//! Pure, stateless pricing of a single-strike straddle under Black-Scholes.
//!
//! # Core Components
//!
//! - [`black_scholes`] - European call/put fair value and Greeks
//! - [`straddle`] - Call + put aggregation
//! - [`scenario`] - Re-pricing under a hypothetical spot/IV and P/L by side
//! - [`inputs`] - Text entry boundary (spot, strike, IV %, days)
//!
//! # Key Invariants
//!
//! - Every function is pure: identical inputs give bit-identical outputs
//! - Inputs must be finite with spot, strike, time and vol strictly positive
//! - NaN or infinity is never returned, it is an [`AnalyticsError::InvalidInput`]
//! - Straddle vega counts both legs, straddle gamma does not

pub mod black_scholes;
pub mod error;
pub mod inputs;
pub mod scenario;
pub mod straddle;
pub mod types;

pub use black_scholes::{option_greeks, option_value};
pub use error::AnalyticsError;
pub use inputs::{ScenarioInputs, StraddleInputs};
pub use scenario::{analyze_scenario, ScenarioAnalysis};
pub use straddle::{price_straddle, StraddleGreeks, StraddleQuote};
pub use types::{Greeks, OptionParameters, OptionType, PositionSide, DAYS_PER_YEAR};

pub type Result<T> = std::result::Result<T, AnalyticsError>;
