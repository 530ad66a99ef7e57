//! Common types used across Volcrush
//!
//! This module provides the gateway-facing domain types: request
//! identifiers, contracts, historical bars and the historical data request
//! itself.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Caller-chosen identifier correlating a request with its callbacks
pub type RequestId = i32;

/// Format used for the `endDateTime` field of a historical data request
pub const END_DATE_TIME_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// Which series a historical data request returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WhatToShow {
    /// Traded prices of the instrument itself
    Trades,
    /// Option implied volatility of the underlying
    OptionImpliedVolatility,
}

impl WhatToShow {
    /// Wire name of the selector
    pub fn as_str(&self) -> &'static str {
        match self {
            WhatToShow::Trades => "TRADES",
            WhatToShow::OptionImpliedVolatility => "OPTION_IMPLIED_VOLATILITY",
        }
    }
}

impl std::fmt::Display for WhatToShow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instrument description sent with every request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contract {
    pub symbol: String,
    pub sec_type: String,
    pub exchange: String,
    pub currency: String,
}

impl Contract {
    /// US equity routed through SMART
    pub fn equity(symbol: &str) -> Result<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(Error::invalid_input("ticker symbol is required"));
        }

        Ok(Self {
            symbol: symbol.to_uppercase(),
            sec_type: "STK".to_string(),
            exchange: "SMART".to_string(),
            currency: "USD".to_string(),
        })
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} @{} ({})", self.symbol, self.sec_type, self.exchange, self.currency)
    }
}

/// One historical bar as pushed by the gateway
///
/// Serialized with the gateway's own timestamp text, so recorded sessions
/// can be replayed as they were received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(with = "gateway_time")]
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Parse a gateway bar timestamp.
    ///
    /// Accepts `YYYYMMDD HH:MM:SS`, the same followed by a time-zone token,
    /// and `YYYYMMDD` (daily bars, taken at midnight).
    pub fn parse_time(text: &str) -> Result<NaiveDateTime> {
        let mut tokens = text.split_whitespace();
        let date_token = tokens
            .next()
            .ok_or_else(|| Error::invalid_input("bar timestamp is empty"))?;

        let date = NaiveDate::parse_from_str(date_token, "%Y%m%d")
            .map_err(|_| Error::invalid_input(format!("invalid bar date '{text}'")))?;

        let time = match tokens.next() {
            Some(time_token) => NaiveTime::parse_from_str(time_token, "%H:%M:%S")
                .map_err(|_| Error::invalid_input(format!("invalid bar time '{text}'")))?,
            None => NaiveTime::default(),
        };

        Ok(date.and_time(time))
    }
}

mod gateway_time {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::{Bar, END_DATE_TIME_FORMAT};

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(END_DATE_TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        Bar::parse_time(&text).map_err(de::Error::custom)
    }
}

/// Everything the gateway needs to serve one historical data request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataRequest {
    pub request_id: RequestId,
    pub contract: Contract,
    /// End of the window, formatted with [`END_DATE_TIME_FORMAT`]
    pub end_date_time: String,
    /// Window length, e.g. `3 D`
    pub duration: String,
    /// Bar size, e.g. `1 min`
    pub bar_size: String,
    pub what_to_show: WhatToShow,
    /// Regular trading hours only
    pub use_rth: bool,
    /// 1 = `YYYYMMDD HH:MM:SS` timestamps
    pub format_date: i32,
    pub keep_up_to_date: bool,
    pub chart_options: Vec<(String, String)>,
}
