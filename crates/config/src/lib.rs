use analytics::PositionSide;
use gateway::WaitPolicy;
use observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Top-level Volcrush configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Broker gateway connection
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: i32,
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
    /// Recorded bars served by the simulated gateway instead of the
    /// synthetic series
    #[serde(default)]
    pub replay_file: Option<String>,
    /// Delay between simulated rows
    #[serde(default)]
    pub row_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            client_id: default_client_id(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            replay_file: None,
            row_delay_ms: 0,
        }
    }
}

impl GatewayConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }
}

/// Historical data requests
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryConfig {
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default = "default_bar_size")]
    pub bar_size: String,
    #[serde(default = "default_enabled")]
    pub use_rth: bool,
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,
    #[serde(default)]
    pub wait_policy: WaitPolicy,
    #[serde(default = "default_price_request_id")]
    pub price_request_id: i32,
    #[serde(default = "default_iv_request_id")]
    pub iv_request_id: i32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            bar_size: default_bar_size(),
            use_rth: default_enabled(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            wait_policy: WaitPolicy::default(),
            price_request_id: default_price_request_id(),
            iv_request_id: default_iv_request_id(),
        }
    }
}

impl HistoryConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }
}

/// Pricing model settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsConfig {
    /// Annual, continuously compounded
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Periods per year used to annualize the gateway's IV series
    #[serde(default = "default_vol_annualization")]
    pub vol_annualization: f64,
    /// The side whose P/L is reported first
    #[serde(default)]
    pub position_side: PositionSide,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            vol_annualization: default_vol_annualization(),
            position_side: PositionSide::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            metrics_port: None,
        }
    }
}
