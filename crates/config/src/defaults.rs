pub fn default_enabled() -> bool {
    true
}

pub fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

/// Paper-trading port of the desktop gateway
pub fn default_gateway_port() -> u16 {
    7497
}

pub fn default_client_id() -> i32 {
    1
}

pub fn default_connect_timeout_seconds() -> u64 {
    15
}

pub fn default_duration() -> String {
    "3 D".to_string()
}

pub fn default_bar_size() -> String {
    "1 min".to_string()
}

pub fn default_fetch_timeout_seconds() -> u64 {
    15
}

pub fn default_price_request_id() -> i32 {
    99
}

pub fn default_iv_request_id() -> i32 {
    100
}

pub fn default_risk_free_rate() -> f64 {
    0.05
}

pub fn default_vol_annualization() -> f64 {
    252.0
}
