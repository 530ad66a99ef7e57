use crate::*;
use thiserror::Error;

use gateway::WaitPolicy;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Gateway host is required")]
    MissingGatewayHost,

    #[error("Invalid {field}: {port}. Must be between 1 and 65535")]
    InvalidPort { field: String, port: u16 },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float, got: {value}")]
    InvalidPositiveFloat { field: String, value: f64 },

    #[error("{field} must be a finite number, got: {value}")]
    InvalidNumber { field: String, value: f64 },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} must be a non-negative request id, got: {value}")]
    InvalidRequestId { field: String, value: i32 },

    #[error("history.price_request_id and history.iv_request_id must differ, both are {0}")]
    DuplicateRequestIds(i32),

    #[error("Environment variable placeholder in {field} was not resolved: {value}")]
    UnresolvedEnvVar { field: String, value: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &AppConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_gateway(&config.gateway, &mut report);
    validate_history(&config.history, &mut report);
    validate_analytics(&config.analytics, &mut report);
    validate_logging(&config.logging, &mut report);

    report
}

fn check_resolved(field: &str, value: &str, report: &mut ValidationReport) {
    if has_unresolved_env_vars(value) {
        report.add_error(ValidationError::UnresolvedEnvVar {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn validate_gateway(gateway: &GatewayConfig, report: &mut ValidationReport) {
    if gateway.host.trim().is_empty() {
        report.add_error(ValidationError::MissingGatewayHost);
    }
    check_resolved("gateway.host", &gateway.host, report);

    if gateway.port == 0 {
        report.add_error(ValidationError::InvalidPort {
            field: "gateway.port".to_string(),
            port: gateway.port,
        });
    }

    if gateway.connect_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "gateway.connect_timeout_seconds".to_string(),
        });
    }

    match &gateway.replay_file {
        Some(path) => {
            check_resolved("gateway.replay_file", path, report);
            if !std::path::Path::new(path).exists() {
                report.add_warning(
                    "gateway.replay_file",
                    &format!("Replay file '{}' does not exist", path),
                );
            }
        }
        None => report.add_default("gateway.replay_file", "synthetic series"),
    }

    if gateway.row_delay_ms > 1_000 {
        report.add_warning(
            "gateway.row_delay_ms",
            "Row delay above one second makes fetches time out with partial data",
        );
    }
}

fn validate_history(history: &HistoryConfig, report: &mut ValidationReport) {
    if history.duration.trim().is_empty() {
        report.add_error(ValidationError::MissingField {
            field: "history.duration".to_string(),
        });
    }

    if history.bar_size.trim().is_empty() {
        report.add_error(ValidationError::MissingField {
            field: "history.bar_size".to_string(),
        });
    }

    if history.fetch_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "history.fetch_timeout_seconds".to_string(),
        });
    } else if history.fetch_timeout_seconds > 300 {
        report.add_warning(
            "history.fetch_timeout_seconds",
            "Fetch timeout above five minutes blocks the caller for a long time",
        );
    }

    if history.wait_policy == WaitPolicy::FirstRow {
        report.add_warning(
            "history.wait_policy",
            "first_row returns as soon as one row arrives and may yield a truncated series",
        );
    }

    for (field, value) in [
        ("history.price_request_id", history.price_request_id),
        ("history.iv_request_id", history.iv_request_id),
    ] {
        if value < 0 {
            report.add_error(ValidationError::InvalidRequestId {
                field: field.to_string(),
                value,
            });
        }
    }

    if history.price_request_id == history.iv_request_id {
        report.add_error(ValidationError::DuplicateRequestIds(history.price_request_id));
    }
}

fn validate_analytics(analytics: &AnalyticsConfig, report: &mut ValidationReport) {
    if !analytics.risk_free_rate.is_finite() {
        report.add_error(ValidationError::InvalidNumber {
            field: "analytics.risk_free_rate".to_string(),
            value: analytics.risk_free_rate,
        });
    } else if !(-0.05..=0.25).contains(&analytics.risk_free_rate) {
        report.add_warning(
            "analytics.risk_free_rate",
            "Rate is expressed as a fraction (0.05 = 5%); value looks unusual",
        );
    }

    if !analytics.vol_annualization.is_finite() || analytics.vol_annualization <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "analytics.vol_annualization".to_string(),
            value: analytics.vol_annualization,
        });
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    match logging.metrics_port {
        Some(0) => report.add_error(ValidationError::InvalidPort {
            field: "logging.metrics_port".to_string(),
            port: 0,
        }),
        Some(_) => {}
        None => report.add_default("logging.metrics_port", "disabled"),
    }
}
