//! Analytics error types

use thiserror::Error;

/// Errors that can occur while pricing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    /// Input outside the model's domain, or a result that is not finite
    #[error("Invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Malformed numeric text
    #[error(transparent)]
    Parse(#[from] common::Error),
}

impl AnalyticsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
