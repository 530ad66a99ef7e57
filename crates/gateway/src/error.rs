//! Bridge error types

use std::time::Duration;

use common::RequestId;
use thiserror::Error;

/// Errors surfaced by the gateway bridge
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Gateway unreachable, handshake failure or teardown failure
    #[error("Connection error | op: {operation} | {message}")]
    Connection {
        operation: &'static str,
        message: String,
    },

    /// The fetch window elapsed without a single row
    #[error("No data received for request {request_id} within {timeout:?}")]
    NoData {
        request_id: RequestId,
        timeout: Duration,
    },

    /// The id is still owned by another fetch
    #[error("Request {0} is already in flight")]
    RequestInFlight(RequestId),

    /// The gateway answered the request with an error event
    #[error("Gateway error {code} for request {request_id}: {message}")]
    Gateway {
        request_id: RequestId,
        code: i32,
        message: String,
    },

    /// Malformed caller input
    #[error(transparent)]
    InvalidInput(#[from] common::Error),
}

impl BridgeError {
    pub fn connection(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Connection {
            operation,
            message: message.into(),
        }
    }
}
