//! Transport boundary
//!
//! [`GatewayTransport`] is the outbound half implemented by the wire client
//! (or the simulated gateway). [`GatewayEvents`] is the inbound half: the
//! transport calls it from its own event-loop thread.

use std::sync::Arc;

use common::{Bar, HistoricalDataRequest, RequestId};
use thiserror::Error;

/// Request id the gateway uses for events not tied to a request
pub const NO_REQUEST_ID: RequestId = -1;

/// Errors raised by a transport implementation
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport is not connected")]
    NotConnected,

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Outbound calls into the gateway client
#[cfg_attr(test, mockall::automock)]
pub trait GatewayTransport: Send + Sync {
    /// Open the socket and start the event loop. Session readiness is
    /// signalled later through [`GatewayEvents::on_session_ready`].
    fn connect(
        &self,
        host: &str,
        port: u16,
        client_id: i32,
        events: Arc<dyn GatewayEvents>,
    ) -> Result<(), TransportError>;

    /// Tear down the session and stop the event loop
    fn disconnect(&self) -> Result<(), TransportError>;

    /// Protocol version negotiated with the server
    fn server_version(&self) -> Result<i32, TransportError>;

    /// Issue a historical data request; rows arrive as events
    fn request_historical_data(&self, request: &HistoricalDataRequest)
        -> Result<(), TransportError>;
}

/// Inbound callbacks, invoked on the transport's event-loop thread.
///
/// Implementations must return promptly and never wait on a caller.
pub trait GatewayEvents: Send + Sync {
    fn on_session_ready(&self, next_order_id: i64);

    fn on_historical_data(&self, request_id: RequestId, bar: Bar);

    fn on_historical_data_end(&self, request_id: RequestId, start: &str, end: &str);

    fn on_error(&self, request_id: RequestId, code: i32, message: &str);

    /// The gateway closed the session from its side
    fn on_connection_closed(&self) {}
}
