//! Broker gateway bridge for Volcrush
//!
//! The gateway pushes historical bars asynchronously, keyed by a
//! caller-chosen request id, on an event-loop thread owned by the transport.
//! This crate turns that into a blocking fetch with a bounded wait.
//!
//! # Core Components
//!
//! - [`transport`] - Traits at the seam with the wire client library
//! - [`table`] - Pending-request table shared by event loop and callers
//! - [`bridge`] - Connection lifecycle, callback handlers, synchronous fetch
//! - [`market`] - Spot and annualized IV derived from two fetches
//! - [`simulated`] - In-process gateway for demos and tests
//!
//! # Key Invariants
//!
//! - Callbacks never block on a waiting caller
//! - Every blocking call is bounded by a timeout with a defined result
//! - A request id is owned by at most one fetch at a time
//! - Callbacks arriving after a fetch gave up are dropped, never delivered
//!   to a later fetch that reuses the id

pub mod bridge;
pub mod error;
pub mod market;
pub mod simulated;
pub mod table;
pub mod transport;

pub use bridge::{BridgeSettings, ConnectOutcome, GatewayBridge, HistoryRequestSpec};
pub use error::BridgeError;
pub use market::{fetch_market_and_volatility_history, MarketSnapshot, SnapshotSettings};
pub use simulated::{BarSource, ReplayBook, SimulatedGateway, SyntheticSource};
pub use table::{
    PendingGuard, PendingRequest, PendingRequestTable, RequestFailure, RequestSnapshot, WaitOutcome,
    WaitPolicy,
};
pub use transport::{GatewayEvents, GatewayTransport, TransportError, NO_REQUEST_ID};

pub type Result<T> = std::result::Result<T, BridgeError>;
