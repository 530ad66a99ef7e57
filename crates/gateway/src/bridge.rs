//! Gateway bridge
//!
//! [`GatewayBridge`] owns the connection lifecycle, answers the transport's
//! callbacks, and exposes [`GatewayBridge::fetch`], which issues one
//! historical request and blocks until its rows are in or its deadline
//! passes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use common::{Bar, Contract, HistoricalDataRequest, RequestId, WhatToShow, END_DATE_TIME_FORMAT};
use observability::BridgeMetrics;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::BridgeError;
use crate::table::{PendingRequestTable, RequestFailure, WaitOutcome, WaitPolicy};
use crate::transport::{GatewayEvents, GatewayTransport, NO_REQUEST_ID};
use crate::Result;

/// Warning the gateway emits for every request from older API clients
const FRACTIONAL_SHARE_WARNING: i32 = 2176;

/// Informational status codes (farm connection OK, etc.)
const INFO_CODES: std::ops::RangeInclusive<i32> = 2100..=2199;

/// Result of a connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected { server_version: i32 },
    /// The socket opened but the session never became ready in time
    NotConnected,
}

/// Bridge tuning
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub client_id: i32,
    pub connect_timeout: Duration,
    pub wait_policy: WaitPolicy,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            client_id: 1,
            connect_timeout: Duration::from_secs(15),
            wait_policy: WaitPolicy::UntilComplete,
        }
    }
}

/// What to fetch, before a request id and end time are attached
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequestSpec {
    pub symbol: String,
    pub what_to_show: WhatToShow,
    pub duration: String,
    pub bar_size: String,
    pub use_rth: bool,
}

impl HistoryRequestSpec {
    /// Three days of one-minute bars, regular trading hours
    pub fn new(symbol: impl Into<String>, what_to_show: WhatToShow) -> Self {
        Self {
            symbol: symbol.into(),
            what_to_show,
            duration: "3 D".to_string(),
            bar_size: "1 min".to_string(),
            use_rth: true,
        }
    }

    pub fn with_window(mut self, duration: impl Into<String>, bar_size: impl Into<String>) -> Self {
        self.duration = duration.into();
        self.bar_size = bar_size.into();
        self
    }

    pub fn with_use_rth(mut self, use_rth: bool) -> Self {
        self.use_rth = use_rth;
        self
    }

    /// Build the wire request ending at `end`
    pub fn to_request(
        &self,
        request_id: RequestId,
        end: NaiveDateTime,
    ) -> std::result::Result<HistoricalDataRequest, common::Error> {
        Ok(HistoricalDataRequest {
            request_id,
            contract: Contract::equity(&self.symbol)?,
            end_date_time: end.format(END_DATE_TIME_FORMAT).to_string(),
            duration: self.duration.clone(),
            bar_size: self.bar_size.clone(),
            what_to_show: self.what_to_show,
            use_rth: self.use_rth,
            format_date: 1,
            keep_up_to_date: false,
            chart_options: Vec::new(),
        })
    }
}

#[derive(Debug, Default)]
struct SessionState {
    /// Set while a `connect` call waits for the session-ready callback
    awaiting_ready: bool,
    connected: bool,
    next_order_id: Option<i64>,
    server_version: Option<i32>,
}

/// State shared with the transport's event loop
struct BridgeState {
    session: Mutex<SessionState>,
    session_changed: Condvar,
    table: PendingRequestTable,
    metrics: BridgeMetrics,
}

impl BridgeState {
    fn new() -> Self {
        Self {
            session: Mutex::new(SessionState::default()),
            session_changed: Condvar::new(),
            table: PendingRequestTable::new(),
            metrics: BridgeMetrics::new(),
        }
    }

    fn is_connected(&self) -> bool {
        self.session.lock().connected
    }

    /// Accept a session-ready callback from the next connection attempt
    fn begin_connect(&self) {
        self.session.lock().awaiting_ready = true;
    }

    /// Wait for the session-ready callback. Returns whether it arrived.
    fn wait_session_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut session = self.session.lock();
        while !session.connected {
            if self.session_changed.wait_until(&mut session, deadline).timed_out() {
                break;
            }
        }
        session.awaiting_ready = false;
        session.connected
    }

    /// Clear the session. Returns whether it was connected.
    fn mark_disconnected(&self) -> bool {
        let mut session = self.session.lock();
        let was_connected = session.connected;
        *session = SessionState::default();
        drop(session);

        self.session_changed.notify_all();
        was_connected
    }

    fn record_late(&self, request_id: RequestId, event: &'static str) {
        debug!(request_id, event, "Dropping callback for request that is no longer pending");
        self.metrics.late_callback();
    }
}

fn is_fractional_share_warning(code: i32, message: &str) -> bool {
    code == FRACTIONAL_SHARE_WARNING && message.to_lowercase().contains("fractional share")
}

impl GatewayEvents for BridgeState {
    fn on_session_ready(&self, next_order_id: i64) {
        let mut session = self.session.lock();
        if !session.awaiting_ready {
            drop(session);
            debug!(next_order_id, "Ignoring session ready with no connect waiting");
            return;
        }
        session.connected = true;
        session.next_order_id = Some(next_order_id);
        drop(session);

        self.session_changed.notify_all();
        info!(next_order_id, "Gateway session ready");
    }

    fn on_historical_data(&self, request_id: RequestId, bar: Bar) {
        if self.table.append(request_id, bar) {
            self.metrics.row_received();
        } else {
            self.record_late(request_id, "historical_data");
        }
    }

    fn on_historical_data_end(&self, request_id: RequestId, start: &str, end: &str) {
        if self.table.complete(request_id) {
            info!(request_id, start, end, "Historical data complete");
        } else {
            self.record_late(request_id, "historical_data_end");
        }
    }

    fn on_error(&self, request_id: RequestId, code: i32, message: &str) {
        if is_fractional_share_warning(code, message) {
            debug!(request_id, code, "Suppressed fractional share warning");
            self.metrics.warning_suppressed();
            return;
        }

        if INFO_CODES.contains(&code) {
            warn!(request_id, code, message, "Gateway warning");
            return;
        }

        self.metrics.gateway_error();
        let failure = RequestFailure::Gateway {
            code,
            message: message.to_string(),
        };
        if request_id != NO_REQUEST_ID && self.table.fail(request_id, failure) {
            warn!(request_id, code, message, "Gateway error terminated request");
            return;
        }

        error!(request_id, code, message, "Gateway error");
    }

    fn on_connection_closed(&self) {
        if self.mark_disconnected() {
            let failed = self.table.fail_all(RequestFailure::Disconnected);
            warn!(failed, "Gateway closed the session");
        }
    }
}

/// Blocking bridge over a callback-driven gateway transport
pub struct GatewayBridge {
    transport: Arc<dyn GatewayTransport>,
    state: Arc<BridgeState>,
    settings: BridgeSettings,
}

impl GatewayBridge {
    pub fn new(transport: Arc<dyn GatewayTransport>, settings: BridgeSettings) -> Self {
        Self {
            transport,
            state: Arc::new(BridgeState::new()),
            settings,
        }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Handle the transport calls back into
    pub fn events(&self) -> Arc<dyn GatewayEvents> {
        Arc::clone(&self.state) as Arc<dyn GatewayEvents>
    }

    /// Requests currently waiting on the gateway
    pub fn pending(&self) -> &PendingRequestTable {
        &self.state.table
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Open a session and wait for it to become ready.
    ///
    /// A transport failure is returned immediately. A session that never
    /// becomes ready within the connect timeout is torn down and reported
    /// as [`ConnectOutcome::NotConnected`].
    pub fn connect(&self, host: &str, port: u16) -> Result<ConnectOutcome> {
        if let Some(server_version) = self.current_server_version() {
            debug!(server_version, "Already connected");
            return Ok(ConnectOutcome::Connected { server_version });
        }

        info!(host, port, client_id = self.settings.client_id, "Connecting to gateway");
        self.state.begin_connect();
        if let Err(e) = self
            .transport
            .connect(host, port, self.settings.client_id, self.events())
        {
            self.state.mark_disconnected();
            return Err(BridgeError::connection("connect", e.to_string()));
        }

        if !self.state.wait_session_ready(self.settings.connect_timeout) {
            warn!(
                host,
                port,
                timeout_secs = self.settings.connect_timeout.as_secs_f64(),
                "Gateway session not ready before timeout"
            );
            self.state.mark_disconnected();
            if let Err(e) = self.transport.disconnect() {
                warn!(error = %e, "Failed to tear down half-open session");
            }
            return Ok(ConnectOutcome::NotConnected);
        }

        let server_version = match self.transport.server_version() {
            Ok(version) => version,
            Err(e) => {
                self.state.mark_disconnected();
                if let Err(teardown) = self.transport.disconnect() {
                    warn!(error = %teardown, "Failed to tear down session");
                }
                return Err(BridgeError::connection(
                    "connect",
                    format!("connection established but couldn't get server version: {e}"),
                ));
            }
        };

        self.state.session.lock().server_version = Some(server_version);
        info!(host, port, server_version, "Connected to gateway");
        Ok(ConnectOutcome::Connected { server_version })
    }

    /// Close the session. Calling it while not connected is a no-op.
    pub fn disconnect(&self) -> Result<()> {
        if !self.state.mark_disconnected() {
            debug!("Disconnect requested while not connected");
            return Ok(());
        }

        let failed = self.state.table.fail_all(RequestFailure::Disconnected);
        if failed > 0 {
            warn!(failed, "Failed pending requests on disconnect");
        }

        self.transport
            .disconnect()
            .map_err(|e| BridgeError::connection("disconnect", e.to_string()))?;

        info!("Disconnected from gateway");
        Ok(())
    }

    /// Fetch one historical series and block until it is in.
    ///
    /// Returns the rows in arrival order. A deadline that passes with rows
    /// accumulated returns them; one that passes with none is
    /// [`BridgeError::NoData`].
    pub fn fetch(
        &self,
        request_id: RequestId,
        spec: &HistoryRequestSpec,
        timeout: Duration,
    ) -> Result<Vec<Bar>> {
        if !self.is_connected() {
            return Err(BridgeError::connection("fetch", "not connected to gateway"));
        }

        let request = spec.to_request(request_id, Local::now().naive_local())?;
        let guard = self.state.table.claim(request_id)?;
        let metrics = &self.state.metrics;
        metrics.set_pending_requests(self.state.table.len());
        let timer = metrics.fetch_started(spec.what_to_show.as_str());

        debug!(
            request_id,
            contract = %request.contract,
            what_to_show = %request.what_to_show,
            duration = %request.duration,
            bar_size = %request.bar_size,
            end = %request.end_date_time,
            "Requesting historical data"
        );
        self.transport
            .request_historical_data(&request)
            .map_err(|e| BridgeError::connection("request_historical_data", e.to_string()))?;

        let outcome = self
            .state
            .table
            .wait(request_id, self.settings.wait_policy, timeout);
        let rows = guard.release();
        metrics.set_pending_requests(self.state.table.len());
        let elapsed_ms = timer.elapsed().as_millis() as u64;

        match outcome {
            WaitOutcome::Ready => {
                info!(request_id, rows = rows.len(), elapsed_ms, "Historical fetch complete");
                Ok(rows)
            }
            WaitOutcome::TimedOut => {
                metrics.fetch_timed_out();
                if rows.is_empty() {
                    warn!(request_id, elapsed_ms, "No historical data before timeout");
                    Err(BridgeError::NoData { request_id, timeout })
                } else {
                    warn!(
                        request_id,
                        rows = rows.len(),
                        elapsed_ms,
                        "Historical fetch timed out, returning partial rows"
                    );
                    Ok(rows)
                }
            }
            WaitOutcome::Failed(RequestFailure::Gateway { code, message }) => {
                Err(BridgeError::Gateway {
                    request_id,
                    code,
                    message,
                })
            }
            WaitOutcome::Failed(RequestFailure::Disconnected) | WaitOutcome::Missing => {
                Err(BridgeError::connection(
                    "fetch",
                    format!("session closed while request {request_id} was pending"),
                ))
            }
        }
    }

    fn current_server_version(&self) -> Option<i32> {
        let session = self.state.session.lock();
        if session.connected {
            session.server_version
        } else {
            None
        }
    }
}

impl Drop for GatewayBridge {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!(error = %e, "Disconnect on drop failed");
        }
    }
}
