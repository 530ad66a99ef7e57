//! In-process simulated gateway
//!
//! Implements [`GatewayTransport`] with its own event-loop thread, fed by a
//! command channel, so the bridge sees callbacks arrive on a foreign thread
//! exactly as it would from a real gateway. Bars come from a [`BarSource`]:
//! a deterministic synthetic series or a recorded [`ReplayBook`].

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use common::{Bar, HistoricalDataRequest, RequestId, WhatToShow, END_DATE_TIME_FORMAT};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::transport::{GatewayEvents, GatewayTransport, TransportError};

/// Protocol version reported once connected
pub const SIMULATED_SERVER_VERSION: i32 = 176;

const FRACTIONAL_SHARE_MESSAGE: &str = "Your API version does not support fractional share size rules. \
     Please upgrade to a minimum version 163. Trimmed value 0.5 to 0";

const NO_DATA_CODE: i32 = 162;

/// Produces the bars served for one historical request
pub trait BarSource: Send + Sync {
    /// Bars in delivery order. Empty means the gateway has no data.
    fn bars(&self, request: &HistoricalDataRequest) -> Vec<Bar>;
}

/// Deterministic intraday series
///
/// Trades oscillate around a per-symbol base price. The implied volatility
/// series is delivered per trading day, so annualizing it with 252 periods
/// recovers `annual_iv`.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    base_prices: HashMap<String, f64>,
    pub annual_iv: f64,
    pub bars_per_request: usize,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            base_prices: HashMap::new(),
            annual_iv: 0.30,
            bars_per_request: 390,
        }
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_price(mut self, symbol: &str, price: f64) -> Self {
        self.base_prices.insert(symbol.to_uppercase(), price);
        self
    }

    pub fn with_annual_iv(mut self, annual_iv: f64) -> Self {
        self.annual_iv = annual_iv;
        self
    }

    pub fn with_bars_per_request(mut self, bars: usize) -> Self {
        self.bars_per_request = bars;
        self
    }

    /// Configured base price, or one derived from the symbol's bytes
    pub fn base_price(&self, symbol: &str) -> f64 {
        let symbol = symbol.to_uppercase();
        match self.base_prices.get(&symbol) {
            Some(price) => *price,
            None => {
                let seed: u32 = symbol.bytes().map(u32::from).sum();
                50.0 + f64::from(seed % 400)
            }
        }
    }

    fn trade_close(base: f64, index: usize) -> f64 {
        base * (1.0 + 0.004 * (index as f64 * 0.07).sin())
    }

    fn daily_iv(&self, index: usize) -> f64 {
        self.annual_iv / 252.0_f64.sqrt() * (1.0 + 0.01 * (index as f64 * 0.05).sin())
    }
}

impl BarSource for SyntheticSource {
    fn bars(&self, request: &HistoricalDataRequest) -> Vec<Bar> {
        let end = NaiveDateTime::parse_from_str(&request.end_date_time, END_DATE_TIME_FORMAT)
            .unwrap_or_else(|_| Local::now().naive_local());
        let count = self.bars_per_request;
        let base = self.base_price(&request.contract.symbol);

        (0..count)
            .map(|index| {
                let minutes_before_end = (count - 1 - index) as i64;
                let time = end - chrono::Duration::minutes(minutes_before_end);
                match request.what_to_show {
                    WhatToShow::Trades => {
                        let close = Self::trade_close(base, index);
                        let open = if index == 0 {
                            close
                        } else {
                            Self::trade_close(base, index - 1)
                        };
                        Bar {
                            time,
                            open,
                            high: open.max(close) * 1.0002,
                            low: open.min(close) * 0.9998,
                            close,
                            volume: 1_000.0 + (index % 17) as f64 * 50.0,
                        }
                    }
                    WhatToShow::OptionImpliedVolatility => {
                        let iv = self.daily_iv(index);
                        Bar {
                            time,
                            open: iv,
                            high: iv,
                            low: iv,
                            close: iv,
                            volume: 0.0,
                        }
                    }
                }
            })
            .collect()
    }
}

/// Replay file errors
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read replay file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse replay file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One recorded series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySeries {
    pub symbol: String,
    pub what_to_show: WhatToShow,
    pub bars: Vec<Bar>,
}

/// Recorded bars keyed by symbol and series, loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayBook {
    pub series: Vec<ReplaySeries>,
}

impl ReplayBook {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn insert(&mut self, symbol: &str, what_to_show: WhatToShow, bars: Vec<Bar>) {
        self.series.push(ReplaySeries {
            symbol: symbol.to_uppercase(),
            what_to_show,
            bars,
        });
    }
}

impl BarSource for ReplayBook {
    fn bars(&self, request: &HistoricalDataRequest) -> Vec<Bar> {
        self.series
            .iter()
            .find(|series| {
                series.what_to_show == request.what_to_show
                    && series.symbol.eq_ignore_ascii_case(&request.contract.symbol)
            })
            .map(|series| series.bars.clone())
            .unwrap_or_default()
    }
}

/// Scripted behaviour, adjustable while connected
#[derive(Debug, Clone)]
struct Script {
    refuse_connections: bool,
    announce_session: bool,
    row_delay: Duration,
    silenced: HashSet<RequestId>,
    failures: HashMap<RequestId, (i32, String)>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            refuse_connections: false,
            announce_session: true,
            row_delay: Duration::ZERO,
            silenced: HashSet::new(),
            failures: HashMap::new(),
        }
    }
}

enum Command {
    History(HistoricalDataRequest),
    /// Gateway-side close, reported through `on_connection_closed`
    Close,
    Shutdown,
}

struct Session {
    commands: mpsc::UnboundedSender<Command>,
    stopping: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

/// Gateway simulator driving the bridge from its own thread
pub struct SimulatedGateway {
    source: Arc<dyn BarSource>,
    script: Arc<Mutex<Script>>,
    session: Mutex<Option<Session>>,
}

impl SimulatedGateway {
    pub fn new(source: impl BarSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            script: Arc::new(Mutex::new(Script::default())),
            session: Mutex::new(None),
        }
    }

    /// Simulator serving the default synthetic series
    pub fn synthetic() -> Self {
        Self::new(SyntheticSource::default())
    }

    /// Pause between consecutive rows
    pub fn with_row_delay(self, delay: Duration) -> Self {
        self.script.lock().row_delay = delay;
        self
    }

    /// Fail every later `connect` at socket level
    pub fn refuse_connections(&self) {
        self.script.lock().refuse_connections = true;
    }

    /// Accept the socket but never report the session as ready
    pub fn suppress_session_ready(&self) {
        self.script.lock().announce_session = false;
    }

    /// Never answer requests with this id
    pub fn silence(&self, request_id: RequestId) {
        self.script.lock().silenced.insert(request_id);
    }

    /// Answer requests with this id with an error event
    pub fn fail_with(&self, request_id: RequestId, code: i32, message: impl Into<String>) {
        self.script
            .lock()
            .failures
            .insert(request_id, (code, message.into()));
    }

    /// Restore normal answers for this id
    pub fn answer(&self, request_id: RequestId) {
        let mut script = self.script.lock();
        script.silenced.remove(&request_id);
        script.failures.remove(&request_id);
    }

    /// Close the session from the gateway side
    pub fn close_from_gateway(&self) {
        if let Some(session) = self.session.lock().as_ref() {
            let _ = session.commands.send(Command::Close);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().is_some()
    }
}

impl GatewayTransport for SimulatedGateway {
    fn connect(
        &self,
        host: &str,
        port: u16,
        client_id: i32,
        events: Arc<dyn GatewayEvents>,
    ) -> Result<(), TransportError> {
        if self.script.lock().refuse_connections {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("connection refused by {host}:{port}"),
            )));
        }

        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| s.worker.is_finished()) {
            // Closed from the gateway side; reap the old loop
            *session = None;
        }
        if session.is_some() {
            return Err(TransportError::Rejected(format!(
                "client id {client_id} already connected"
            )));
        }

        let (commands, receiver) = mpsc::unbounded_channel();
        let stopping = Arc::new(AtomicBool::new(false));
        let event_loop = EventLoop {
            source: Arc::clone(&self.source),
            script: Arc::clone(&self.script),
            events,
            stopping: Arc::clone(&stopping),
        };
        let worker = thread::Builder::new()
            .name("gateway-events".to_string())
            .spawn(move || event_loop.run(receiver))?;

        *session = Some(Session {
            commands,
            stopping,
            worker,
        });
        info!(host, port, client_id, "Simulated gateway accepted connection");
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let Some(session) = self.session.lock().take() else {
            return Ok(());
        };

        session.stopping.store(true, Ordering::SeqCst);
        // The loop may already be gone after a gateway-side close
        let _ = session.commands.send(Command::Shutdown);
        session
            .worker
            .join()
            .map_err(|_| TransportError::Rejected("event loop panicked".to_string()))?;

        info!("Simulated gateway session closed");
        Ok(())
    }

    fn server_version(&self) -> Result<i32, TransportError> {
        if self.is_connected() {
            Ok(SIMULATED_SERVER_VERSION)
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn request_historical_data(
        &self,
        request: &HistoricalDataRequest,
    ) -> Result<(), TransportError> {
        let session = self.session.lock();
        let session = session.as_ref().ok_or(TransportError::NotConnected)?;
        session
            .commands
            .send(Command::History(request.clone()))
            .map_err(|_| TransportError::NotConnected)
    }
}

impl Drop for SimulatedGateway {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

struct EventLoop {
    source: Arc<dyn BarSource>,
    script: Arc<Mutex<Script>>,
    events: Arc<dyn GatewayEvents>,
    stopping: Arc<AtomicBool>,
}

impl EventLoop {
    fn run(self, mut commands: mpsc::UnboundedReceiver<Command>) {
        if self.script.lock().announce_session {
            self.events.on_session_ready(1);
        }

        while let Some(command) = commands.blocking_recv() {
            match command {
                Command::History(request) => self.serve(&request),
                Command::Close => {
                    self.events.on_connection_closed();
                    break;
                }
                Command::Shutdown => break,
            }
        }
        debug!("Simulated gateway event loop stopped");
    }

    fn serve(&self, request: &HistoricalDataRequest) {
        let request_id = request.request_id;
        let (silenced, failure, row_delay) = {
            let script = self.script.lock();
            (
                script.silenced.contains(&request_id),
                script.failures.get(&request_id).cloned(),
                script.row_delay,
            )
        };

        self.events
            .on_error(request_id, 2176, FRACTIONAL_SHARE_MESSAGE);

        if silenced {
            debug!(request_id, "Simulated gateway ignoring request");
            return;
        }

        if let Some((code, message)) = failure {
            self.events.on_error(request_id, code, &message);
            return;
        }

        let bars = self.source.bars(request);
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            let message = format!(
                "Historical Market Data Service error message:HMDS query returned no data: {}@{} {}",
                request.contract.symbol, request.contract.exchange, request.what_to_show
            );
            self.events.on_error(request_id, NO_DATA_CODE, &message);
            return;
        };
        let start = first.time.format(END_DATE_TIME_FORMAT).to_string();
        let end = last.time.format(END_DATE_TIME_FORMAT).to_string();

        for bar in &bars {
            if self.stopping.load(Ordering::SeqCst) {
                return;
            }
            if !row_delay.is_zero() {
                thread::sleep(row_delay);
            }
            self.events.on_historical_data(request_id, *bar);
        }
        self.events.on_historical_data_end(request_id, &start, &end);
    }
}
