//! Bridge behaviour against the in-process simulated gateway

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::{Bar, WhatToShow};
use gateway::{
    fetch_market_and_volatility_history, BridgeError, BridgeSettings, ConnectOutcome,
    GatewayBridge, HistoryRequestSpec, ReplayBook, SimulatedGateway, SnapshotSettings,
    SyntheticSource, WaitPolicy,
};

const HOST: &str = "127.0.0.1";
const PORT: u16 = 7497;

fn settings(wait_policy: WaitPolicy) -> BridgeSettings {
    BridgeSettings {
        client_id: 1,
        connect_timeout: Duration::from_secs(2),
        wait_policy,
    }
}

fn connected(gateway: SimulatedGateway) -> (Arc<SimulatedGateway>, GatewayBridge) {
    connected_with(gateway, settings(WaitPolicy::UntilComplete))
}

fn connected_with(
    gateway: SimulatedGateway,
    settings: BridgeSettings,
) -> (Arc<SimulatedGateway>, GatewayBridge) {
    let gateway = Arc::new(gateway);
    let bridge = GatewayBridge::new(gateway.clone(), settings);
    let outcome = bridge.connect(HOST, PORT).unwrap();
    assert_eq!(outcome, ConnectOutcome::Connected { server_version: 176 });
    (gateway, bridge)
}

fn small_source() -> SyntheticSource {
    SyntheticSource::new()
        .with_base_price("NVDA", 880.0)
        .with_base_price("AAPL", 170.0)
        .with_bars_per_request(50)
}

fn bar(hour: u32, minute: u32, close: f64) -> Bar {
    Bar {
        time: NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 100.0,
    }
}

#[test]
fn test_fetch_returns_complete_series() {
    let (_gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    let spec = HistoryRequestSpec::new("nvda", WhatToShow::Trades);

    let rows = bridge.fetch(1, &spec, Duration::from_secs(5)).unwrap();

    assert_eq!(rows.len(), 50);
    assert!(rows.iter().all(|bar| (bar.close - 880.0).abs() < 880.0 * 0.005));
    assert!(bridge.pending().is_empty());
}

#[test]
fn test_silent_gateway_yields_no_data_after_timeout() {
    let (gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    gateway.silence(99);
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    let start = Instant::now();
    let err = bridge.fetch(99, &spec, Duration::from_millis(200)).unwrap_err();
    let elapsed = start.elapsed();

    assert_matches!(err, BridgeError::NoData { request_id: 99, .. });
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_secs(2));
    assert!(bridge.pending().is_empty());
}

#[test]
fn test_concurrent_fetches_are_isolated() {
    let gateway = SimulatedGateway::new(small_source()).with_row_delay(Duration::from_millis(1));
    let (_gateway, bridge) = connected(gateway);

    let (nvda, aapl) = thread::scope(|scope| {
        let nvda = scope.spawn(|| {
            bridge.fetch(
                1,
                &HistoryRequestSpec::new("NVDA", WhatToShow::Trades),
                Duration::from_secs(5),
            )
        });
        let aapl = scope.spawn(|| {
            bridge.fetch(
                2,
                &HistoryRequestSpec::new("AAPL", WhatToShow::Trades),
                Duration::from_secs(5),
            )
        });
        (nvda.join().unwrap(), aapl.join().unwrap())
    });

    let nvda = nvda.unwrap();
    let aapl = aapl.unwrap();
    assert_eq!(nvda.len(), 50);
    assert_eq!(aapl.len(), 50);
    assert!(nvda.iter().all(|bar| bar.close > 800.0));
    assert!(aapl.iter().all(|bar| bar.close < 200.0));
}

#[test]
fn test_same_id_cannot_be_fetched_twice() {
    let (gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    gateway.silence(20);
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    thread::scope(|scope| {
        let first = scope.spawn(|| bridge.fetch(20, &spec, Duration::from_millis(300)));

        let deadline = Instant::now() + Duration::from_secs(1);
        while bridge.pending().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_matches!(
            bridge.fetch(20, &spec, Duration::from_millis(10)),
            Err(BridgeError::RequestInFlight(20))
        );

        assert_matches!(first.join().unwrap(), Err(BridgeError::NoData { .. }));
    });
}

#[test]
fn test_late_rows_do_not_leak_into_reused_id() {
    let (gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    gateway.silence(5);
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    assert_matches!(
        bridge.fetch(5, &spec, Duration::from_millis(50)),
        Err(BridgeError::NoData { .. })
    );

    // Rows for the abandoned fetch arrive after it gave up
    let events = bridge.events();
    events.on_historical_data(5, bar(9, 30, 1.0));
    events.on_historical_data_end(5, "start", "end");
    assert!(bridge.pending().is_empty());

    gateway.answer(5);
    let rows = bridge.fetch(5, &spec, Duration::from_secs(5)).unwrap();
    assert_eq!(rows.len(), 50);
    assert!(rows.iter().all(|bar| bar.close != 1.0));
}

#[test]
fn test_fractional_share_warning_does_not_fail_fetch() {
    // The simulator emits the fractional share warning before every answer
    let (_gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    let spec = HistoryRequestSpec::new("AAPL", WhatToShow::OptionImpliedVolatility);

    let rows = bridge.fetch(100, &spec, Duration::from_secs(5)).unwrap();
    assert_eq!(rows.len(), 50);
}

#[test]
fn test_gateway_error_terminates_fetch_early() {
    let (gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    gateway.fail_with(9, 200, "No security definition has been found for the request");
    let spec = HistoryRequestSpec::new("ZZZZ", WhatToShow::Trades);

    let start = Instant::now();
    let err = bridge.fetch(9, &spec, Duration::from_secs(5)).unwrap_err();

    assert_matches!(err, BridgeError::Gateway { request_id: 9, code: 200, .. });
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(bridge.pending().is_empty());
}

#[test]
fn test_empty_source_reports_no_data_error() {
    let (_gateway, bridge) = connected(SimulatedGateway::new(ReplayBook::default()));
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    assert_matches!(
        bridge.fetch(1, &spec, Duration::from_secs(5)),
        Err(BridgeError::Gateway { code: 162, .. })
    );
}

#[test]
fn test_first_row_policy_returns_before_stream_end() {
    let gateway = SimulatedGateway::new(small_source()).with_row_delay(Duration::from_millis(20));
    let (_gateway, bridge) = connected_with(gateway, settings(WaitPolicy::FirstRow));
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    let rows = bridge.fetch(1, &spec, Duration::from_secs(5)).unwrap();

    assert!(!rows.is_empty());
    assert!(rows.len() < 50);
}

#[test]
fn test_timeout_with_partial_rows_returns_them() {
    let gateway = SimulatedGateway::new(small_source()).with_row_delay(Duration::from_millis(20));
    let (_gateway, bridge) = connected(gateway);
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    let rows = bridge.fetch(1, &spec, Duration::from_millis(200)).unwrap();

    assert!(!rows.is_empty());
    assert!(rows.len() < 50);
}

#[test]
fn test_gateway_close_wakes_pending_fetch() {
    let (gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    gateway.silence(11);
    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);

    thread::scope(|scope| {
        let fetch = scope.spawn(|| bridge.fetch(11, &spec, Duration::from_secs(5)));

        let deadline = Instant::now() + Duration::from_secs(1);
        while bridge.pending().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let start = Instant::now();
        gateway.close_from_gateway();

        assert_matches!(
            fetch.join().unwrap(),
            Err(BridgeError::Connection { operation: "fetch", .. })
        );
        assert!(start.elapsed() < Duration::from_secs(2));
    });
    assert!(!bridge.is_connected());
}

#[test]
fn test_connect_timeout_reports_not_connected() {
    let gateway = Arc::new(SimulatedGateway::synthetic());
    gateway.suppress_session_ready();
    let bridge = GatewayBridge::new(
        gateway.clone(),
        BridgeSettings {
            connect_timeout: Duration::from_millis(100),
            ..BridgeSettings::default()
        },
    );

    let start = Instant::now();
    assert_eq!(bridge.connect(HOST, PORT).unwrap(), ConnectOutcome::NotConnected);
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert!(!gateway.is_connected());
    assert!(!bridge.is_connected());
}

#[test]
fn test_refused_connection_fails_fast() {
    let gateway = Arc::new(SimulatedGateway::synthetic());
    gateway.refuse_connections();
    let bridge = GatewayBridge::new(gateway, BridgeSettings::default());

    let start = Instant::now();
    assert_matches!(
        bridge.connect(HOST, PORT),
        Err(BridgeError::Connection { operation: "connect", .. })
    );
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_disconnect_twice_is_noop() {
    let (gateway, bridge) = connected(SimulatedGateway::synthetic());

    bridge.disconnect().unwrap();
    assert!(!gateway.is_connected());
    bridge.disconnect().unwrap();

    let spec = HistoryRequestSpec::new("NVDA", WhatToShow::Trades);
    assert_matches!(
        bridge.fetch(1, &spec, Duration::from_millis(10)),
        Err(BridgeError::Connection { operation: "fetch", .. })
    );

    // A fresh session can be opened afterwards
    assert_matches!(bridge.connect(HOST, PORT), Ok(ConnectOutcome::Connected { .. }));
}

#[test]
fn test_market_snapshot_from_replay() {
    let mut book = ReplayBook::default();
    book.insert(
        "NVDA",
        WhatToShow::Trades,
        vec![bar(15, 59, 880.0), bar(15, 59, 881.5), bar(10, 0, 870.0)],
    );
    book.insert(
        "NVDA",
        WhatToShow::OptionImpliedVolatility,
        vec![bar(15, 58, 0.019), bar(15, 59, 0.02)],
    );
    let (_gateway, bridge) = connected(SimulatedGateway::new(book));

    let snapshot =
        fetch_market_and_volatility_history(&bridge, "nvda", &SnapshotSettings::default()).unwrap();

    assert_eq!(snapshot.symbol, "NVDA");
    assert_eq!(snapshot.spot_price, 881.5);
    assert_eq!(snapshot.raw_iv, 0.02);
    assert!((snapshot.implied_vol - 0.02 * 252.0_f64.sqrt()).abs() < 1e-12);
    assert_eq!(snapshot.iv_time, bar(15, 59, 0.0).time);
}

#[test]
fn test_market_snapshot_from_synthetic_series() {
    let source = SyntheticSource::new()
        .with_base_price("SPY", 500.0)
        .with_annual_iv(0.2)
        .with_bars_per_request(120);
    let (_gateway, bridge) = connected(SimulatedGateway::new(source));

    let snapshot =
        fetch_market_and_volatility_history(&bridge, "SPY", &SnapshotSettings::default()).unwrap();

    assert!((snapshot.spot_price - 500.0).abs() < 500.0 * 0.005);
    assert!((snapshot.implied_vol - 0.2).abs() < 0.2 * 0.011);
}

#[test]
fn test_market_snapshot_propagates_iv_failure() {
    let (gateway, bridge) = connected(SimulatedGateway::new(small_source()));
    gateway.silence(100);
    let settings = SnapshotSettings {
        timeout: Duration::from_millis(100),
        ..SnapshotSettings::default()
    };

    assert_matches!(
        fetch_market_and_volatility_history(&bridge, "NVDA", &settings),
        Err(BridgeError::NoData { request_id: 100, .. })
    );
}

#[test]
fn test_demo_replay_file_snapshot() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../demos/replay_nvda.json");
    let book = ReplayBook::load(path).unwrap();
    let (_gateway, bridge) = connected(SimulatedGateway::new(book));

    let snapshot =
        fetch_market_and_volatility_history(&bridge, "NVDA", &SnapshotSettings::default()).unwrap();

    assert_eq!(snapshot.spot_time, bar(15, 59, 0.0).time);
    assert!(snapshot.spot_price > 870.0 && snapshot.spot_price < 890.0);
    assert!(snapshot.implied_vol > 0.4 && snapshot.implied_vol < 0.5);
}
