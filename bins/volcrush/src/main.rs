//! Volcrush CLI binary
//!
//! Entry point for the straddle analyzer. It provides commands for
//! initializing and validating configuration, pricing a straddle from
//! explicit inputs, and analyzing a symbol with market data fetched from the
//! broker gateway.

mod render;

use analytics::{
    analyze_scenario, price_straddle, OptionParameters, PositionSide, ScenarioAnalysis,
    ScenarioInputs, StraddleInputs, StraddleQuote,
};
use anyhow::{Context, Result};
use cli::{Cli, CommonArgs, Commands, LogFormatArg, PositionArgs, ShiftArgs, SideArg};
use common::{parse_days, parse_decimal, parse_port};
use config::{generate_default_config, load_config, save_config, validate_config, AppConfig};
use gateway::{
    fetch_market_and_volatility_history, BridgeSettings, ConnectOutcome, GatewayBridge,
    GatewayTransport, MarketSnapshot, ReplayBook, SimulatedGateway, SnapshotSettings,
    SyntheticSource,
};
use observability::{init_logging, init_metrics, LogFormat};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging("volcrush", log_format(&cli))?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Price { position, common } => {
            info!("Executing 'price' command");
            price_command(position, common).await
        }
        Commands::Scenario {
            position,
            shift,
            common,
        } => {
            info!("Executing 'scenario' command");
            scenario_command(position, shift, common).await
        }
        Commands::Analyze {
            symbol,
            days,
            strike,
            new_spot,
            new_iv,
            host,
            port,
            common,
        } => {
            info!(%symbol, "Executing 'analyze' command");
            let request = AnalyzeRequest {
                symbol,
                days,
                strike,
                shift: new_spot.zip(new_iv),
                host,
                port,
            };
            analyze_command(request, common).await
        }
    }
}

/// `--log-format`, else the configuration's `logging.format`, else pretty
fn log_format(cli: &Cli) -> LogFormat {
    if let Some(format) = cli.log_format {
        return match format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
            LogFormatArg::Compact => LogFormat::Compact,
        };
    }

    let config_path = match &cli.command {
        Commands::Validate { config } => Some(config.as_path()),
        Commands::Price { common, .. }
        | Commands::Scenario { common, .. }
        | Commands::Analyze { common, .. } => common.config.as_deref(),
        Commands::Init { .. } => None,
    };

    config_path
        .and_then(|path| load_config(path).ok())
        .map(|config| config.logging.format)
        .unwrap_or_default()
}

/// Load and validate the configuration named on the command line, or the
/// built-in defaults
fn load_settings(common: &CommonArgs) -> Result<AppConfig> {
    let config = match &common.config {
        Some(path) => load_config(path)?,
        None => generate_default_config(),
    };

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!(
            "Configuration has {} error(s); run 'volcrush validate' for details",
            report.errors.len()
        );
    }

    Ok(config)
}

fn risk_free_rate(config: &AppConfig, common: &CommonArgs) -> Result<f64> {
    match &common.rate {
        Some(text) => Ok(parse_decimal("risk-free rate", text)?),
        None => Ok(config.analytics.risk_free_rate),
    }
}

fn position_side(config: &AppConfig, common: &CommonArgs) -> PositionSide {
    match common.side {
        Some(SideArg::Long) => PositionSide::Long,
        Some(SideArg::Short) => PositionSide::Short,
        None => config.analytics.position_side,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

#[derive(Serialize)]
struct PriceReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    market: Option<&'a MarketSnapshot>,
    position: &'a OptionParameters,
    quote: &'a StraddleQuote,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<ScenarioReport<'a>>,
}

#[derive(Serialize)]
struct ScenarioReport<'a> {
    parameters: &'a OptionParameters,
    analysis: &'a ScenarioAnalysis,
    side: PositionSide,
    side_pnl: f64,
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!(
        "  - Gateway connection ({}:{}, client id {})",
        config.gateway.host, config.gateway.port, config.gateway.client_id
    );
    println!(
        "  - History requests ({} of {} bars, {} wait policy)",
        config.history.duration,
        config.history.bar_size,
        config.history.wait_policy.as_str()
    );
    println!(
        "  - Analytics (rate {}, IV annualized over {} periods, {} side)",
        config.analytics.risk_free_rate,
        config.analytics.vol_annualization,
        config.analytics.position_side
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the configuration file to point at your gateway");
    println!(
        "  2. Run 'volcrush validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'volcrush analyze NVDA --config {:?}' to analyze a symbol",
        output_path
    );

    Ok(())
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Gateway: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "Bar source: {}",
        config
            .gateway
            .replay_file
            .as_deref()
            .unwrap_or("synthetic series")
    );
    println!("Wait policy: {}", config.history.wait_policy.as_str());
    println!("Position side: {}", config.analytics.position_side);

    Ok(())
}

async fn price_command(position: PositionArgs, common: CommonArgs) -> Result<()> {
    let config = load_settings(&common)?;
    let rate = risk_free_rate(&config, &common)?;

    let params = StraddleInputs {
        spot: &position.spot,
        strike: &position.strike,
        iv_percent: &position.iv,
        days_to_expiry: &position.days,
    }
    .to_parameters(rate)?;
    let quote = price_straddle(&params)?;

    if common.json {
        return print_json(&PriceReport {
            market: None,
            position: &params,
            quote: &quote,
            scenario: None,
        });
    }

    render::print_position(&params);
    render::print_quote(&quote);
    Ok(())
}

async fn scenario_command(
    position: PositionArgs,
    shift: ShiftArgs,
    common: CommonArgs,
) -> Result<()> {
    let config = load_settings(&common)?;
    let rate = risk_free_rate(&config, &common)?;
    let side = position_side(&config, &common);

    let params = StraddleInputs {
        spot: &position.spot,
        strike: &position.strike,
        iv_percent: &position.iv,
        days_to_expiry: &position.days,
    }
    .to_parameters(rate)?;
    let quote = price_straddle(&params)?;

    let scenario = ScenarioInputs {
        new_spot: &shift.new_spot,
        new_iv_percent: &shift.new_iv,
    }
    .apply(&params)?;
    let analysis = analyze_scenario(&params, &scenario, quote.straddle_value)?;

    if common.json {
        return print_json(&PriceReport {
            market: None,
            position: &params,
            quote: &quote,
            scenario: Some(ScenarioReport {
                parameters: &scenario,
                analysis: &analysis,
                side,
                side_pnl: analysis.pnl(side),
            }),
        });
    }

    render::print_position(&params);
    render::print_quote(&quote);
    render::print_scenario(&scenario, &analysis, side);
    Ok(())
}

struct AnalyzeRequest {
    symbol: String,
    days: String,
    strike: Option<String>,
    /// New spot and new IV percent
    shift: Option<(String, String)>,
    host: Option<String>,
    port: Option<String>,
}

/// Build the transport named by the configuration
fn build_transport(config: &AppConfig) -> Result<Arc<SimulatedGateway>> {
    let gateway = match &config.gateway.replay_file {
        Some(path) => {
            info!(%path, "Serving bars from replay file");
            SimulatedGateway::new(ReplayBook::load(path)?)
        }
        None => {
            debug!("Serving synthetic bars");
            SimulatedGateway::new(SyntheticSource::default())
        }
    };
    Ok(Arc::new(gateway.with_row_delay(config.gateway.row_delay())))
}

fn bridge_settings(config: &AppConfig) -> BridgeSettings {
    BridgeSettings {
        client_id: config.gateway.client_id,
        connect_timeout: config.gateway.connect_timeout(),
        wait_policy: config.history.wait_policy,
    }
}

fn snapshot_settings(config: &AppConfig) -> SnapshotSettings {
    SnapshotSettings {
        price_request_id: config.history.price_request_id,
        iv_request_id: config.history.iv_request_id,
        duration: config.history.duration.clone(),
        bar_size: config.history.bar_size.clone(),
        use_rth: config.history.use_rth,
        timeout: config.history.fetch_timeout(),
        vol_annualization: config.analytics.vol_annualization,
    }
}

/// Connect, take a market snapshot and disconnect, off the async runtime
async fn fetch_snapshot(
    transport: Arc<dyn GatewayTransport>,
    config: &AppConfig,
    symbol: String,
    host: String,
    port: u16,
) -> Result<MarketSnapshot> {
    let bridge = GatewayBridge::new(transport, bridge_settings(config));
    let settings = snapshot_settings(config);
    let connect_timeout = config.gateway.connect_timeout();

    tokio::task::spawn_blocking(move || -> Result<MarketSnapshot> {
        match bridge.connect(&host, port)? {
            ConnectOutcome::Connected { server_version } => {
                debug!(server_version, "Gateway session established");
            }
            ConnectOutcome::NotConnected => {
                anyhow::bail!(
                    "Gateway at {}:{} did not become ready within {:?}",
                    host,
                    port,
                    connect_timeout
                );
            }
        }

        let snapshot = fetch_market_and_volatility_history(&bridge, &symbol, &settings);
        if let Err(e) = bridge.disconnect() {
            warn!(error = %e, "Failed to disconnect from gateway");
        }
        Ok(snapshot?)
    })
    .await
    .context("Gateway task failed")?
}

async fn analyze_command(request: AnalyzeRequest, common: CommonArgs) -> Result<()> {
    let config = load_settings(&common)?;
    let rate = risk_free_rate(&config, &common)?;
    let side = position_side(&config, &common);
    let days = parse_days("days to expiry", &request.days)?;

    let host = request
        .host
        .clone()
        .unwrap_or_else(|| config.gateway.host.clone());
    let port = match &request.port {
        Some(text) => parse_port(text)?,
        None => config.gateway.port,
    };

    if let Some(metrics_port) = config.logging.metrics_port {
        init_metrics(metrics_port)?;
    }

    let transport = build_transport(&config)?;
    let snapshot = fetch_snapshot(transport, &config, request.symbol.clone(), host, port).await?;

    let strike = match &request.strike {
        Some(text) => parse_decimal("strike price", text)?,
        None => snapshot.spot_price,
    };
    let params =
        OptionParameters::from_days(snapshot.spot_price, strike, days, rate, snapshot.implied_vol);
    let quote = price_straddle(&params)?;

    let scenario = match &request.shift {
        Some((new_spot, new_iv)) => {
            let scenario = ScenarioInputs {
                new_spot,
                new_iv_percent: new_iv,
            }
            .apply(&params)?;
            let analysis = analyze_scenario(&params, &scenario, quote.straddle_value)?;
            Some((scenario, analysis))
        }
        None => None,
    };

    if common.json {
        return print_json(&PriceReport {
            market: Some(&snapshot),
            position: &params,
            quote: &quote,
            scenario: scenario.as_ref().map(|(parameters, analysis)| ScenarioReport {
                parameters,
                analysis,
                side,
                side_pnl: analysis.pnl(side),
            }),
        });
    }

    render::print_snapshot(&snapshot);
    render::print_position(&params);
    render::print_quote(&quote);
    if let Some((scenario, analysis)) = &scenario {
        render::print_scenario(scenario, analysis, side);
    }
    Ok(())
}
