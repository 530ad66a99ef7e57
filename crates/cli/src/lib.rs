use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "volcrush")]
#[command(about = "Volcrush - short straddle analytics over a broker gateway")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Log output format (overrides logging.format in the configuration)
    #[arg(long, global = true, value_enum, env = "VOLCRUSH_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "volcrush.yaml")]
        output: PathBuf,
    },

    /// Validate configuration without connecting
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "volcrush.yaml")]
        config: PathBuf,
    },

    /// Price a straddle from explicit inputs
    Price {
        #[command(flatten)]
        position: PositionArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Re-price a straddle under a new spot and IV and report the P/L
    Scenario {
        #[command(flatten)]
        position: PositionArgs,

        #[command(flatten)]
        shift: ShiftArgs,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Fetch spot and IV from the gateway, then price (and optionally shock)
    /// a straddle on the symbol
    Analyze {
        /// Ticker symbol, e.g. NVDA
        symbol: String,

        /// Calendar days to expiry
        #[arg(long, default_value = "30")]
        days: String,

        /// Strike; defaults to the fetched spot (at the money)
        #[arg(long)]
        strike: Option<String>,

        /// Scenario spot price
        #[arg(long, requires = "new_iv")]
        new_spot: Option<String>,

        /// Scenario IV in percent
        #[arg(long, requires = "new_spot")]
        new_iv: Option<String>,

        /// Override gateway.host
        #[arg(long)]
        host: Option<String>,

        /// Override gateway.port
        #[arg(long)]
        port: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

/// Straddle inputs as typed by the user
#[derive(Args, Debug, Clone)]
pub struct PositionArgs {
    /// Spot price of the underlying
    #[arg(long)]
    pub spot: String,

    /// Strike shared by both legs
    #[arg(long)]
    pub strike: String,

    /// Implied volatility in percent, e.g. 30 for 30%
    #[arg(long)]
    pub iv: String,

    /// Calendar days to expiry
    #[arg(long)]
    pub days: String,
}

#[derive(Args, Debug, Clone)]
pub struct ShiftArgs {
    /// Scenario spot price
    #[arg(long)]
    pub new_spot: String,

    /// Scenario IV in percent
    #[arg(long)]
    pub new_iv: String,
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the configuration file; built-in defaults when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override analytics.risk_free_rate (fraction, e.g. 0.05)
    #[arg(long)]
    pub rate: Option<String>,

    /// Position side whose P/L is reported first
    #[arg(long, value_enum)]
    pub side: Option<SideArg>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SideArg {
    /// Bought the straddle
    Long,
    /// Sold the straddle
    Short,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        let cli = Cli::try_parse_from([
            "volcrush", "price", "--spot", "100", "--strike", "100", "--iv", "30", "--days", "30",
        ])
        .unwrap();

        match cli.command {
            Commands::Price { position, common } => {
                assert_eq!(position.spot, "100");
                assert_eq!(position.iv, "30");
                assert!(common.config.is_none());
                assert!(!common.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_scenario_with_side() {
        let cli = Cli::try_parse_from([
            "volcrush", "--log-format", "json", "scenario", "--spot", "100", "--strike", "100",
            "--iv", "30", "--days", "30", "--new-spot", "100", "--new-iv", "15", "--side", "long",
        ])
        .unwrap();

        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        match cli.command {
            Commands::Scenario { shift, common, .. } => {
                assert_eq!(shift.new_iv, "15");
                assert_eq!(common.side, Some(SideArg::Long));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_scenario_flags_come_in_pairs() {
        let result = Cli::try_parse_from(["volcrush", "analyze", "NVDA", "--new-spot", "900"]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from(["volcrush", "analyze", "NVDA", "--port", "4002"]).unwrap();
        match cli.command {
            Commands::Analyze { symbol, days, port, .. } => {
                assert_eq!(symbol, "NVDA");
                assert_eq!(days, "30");
                assert_eq!(port.as_deref(), Some("4002"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_input() {
        assert!(Cli::try_parse_from(["volcrush", "price", "--spot", "100"]).is_err());
    }
}
