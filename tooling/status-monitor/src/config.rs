use crate::units::Ether;
use clap::{ArgAction, Parser as ClapParser};
use std::{
    fmt::Display,
    io::{self, IsTerminal},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::Level;
use url::Url;

pub const DEFAULT_ADDRESS: &str = "http://localhost:6539";

#[derive(ClapParser, Debug, Clone)]
#[command(
    name = "node-status-monitor",
    version,
    about = "Watch the stats of a local Redbelly node"
)]
pub struct Options {
    #[arg(
        short = 'a',
        long = "address",
        default_value = DEFAULT_ADDRESS,
        value_name = "URL",
        help = "Address of the node's status server",
        env = "STATUS_MONITOR_ADDRESS"
    )]
    pub address: String,
    #[arg(
        short = 'b',
        long = "min-balance",
        visible_alias = "minBalance",
        default_value = "10",
        value_name = "RBNT",
        help = "Minimum signing address balance in RBNT before warning",
        long_help = "Fractional amounts are accepted, up to 18 decimal places.",
        env = "STATUS_MONITOR_MIN_BALANCE"
    )]
    pub min_balance: Ether,
    #[arg(
        short = 'r',
        long = "refresh-seconds",
        visible_alias = "refreshSeconds",
        default_value_t = 5,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Frequency to refresh values",
        env = "STATUS_MONITOR_REFRESH_SECONDS"
    )]
    pub refresh_seconds: u64,
    #[arg(
        long = "output",
        default_value_t = OutputFormat::Text,
        value_name = "FORMAT",
        help = "Report format.",
        long_help = "Possible values: text, json",
        env = "STATUS_MONITOR_OUTPUT"
    )]
    pub output: OutputFormat,
    #[arg(
        long = "color",
        default_value_t = ColorChoice::Auto,
        value_name = "WHEN",
        help = "Highlight warnings with ANSI color codes.",
        long_help = "Possible values: auto, always, never",
        env = "STATUS_MONITOR_COLOR"
    )]
    pub color: ColorChoice,
    #[arg(
        long = "once",
        action = ArgAction::SetTrue,
        help = "Poll a single time, print the report and exit"
    )]
    pub once: bool,
    #[arg(
        long = "log.level",
        default_value_t = Level::WARN,
        value_name = "LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error",
        env = "STATUS_MONITOR_LOG_LEVEL"
    )]
    pub log_level: Level,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format '{s}'. Expected: text or json")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for ColorChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorChoice::Auto => write!(f, "auto"),
            ColorChoice::Always => write!(f, "always"),
            ColorChoice::Never => write!(f, "never"),
        }
    }
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "Invalid color choice '{s}'. Expected: auto, always, or never"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid status server address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("refresh interval must be at least one second")]
    InvalidRefreshInterval,
}

/// Validated settings for a monitoring session.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub address: String,
    pub min_signing_balance: Ether,
    pub refresh_interval: Duration,
    pub output: OutputFormat,
    pub color: ColorChoice,
    pub once: bool,
}

impl AppConfig {
    pub fn color_enabled(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => io::stdout().is_terminal(),
        }
    }
}

impl TryFrom<Options> for AppConfig {
    type Error = ConfigError;

    fn try_from(options: Options) -> Result<Self, Self::Error> {
        let address = validate_address(&options.address)?;
        if options.refresh_seconds == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }

        Ok(Self {
            address,
            min_signing_balance: options.min_balance,
            refresh_interval: Duration::from_secs(options.refresh_seconds),
            output: options.output,
            color: options.color,
            once: options.once,
        })
    }
}

fn validate_address(raw: &str) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidAddress {
        address: raw.to_owned(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|error| invalid(error.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_owned()));
    }

    Ok(raw.trim().trim_end_matches('/').to_owned())
}
