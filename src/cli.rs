//! CLI arguments and subcommands for smartprom-exporter.
//!
//! This module defines the command-line interface structure using the clap library.
//! The environment variables understood by earlier smartprom releases
//! (`PORT`, `SCAN_EVERY_SECONDS`, `SLEEP_SECONDS`) are accepted as fallbacks
//! for the matching flags. `LOGLEVEL` is read by the config layer because it
//! also takes numeric levels and never prevents startup. `LOGFORMAT` held a
//! log line template there and is not read.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    #[value(alias = "critical", alias = "fatal")]
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    #[value(alias = "notset")]
    Trace,
}

impl LogLevel {
    /// Parses a level name (case-insensitive) or a numeric threshold where
    /// 10 is debug, 20 info, 30 warning, 40 error and 50 critical. A number
    /// selects the most verbose level whose messages it still lets through.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(threshold) = value.parse::<i64>() {
            return Some(match threshold {
                i64::MIN..=0 => LogLevel::Trace,
                1..=10 => LogLevel::Debug,
                11..=20 => LogLevel::Info,
                21..=30 => LogLevel::Warn,
                31..=50 => LogLevel::Error,
                _ => LogLevel::Off,
            });
        }
        <LogLevel as ValueEnum>::from_str(value, true).ok()
    }

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "smartprom-exporter",
    about = "Prometheus exporter for S.M.A.R.T. disk attributes",
    long_about = "Prometheus exporter for S.M.A.R.T. disk attributes.\n\n\
                  Polls smartctl for every ATA, NVMe and SCSI device found by \
                  `smartctl --scan-open` and exposes each attribute as a \
                  smartprom_* gauge labeled by drive. Must run as root or in a \
                  privileged container.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long, env = "PORT")]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long)]
    pub bind: Option<IpAddr>,

    /// Seconds between two sweeps over all devices
    #[arg(long, env = "SCAN_EVERY_SECONDS")]
    pub scan_every_seconds: Option<f64>,

    /// Sleep granularity of the scheduler loop in seconds
    #[arg(long, env = "SLEEP_SECONDS")]
    pub sleep_seconds: Option<f64>,

    /// Re-run device discovery every N seconds (0 = only at startup)
    #[arg(long)]
    pub rescan_devices_seconds: Option<f64>,

    /// Path to the smartctl binary
    #[arg(long)]
    pub smartctl_path: Option<PathBuf>,

    /// Parallel device polling threads (1 = sequential)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Log level [default: info, env: LOGLEVEL]
    #[arg(long, value_enum, ignore_case = true)]
    pub log_level: Option<LogLevel>,

    /// Log output format
    #[arg(long, value_enum, ignore_case = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal smartprom_exporter_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check smartctl availability, privileges and device discovery
    Check,

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run sweeps once and print the extracted attributes
    Test {
        /// Number of sweeps
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print every attribute of every device
        #[arg(long)]
        verbose: bool,

        /// Print the resulting Prometheus exposition
        #[arg(long)]
        metrics: bool,
    },
}
