//! Configuration management for smartprom-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use serde::{Deserialize, Serialize};
use smartprom_exporter::smartctl::DEFAULT_SMARTCTL;
use smartprom_exporter::scheduler::{DEFAULT_SCAN_INTERVAL, DEFAULT_SLEEP_GRANULARITY};
use smartprom_exporter::SchedulerConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9902;
pub const DEFAULT_SCAN_EVERY_SECONDS: f64 = 20.0;
pub const DEFAULT_SLEEP_SECONDS: f64 = 0.1;

/// Log level variable, accepting names and numeric thresholds.
pub const LOGLEVEL_ENV: &str = "LOGLEVEL";

/// Exporter configuration. Every field is optional so a config file only
/// needs to name what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,

    // Polling
    #[serde(alias = "scan-every-seconds")]
    pub scan_every_seconds: Option<f64>,
    #[serde(alias = "sleep-seconds")]
    pub sleep_seconds: Option<f64>,
    /// 0 or unset keeps the device set found at startup
    #[serde(alias = "rescan-devices-seconds")]
    pub rescan_devices_seconds: Option<f64>,
    #[serde(alias = "smartctl-path")]
    pub smartctl_path: Option<PathBuf>,
    pub parallelism: Option<usize>,

    // Feature flags
    #[serde(alias = "enable-health")]
    pub enable_health: Option<bool>,
    #[serde(alias = "enable-telemetry")]
    pub enable_telemetry: Option<bool>,

    // Logging
    pub log_level: Option<String>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            port: Some(DEFAULT_PORT),
            scan_every_seconds: Some(DEFAULT_SCAN_EVERY_SECONDS),
            sleep_seconds: Some(DEFAULT_SLEEP_SECONDS),
            rescan_devices_seconds: Some(0.0),
            smartctl_path: Some(PathBuf::from(DEFAULT_SMARTCTL)),
            parallelism: None,
            enable_health: Some(true),
            enable_telemetry: Some(true),
            log_level: Some("info".into()),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// Effective log level; unknown names fall back to info.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(LogLevel::parse)
            .unwrap_or(LogLevel::Info)
    }

    pub fn smartctl_path(&self) -> PathBuf {
        self.smartctl_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SMARTCTL))
    }

    /// Scheduler timing derived from the effective configuration.
    /// Call after `validate_effective_config`.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        let scan = self.scan_every_seconds.unwrap_or(DEFAULT_SCAN_EVERY_SECONDS);
        let sleep = self.sleep_seconds.unwrap_or(DEFAULT_SLEEP_SECONDS);
        let rescan = self.rescan_devices_seconds.unwrap_or(0.0);

        SchedulerConfig {
            scan_interval: Duration::try_from_secs_f64(scan)
                .unwrap_or(DEFAULT_SCAN_INTERVAL),
            sleep_granularity: Duration::try_from_secs_f64(sleep)
                .unwrap_or(DEFAULT_SLEEP_GRANULARITY),
            rediscovery_interval: Duration::try_from_secs_f64(rescan)
                .ok()
                .filter(|every| !every.is_zero()),
        }
    }
}

fn check_seconds(name: &str, value: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be a positive number of seconds, got {}", name, value).into());
    }
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(format!("{} is too large: {}", name, value).into());
    }
    Ok(())
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let scan = cfg.scan_every_seconds.unwrap_or(DEFAULT_SCAN_EVERY_SECONDS);
    let sleep = cfg.sleep_seconds.unwrap_or(DEFAULT_SLEEP_SECONDS);

    check_seconds("scan_every_seconds", scan)?;
    check_seconds("sleep_seconds", sleep)?;

    if sleep > scan {
        return Err(format!(
            "sleep_seconds ({}) must not exceed scan_every_seconds ({})",
            sleep, scan
        )
        .into());
    }

    if let Some(rescan) = cfg.rescan_devices_seconds {
        if !rescan.is_finite() || rescan < 0.0 {
            return Err(format!(
                "rescan_devices_seconds must be 0 (disabled) or positive, got {}",
                rescan
            )
            .into());
        }
        if rescan > 0.0 {
            check_seconds("rescan_devices_seconds", rescan)?;
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::parse(level).is_none() {
            return Err(format!(
                "log_level must be one of off, error, warn, info, debug, trace or a number, got {:?}",
                level
            )
            .into());
        }
    }

    if cfg.parallelism == Some(0) {
        return Err("parallelism must be at least 1".into());
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        let cert_path = cfg.tls_cert_path.as_deref();
        let key_path = cfg.tls_key_path.as_deref();

        match (cert_path, key_path) {
            (None, None) => {
                return Err(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                );
            }
            (Some(_), None) => {
                return Err("TLS is enabled but tls_key_path is not set".into());
            }
            (None, Some(_)) => {
                return Err("TLS is enabled but tls_cert_path is not set".into());
            }
            (Some(cert), Some(key)) => {
                for (what, path) in [("certificate", cert), ("private key", key)] {
                    match fs::metadata(path) {
                        Ok(meta) if meta.len() == 0 => {
                            return Err(format!("TLS {} file is empty: {}", what, path).into());
                        }
                        Ok(_) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                            return Err(format!("TLS {} file not found: {}", what, path).into());
                        }
                        Err(e) => {
                            return Err(format!(
                                "TLS {} file is not readable: {} ({})",
                                what, path, e
                            )
                            .into());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }

    if let Some(scan) = args.scan_every_seconds {
        config.scan_every_seconds = Some(scan);
    }
    if let Some(sleep) = args.sleep_seconds {
        config.sleep_seconds = Some(sleep);
    }
    if let Some(rescan) = args.rescan_devices_seconds {
        config.rescan_devices_seconds = Some(rescan);
    }
    if let Some(path) = &args.smartctl_path {
        config.smartctl_path = Some(path.clone());
    }
    if let Some(threads) = args.parallelism {
        config.parallelism = Some(threads);
    }

    if let Some(level) = args.log_level {
        config.log_level = Some(level.name().to_string());
    } else if let Ok(value) = env::var(LOGLEVEL_ENV) {
        // Unusable values fall back to info; main warns once logging is up
        let level = LogLevel::parse(&value).unwrap_or(LogLevel::Info);
        config.log_level = Some(level.name().to_string());
    }

    // Feature flags
    if args.disable_health {
        config.enable_health = Some(false);
    }
    if args.disable_telemetry {
        config.enable_telemetry = Some(false);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Returns the `LOGLEVEL` value when it is in effect but could not be parsed.
pub fn invalid_env_log_level(args: &Args) -> Option<String> {
    if args.log_level.is_some() {
        return None;
    }
    env::var(LOGLEVEL_ENV)
        .ok()
        .filter(|value| LogLevel::parse(value).is_none())
}

/// Loads a config file, or the first default location that exists.
/// Fields absent from the file keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "/etc/smartprom/smartprom.yaml",
                "/etc/smartprom/smartprom.yml",
                "/etc/smartprom/smartprom.json",
                "./smartprom.yaml",
                "./smartprom.yml",
                "./smartprom.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(p) => PathBuf::from(p),
                None => return Ok(Config::default()),
            }
        }
    };

    let content = fs::read_to_string(&path)?;

    let loaded: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_defaults(loaded))
}

fn merge_defaults(loaded: Config) -> Config {
    let defaults = Config::default();
    Config {
        port: loaded.port.or(defaults.port),
        bind: loaded.bind.or(defaults.bind),
        scan_every_seconds: loaded.scan_every_seconds.or(defaults.scan_every_seconds),
        sleep_seconds: loaded.sleep_seconds.or(defaults.sleep_seconds),
        rescan_devices_seconds: loaded
            .rescan_devices_seconds
            .or(defaults.rescan_devices_seconds),
        smartctl_path: loaded.smartctl_path.or(defaults.smartctl_path),
        parallelism: loaded.parallelism.or(defaults.parallelism),
        enable_health: loaded.enable_health.or(defaults.enable_health),
        enable_telemetry: loaded.enable_telemetry.or(defaults.enable_telemetry),
        log_level: loaded.log_level.or(defaults.log_level),
        enable_tls: loaded.enable_tls.or(defaults.enable_tls),
        tls_cert_path: loaded.tls_cert_path.or(defaults.tls_cert_path),
        tls_key_path: loaded.tls_key_path.or(defaults.tls_key_path),
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

pub fn render_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}
