//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("smartprom.yaml"));

    let content = match format {
        ConfigFormat::Yaml if commented => add_config_comments(render_config(&config, format)?),
        _ => render_config(&config, format)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# smartprom-exporter Configuration
# ================================
#
# Server Configuration
# --------------------
# bind: "0.0.0.0"              # Bind IP (0.0.0.0 = all interfaces)
# port: 9902                   # HTTP port (env: PORT)
#
# Polling
# -------
# scan_every_seconds: 20       # Seconds between sweeps (env: SCAN_EVERY_SECONDS)
# sleep_seconds: 0.1           # Scheduler sleep granularity (env: SLEEP_SECONDS)
# rescan_devices_seconds: 0    # Re-run discovery every N seconds (0 = startup only)
# smartctl_path: "smartctl"    # smartctl binary, looked up on PATH
# parallelism: null            # Devices polled concurrently (null = auto, 1 = sequential)
#
# Feature Flags
# -------------
# enable_health: true          # Enable /health endpoint
# enable_telemetry: true       # Enable smartprom_exporter_* metrics
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace (env: LOGLEVEL)
#
# TLS/SSL Configuration
# ---------------------
# enable_tls: false            # Enable HTTPS (default: false)
# tls_cert_path: null          # Path to TLS certificate (PEM format)
# tls_key_path: null           # Path to TLS private key (PEM format)
"#;

    format!("{comments}\n{yaml}")
}
