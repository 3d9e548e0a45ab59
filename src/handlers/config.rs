//! Configuration display endpoint handler.
//!
//! This module provides the `/config` endpoint handler that displays
//! the current exporter configuration.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::config::{
    DEFAULT_BIND_ADDR, DEFAULT_PORT, DEFAULT_SCAN_EVERY_SECONDS, DEFAULT_SLEEP_SECONDS,
};
use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /config endpoint.
#[instrument(skip(state))]
pub async fn config_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /config request");
    state.health_stats.record_http_request();

    let cfg = &state.config;
    let mut out = String::new();

    writeln!(out, "SMARTPROM EXPORTER - CONFIGURATION").ok();
    writeln!(out, "==================================").ok();
    writeln!(out).ok();

    writeln!(out, "SERVER CONFIGURATION").ok();
    writeln!(out, "--------------------").ok();
    writeln!(
        out,
        "bind:                       {}",
        cfg.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    )
    .ok();
    writeln!(
        out,
        "port:                       {}",
        cfg.port.unwrap_or(DEFAULT_PORT)
    )
    .ok();
    writeln!(
        out,
        "enable_tls:                 {}",
        cfg.enable_tls.unwrap_or(false)
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "POLLING").ok();
    writeln!(out, "-------").ok();
    writeln!(
        out,
        "scan_every_seconds:         {}",
        cfg.scan_every_seconds.unwrap_or(DEFAULT_SCAN_EVERY_SECONDS)
    )
    .ok();
    writeln!(
        out,
        "sleep_seconds:              {}",
        cfg.sleep_seconds.unwrap_or(DEFAULT_SLEEP_SECONDS)
    )
    .ok();
    match cfg.rescan_devices_seconds {
        Some(s) if s > 0.0 => writeln!(out, "rescan_devices_seconds:     {}", s).ok(),
        _ => writeln!(out, "rescan_devices_seconds:     disabled").ok(),
    };
    writeln!(
        out,
        "smartctl_path:              {}",
        cfg.smartctl_path().display()
    )
    .ok();
    writeln!(
        out,
        "parallelism:                {}",
        cfg.parallelism
            .map(|p| p.to_string())
            .unwrap_or_else(|| "auto".to_string())
    )
    .ok();
    writeln!(out).ok();

    writeln!(out, "FEATURE FLAGS").ok();
    writeln!(out, "-------------").ok();
    writeln!(
        out,
        "enable_health:              {}",
        cfg.enable_health.unwrap_or(true)
    )
    .ok();
    writeln!(
        out,
        "enable_telemetry:           {}",
        cfg.enable_telemetry.unwrap_or(true)
    )
    .ok();
    writeln!(out).ok();
    writeln!(out, "{}", FOOTER_TEXT).ok();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        out,
    )
}
