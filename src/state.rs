//! Application state management for the exporter.
//!
//! This module defines the shared application state that is passed
//! to HTTP handlers. The poll scheduler holds clones of the same registry
//! and statistics.

use smartprom_exporter::{ExporterTelemetry, HealthStats, MetricRegistry};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests.
pub struct AppState {
    pub registry: Arc<MetricRegistry>,
    pub telemetry: Option<ExporterTelemetry>,
    pub config: Arc<Config>,
    pub health_stats: Arc<HealthStats>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}
