//! Metrics endpoint handler for Prometheus scraping.
//!
//! Scrapes never trigger smartctl: they encode whatever the poll scheduler
//! last wrote into the registry.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Error type for metrics endpoint failures.
#[derive(Debug)]
pub enum MetricsError {
    EncodingFailed,
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics",
        )
            .into_response()
    }
}

/// Handler for the /metrics endpoint.
#[instrument(skip(state))]
pub async fn metrics_handler(State(state): State<SharedState>) -> Result<String, MetricsError> {
    let start = Instant::now();
    debug!("Processing /metrics request");

    state.health_stats.record_http_request();
    state.health_stats.record_metrics_endpoint_call();

    let body = state.registry.render().map_err(|e| {
        error!("Failed to encode Prometheus metrics: {}", e);
        MetricsError::EncodingFailed
    })?;

    // Exposed by the next scrape
    let elapsed = start.elapsed().as_secs_f64();
    if let Some(telemetry) = &state.telemetry {
        telemetry.scrape_duration.set(elapsed);
    }

    debug!(
        "Metrics request completed: {} gauges, {} bytes, {:.3}ms",
        state.registry.len(),
        body.len(),
        elapsed * 1000.0
    );

    Ok(body)
}
