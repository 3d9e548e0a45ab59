//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use tracing::{debug, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");
    state.health_stats.record_http_request();

    let version = env!("CARGO_PKG_VERSION");

    let uptime_secs = state.start_time.elapsed().as_secs();
    let uptime_str = format!(
        "{}h {}m {}s",
        uptime_secs / 3600,
        (uptime_secs % 3600) / 60,
        uptime_secs % 60
    );
    let gauges = state.registry.len();

    let mut endpoints = String::from(
        r#"        <li><a href="/metrics">/metrics</a> - Prometheus-compatible metrics endpoint</li>
"#,
    );
    if state.config.enable_health.unwrap_or(true) {
        endpoints.push_str(
            r#"        <li><a href="/health">/health</a> - Sweep statistics (text)</li>
"#,
        );
    }
    endpoints.push_str(
        r#"        <li><a href="/config">/config</a> - Active runtime configuration (read-only)</li>
"#,
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>smartprom-exporter</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; }}
        .info {{ background: #e9ecef; padding: 10px 15px; border-radius: 4px; }}
        .footer {{ margin-top: 30px; color: #666; font-size: 0.9em; }}
    </style>
</head>
<body>
    <h1>smartprom-exporter</h1>
    <p class="info">Version {version} &middot; Uptime {uptime} &middot; {gauges} attribute gauges</p>
    <ul>
{endpoints}    </ul>
    <p class="footer">{footer}</p>
</body>
</html>"#,
        version = version,
        uptime = uptime_str,
        gauges = gauges,
        endpoints = endpoints,
        footer = FOOTER_TEXT
    );

    Html(html)
}
