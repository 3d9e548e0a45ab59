//! Exporter self-metrics.
//!
//! Static gauges describing the exporter itself, registered next to the
//! dynamic attribute gauges.

use prometheus::{Gauge, Registry};

#[derive(Clone)]
pub struct ExporterTelemetry {
    pub scrape_duration: Gauge,
    pub sweep_duration: Gauge,
    pub devices: Gauge,
    pub sweep_failed_devices: Gauge,
}

impl ExporterTelemetry {
    /// Creates and registers all telemetry gauges with the registry.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let scrape_duration = Gauge::new(
            "smartprom_exporter_scrape_duration_seconds",
            "Time spent serving the last /metrics request",
        )?;
        let sweep_duration = Gauge::new(
            "smartprom_exporter_sweep_duration_seconds",
            "Time spent polling all devices in the last sweep",
        )?;
        let devices = Gauge::new(
            "smartprom_exporter_devices",
            "Number of devices currently polled",
        )?;
        let sweep_failed_devices = Gauge::new(
            "smartprom_exporter_sweep_failed_devices",
            "Number of devices whose extraction failed in the last sweep",
        )?;

        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(sweep_duration.clone()))?;
        registry.register(Box::new(devices.clone()))?;
        registry.register(Box::new(sweep_failed_devices.clone()))?;

        Ok(Self {
            scrape_duration,
            sweep_duration,
            devices,
            sweep_failed_devices,
        })
    }
}
