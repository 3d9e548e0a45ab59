//! Dynamic gauge registry.
//!
//! Gauges are not declared up front: the first time a normalized attribute
//! key is observed on any device, a `GaugeVec` with a single `drive` label is
//! created and registered. Later observations from any device reuse it.
//! Entries are never removed; a device that stops reporting a key keeps its
//! last value until it reports again.

use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, info};

use crate::extractors::Observation;

/// Namespace prefix of every attribute gauge.
pub const METRIC_PREFIX: &str = "smartprom";

/// The single label dimension of attribute gauges.
pub const DRIVE_LABEL: &str = "drive";

const DEVICE_DIR: &str = "/dev/";

/// Derives the metric name for an attribute key.
///
/// `-`, space and `/` become `_`, `.` is removed, the result is lowercased
/// and prefixed with `smartprom_`.
pub fn metric_name(key: &str) -> String {
    let mut name = String::with_capacity(METRIC_PREFIX.len() + 1 + key.len());
    name.push_str(METRIC_PREFIX);
    name.push('_');
    for c in key.chars() {
        match c {
            '-' | ' ' | '/' => name.push('_'),
            '.' => {}
            c => name.extend(c.to_lowercase()),
        }
    }
    name
}

/// Help text of a new gauge: `(0x131) temperature`.
///
/// The hex number is the first observation seen for the key (the attribute
/// ID for ATA rows). It is fixed at creation and kept for output
/// compatibility with existing dashboards.
pub fn help_text(key: &str, first: &Observation) -> String {
    format!("({}) {}", hex(first.representative()), key.replace('_', " "))
}

/// Label value for a device path: `/dev/sda` -> `sda`.
pub fn drive_label(device_path: &str) -> &str {
    device_path.strip_prefix(DEVICE_DIR).unwrap_or(device_path)
}

fn hex(value: i128) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{:#x}", value)
    }
}

/// Process-wide registry of attribute gauges, keyed by metric name.
pub struct MetricRegistry {
    registry: Registry,
    gauges: DashMap<String, GaugeVec, RandomState>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl MetricRegistry {
    /// Wraps a Prometheus registry. Other collectors (exporter telemetry)
    /// may be registered in the same registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            gauges: DashMap::with_hasher(RandomState::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Records `observation` for `key` on the given device.
    ///
    /// The gauge is created at most once per metric name, even when several
    /// devices report the same key concurrently: creation and registration
    /// happen while the map entry is locked.
    pub fn observe(
        &self,
        key: &str,
        observation: Observation,
        device_path: &str,
    ) -> Result<(), prometheus::Error> {
        let gauge = match self.gauges.entry(metric_name(key)) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let help = help_text(key, &observation);
                let gauge = GaugeVec::new(Opts::new(entry.key().clone(), help), &[DRIVE_LABEL])?;
                self.registry.register(Box::new(gauge.clone()))?;
                info!(
                    "Adding new gauge {} ({})",
                    entry.key(),
                    hex(observation.representative())
                );
                entry.insert(gauge.clone());
                gauge
            }
        };

        let drive = drive_label(device_path);
        debug!("{}{{drive=\"{}\"}} = {}", key, drive, observation.value);
        gauge
            .with_label_values(&[drive])
            .set(observation.value as f64);
        Ok(())
    }

    /// Number of attribute gauges created so far.
    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    /// Names of all attribute gauges, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gauges.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Encodes everything in the underlying registry in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_sanitization() {
        assert_eq!(metric_name("Power_On_Hours"), "smartprom_power_on_hours");
        assert_eq!(metric_name("Power_On_Hours_raw"), "smartprom_power_on_hours_raw");
        assert_eq!(
            metric_name("Wear-Leveling Count/x.y"),
            "smartprom_wear_leveling_count_xy"
        );
        assert_eq!(metric_name("temperature_sensor1"), "smartprom_temperature_sensor1");
    }

    #[test]
    fn test_metric_name_is_deterministic() {
        let key = "Total_LBAs_Written";
        assert_eq!(metric_name(key), metric_name(key));
    }

    #[test]
    fn test_help_text_hex() {
        assert_eq!(
            help_text("Power_On_Hours_raw", &Observation::with_id(9, 12345)),
            "(0x9) Power On Hours raw"
        );
        assert_eq!(
            help_text("temperature", &Observation::new(305)),
            "(0x131) temperature"
        );
        assert_eq!(help_text("offset", &Observation::new(-5)), "(-0x5) offset");
    }

    #[test]
    fn test_drive_label() {
        assert_eq!(drive_label("/dev/sda"), "sda");
        assert_eq!(drive_label("/dev/bus/0"), "bus/0");
        assert_eq!(drive_label("sdb"), "sdb");
    }

    #[test]
    fn test_observe_creates_once_and_updates() {
        let registry = MetricRegistry::default();

        registry
            .observe("temperature", Observation::new(305), "/dev/nvme0")
            .unwrap();
        registry
            .observe("temperature", Observation::new(300), "/dev/nvme0")
            .unwrap();
        registry
            .observe("temperature", Observation::new(299), "/dev/nvme1")
            .unwrap();

        assert_eq!(registry.len(), 1);
        let text = registry.render().unwrap();
        assert!(text.contains("# HELP smartprom_temperature (0x131) temperature"));
        assert!(text.contains("smartprom_temperature{drive=\"nvme0\"} 300"));
        assert!(text.contains("smartprom_temperature{drive=\"nvme1\"} 299"));
    }

    #[test]
    fn test_help_text_is_fixed_at_creation() {
        let registry = MetricRegistry::default();
        registry
            .observe("Power_On_Hours", Observation::with_id(9, 100), "/dev/sda")
            .unwrap();
        registry
            .observe("Power_On_Hours", Observation::with_id(12, 99), "/dev/sdb")
            .unwrap();

        let text = registry.render().unwrap();
        assert!(text.contains("(0x9) Power On Hours"));
        assert!(!text.contains("(0xc)"));
    }

    #[test]
    fn test_keys_with_same_name_share_a_gauge() {
        let registry = MetricRegistry::default();
        registry
            .observe("Power-On", Observation::new(1), "/dev/sda")
            .unwrap();
        registry
            .observe("Power_On", Observation::new(2), "/dev/sdb")
            .unwrap();

        assert_eq!(registry.metric_names(), vec!["smartprom_power_on".to_string()]);
    }

    #[test]
    fn test_invalid_name_is_an_error() {
        let registry = MetricRegistry::default();
        let result = registry.observe("Unknown(Attr)", Observation::new(1), "/dev/sda");
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
