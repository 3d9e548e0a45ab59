//! NVMe SMART/health information log extractor.

use serde_json::Value;
use tracing::debug;

use super::{json_integer, Attributes, Observation};
use crate::discovery::Device;
use crate::error::SmartError;
use crate::smartctl::SmartctlRunner;

const HEALTH_LOG: &str = "nvme_smart_health_information_log";
const TEMPERATURE_SENSORS: &str = "temperature_sensors";

pub fn extract(runner: &dyn SmartctlRunner, device: &Device) -> Result<Attributes, SmartError> {
    let output = runner.run(&["-A", "-d", "nvme", "--json=c", &device.path])?;
    parse(&device.path, &output)
}

/// Flattens the health log one level. `temperature_sensors: [a, b]` becomes
/// `temperature_sensor1 = a`, `temperature_sensor2 = b`.
pub fn parse(device: &str, output: &str) -> Result<Attributes, SmartError> {
    let document: Value = serde_json::from_str(output)?;
    let log = document
        .get(HEALTH_LOG)
        .and_then(Value::as_object)
        .ok_or_else(|| SmartError::malformed(device, format!("missing {}", HEALTH_LOG)))?;

    let mut attributes = Attributes::new();

    for (key, value) in log {
        if key == TEMPERATURE_SENSORS {
            let sensors = value.as_array().map(Vec::as_slice).unwrap_or_default();
            for (i, sensor) in sensors.iter().enumerate() {
                if let Some(v) = json_integer(sensor) {
                    attributes.insert(format!("temperature_sensor{}", i + 1), Observation::new(v));
                }
            }
            continue;
        }

        match json_integer(value) {
            Some(v) => {
                attributes.insert(key.clone(), Observation::new(v));
            }
            None => debug!("{}: ignoring non-integer health field {}", device, key),
        }
    }

    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTH: &str = r#"{
        "json_format_version": [1, 0],
        "smartctl": {"version": [7, 3], "exit_status": 0},
        "device": {"name": "/dev/nvme0", "type": "nvme", "protocol": "NVMe"},
        "nvme_smart_health_information_log": {
            "critical_warning": 0,
            "temperature": 305,
            "available_spare": 100,
            "available_spare_threshold": 10,
            "percentage_used": 3,
            "data_units_read": 18446744073709551615,
            "data_units_written": 23456789,
            "power_on_hours": 8760,
            "unsafe_shutdowns": 42,
            "temperature_sensors": [305, 310]
        },
        "temperature": {"current": 32}
    }"#;

    #[test]
    fn test_temperature_sensors_are_expanded() {
        let attrs = parse("/dev/nvme0", HEALTH).unwrap();

        assert_eq!(attrs["temperature"].value, 305);
        assert_eq!(attrs["temperature_sensor1"].value, 305);
        assert_eq!(attrs["temperature_sensor2"].value, 310);
        assert!(!attrs.contains_key("temperature_sensors"));
        assert!(!attrs.contains_key("temperature_sensor3"));
    }

    #[test]
    fn test_only_health_log_is_read() {
        let attrs = parse("/dev/nvme0", HEALTH).unwrap();

        assert_eq!(attrs.len(), 11);
        assert!(!attrs.contains_key("smartctl_exit_status"));
        assert_eq!(attrs["data_units_read"].value, u64::MAX as i128);
        assert!(attrs.values().all(|o| o.id.is_none()));
    }

    #[test]
    fn test_missing_health_log_is_malformed() {
        let result = parse("/dev/nvme0", r#"{"smartctl": {"exit_status": 0}}"#);
        assert!(matches!(result, Err(SmartError::MalformedOutput { .. })));
    }
}
