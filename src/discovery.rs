//! Device discovery through `smartctl --scan-open`.
//!
//! Produces a stable mapping from device path to [`Device`]. Devices that
//! smartctl reports with an `open_error` are excluded and never reach the
//! poll scheduler, so they never show up as a metric label.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::error::SmartError;
use crate::smartctl::SmartctlRunner;

/// Arguments for the scan invocation (JSON, compact).
pub const SCAN_ARGS: [&str; 2] = ["--scan-open", "--json=c"];

/// Protocol family of a device, selected from the scan's `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceProtocol {
    Ata,
    Nvme,
    Scsi,
    Unsupported(String),
}

impl DeviceProtocol {
    pub fn from_driver(driver: &str) -> Self {
        match driver {
            "sat" | "ata" => DeviceProtocol::Ata,
            "nvme" => DeviceProtocol::Nvme,
            "scsi" => DeviceProtocol::Scsi,
            other => DeviceProtocol::Unsupported(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProtocol::Ata => write!(f, "ata"),
            DeviceProtocol::Nvme => write!(f, "nvme"),
            DeviceProtocol::Scsi => write!(f, "scsi"),
            DeviceProtocol::Unsupported(driver) => write!(f, "unsupported({})", driver),
        }
    }
}

/// A disk reported by the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device path, e.g. `/dev/sda`.
    pub path: String,
    /// smartctl device type, passed back as `-d <driver>`.
    pub driver: String,
    pub protocol: DeviceProtocol,
}

impl Device {
    pub fn new(path: impl Into<String>, driver: impl Into<String>) -> Self {
        let driver = driver.into();
        Self {
            path: path.into(),
            protocol: DeviceProtocol::from_driver(&driver),
            driver,
        }
    }
}

/// Discovered devices keyed by path.
pub type Devices = BTreeMap<String, Device>;

#[derive(Debug, Deserialize)]
struct ScanOutput {
    #[serde(default)]
    devices: Vec<ScanEntry>,
}

#[derive(Debug, Deserialize)]
struct ScanEntry {
    name: Option<String>,
    #[serde(rename = "type")]
    driver: Option<String>,
    protocol: Option<String>,
    open_error: Option<String>,
}

/// Runs the scan and returns the accessible devices.
#[instrument(skip(runner))]
pub fn discover(runner: &dyn SmartctlRunner) -> Result<Devices, SmartError> {
    let output = runner.run(&SCAN_ARGS)?;
    let devices = parse_scan(&output)?;

    debug!(
        "Devices and their types: {:?}",
        devices
            .values()
            .map(|d| (d.path.as_str(), d.driver.as_str()))
            .collect::<Vec<_>>()
    );

    if devices.is_empty() {
        warn!(
            "No devices added, check permissions - smartprom-exporter must run as 'root' \
             or, in a container, as 'privileged'."
        );
    }

    Ok(devices)
}

/// Parses `smartctl --scan-open --json=c` output.
pub fn parse_scan(output: &str) -> Result<Devices, SmartError> {
    let scan: ScanOutput = serde_json::from_str(output)?;
    let mut devices = Devices::new();

    for entry in scan.devices {
        let name = entry.name.as_deref().unwrap_or("unknown");
        let driver = entry.driver.as_deref().unwrap_or("unknown");

        if let Some(open_error) = &entry.open_error {
            warn!(
                "Skipping device name={}, type={}, protocol={}, open_error={}",
                name,
                driver,
                entry.protocol.as_deref().unwrap_or("unknown"),
                open_error
            );
            continue;
        }

        match (&entry.name, &entry.driver) {
            (Some(name), Some(driver)) => {
                devices.insert(name.clone(), Device::new(name.clone(), driver.clone()));
            }
            _ => {
                warn!(
                    "Skipping scan entry without name or type: name={}, type={}",
                    name, driver
                );
            }
        }
    }

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN: &str = r#"{
        "json_format_version": [1, 0],
        "devices": [
            {"name": "/dev/sda", "info_name": "/dev/sda [SAT]", "type": "sat", "protocol": "ATA"},
            {"name": "/dev/nvme0", "info_name": "/dev/nvme0", "type": "nvme", "protocol": "NVMe"},
            {"name": "/dev/sdb", "info_name": "/dev/sdb", "type": "scsi", "protocol": "SCSI",
             "open_error": "INQUIRY failed"},
            {"name": "/dev/bus/0", "info_name": "/dev/bus/0 [megaraid_disk_00]", "type": "megaraid,0", "protocol": "SCSI"}
        ]
    }"#;

    #[test]
    fn test_parse_scan_excludes_open_errors() {
        let devices = parse_scan(SCAN).unwrap();

        assert_eq!(devices.len(), 3);
        assert!(!devices.contains_key("/dev/sdb"));
        assert_eq!(devices["/dev/sda"].protocol, DeviceProtocol::Ata);
        assert_eq!(devices["/dev/nvme0"].protocol, DeviceProtocol::Nvme);
        assert_eq!(
            devices["/dev/bus/0"].protocol,
            DeviceProtocol::Unsupported("megaraid,0".to_string())
        );
    }

    #[test]
    fn test_parse_scan_without_devices_is_empty() {
        let devices = parse_scan(r#"{"json_format_version": [1, 0]}"#).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_parse_scan_rejects_invalid_json() {
        assert!(matches!(parse_scan("not json"), Err(SmartError::Json(_))));
    }

    #[test]
    fn test_protocol_mapping() {
        assert_eq!(DeviceProtocol::from_driver("sat"), DeviceProtocol::Ata);
        assert_eq!(DeviceProtocol::from_driver("ata"), DeviceProtocol::Ata);
        assert_eq!(DeviceProtocol::from_driver("scsi"), DeviceProtocol::Scsi);
        assert_eq!(DeviceProtocol::Nvme.to_string(), "nvme");
    }
}
