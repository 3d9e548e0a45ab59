//! Protocol extractors.
//!
//! Each protocol family has its own smartctl invocation and output shape.
//! The extractors turn that output into one normalized [`Attributes`] map:
//! attribute key -> [`Observation`].
//!
//! - `ata`: fixed-width attribute table (plain text)
//! - `nvme`: `nvme_smart_health_information_log` JSON object
//! - `scsi`: top-level JSON document, flattened one level

pub mod ata;
pub mod nvme;
pub mod scsi;

use serde_json::Value;
use std::collections::BTreeMap;

use crate::discovery::{Device, DeviceProtocol};
use crate::error::SmartError;
use crate::smartctl::SmartctlRunner;

/// A single numeric reading for one attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// ATA attribute number. Only the tabular format carries one.
    pub id: Option<u32>,
    pub value: i128,
}

impl Observation {
    pub fn new(value: i128) -> Self {
        Self { id: None, value }
    }

    pub fn with_id(id: u32, value: i128) -> Self {
        Self {
            id: Some(id),
            value,
        }
    }

    /// Number rendered into a new metric's help text.
    pub fn representative(&self) -> i128 {
        self.id.map_or(self.value, i128::from)
    }
}

/// Normalized attributes of one device, keyed by attribute name.
pub type Attributes = BTreeMap<String, Observation>;

/// Runs the extractor matching the device's protocol.
pub fn extract(runner: &dyn SmartctlRunner, device: &Device) -> Result<Attributes, SmartError> {
    match &device.protocol {
        DeviceProtocol::Ata => ata::extract(runner, device),
        DeviceProtocol::Nvme => nvme::extract(runner, device),
        DeviceProtocol::Scsi => scsi::extract(runner, device),
        DeviceProtocol::Unsupported(driver) => Err(SmartError::UnsupportedProtocol {
            device: device.path.clone(),
            driver: driver.clone(),
        }),
    }
}

/// Integer view of a JSON value. Floats, booleans and strings are not.
pub(crate) fn json_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
}
