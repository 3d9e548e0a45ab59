//! SCSI extractor.
//!
//! SCSI devices report a loosely structured JSON document. Top-level
//! integers are kept as-is; top-level objects are descended once and their
//! integer members emitted as `outer_inner`. Everything else is dropped.

use serde_json::Value;

use super::{json_integer, Attributes, Observation};
use crate::discovery::Device;
use crate::error::SmartError;
use crate::smartctl::SmartctlRunner;

pub fn extract(runner: &dyn SmartctlRunner, device: &Device) -> Result<Attributes, SmartError> {
    let output = runner.run(&["-A", "-d", "scsi", "--json=c", &device.path])?;
    parse(&device.path, &output)
}

pub fn parse(device: &str, output: &str) -> Result<Attributes, SmartError> {
    let document: Value = serde_json::from_str(output)?;
    let fields = document
        .as_object()
        .ok_or_else(|| SmartError::malformed(device, "document is not a JSON object"))?;

    let mut attributes = Attributes::new();

    for (key, value) in fields {
        match value {
            Value::Object(nested) => {
                for (inner, inner_value) in nested {
                    if let Some(v) = json_integer(inner_value) {
                        attributes.insert(format!("{}_{}", key, inner), Observation::new(v));
                    }
                }
            }
            other => {
                if let Some(v) = json_integer(other) {
                    attributes.insert(key.clone(), Observation::new(v));
                }
            }
        }
    }

    Ok(attributes)
}
