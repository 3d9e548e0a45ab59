//! ATA/SATA attribute table extractor.
//!
//! Parses the plain-text output of `smartctl -A -d sat <dev>`:
//!
//! ```text
//! ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
//!   9 Power_On_Hours          0x0032   100   100   000    Old_age   Always       -       12345
//! ```
//!
//! Every row yields `name -> (id, VALUE)` and, when the tenth column is an
//! integer, `name_raw -> (id, RAW_VALUE)`.

use tracing::debug;

use super::{Attributes, Observation};
use crate::discovery::Device;
use crate::error::SmartError;
use crate::smartctl::SmartctlRunner;

/// Column header that precedes the attribute rows.
pub const HEADER: &str =
    "ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE";

const ID_COLUMN: usize = 0;
const NAME_COLUMN: usize = 1;
const VALUE_COLUMN: usize = 3;
const RAW_COLUMN: usize = 9;

pub fn extract(runner: &dyn SmartctlRunner, device: &Device) -> Result<Attributes, SmartError> {
    let output = runner.run(&["-A", "-d", &device.driver, &device.path])?;
    parse(&device.path, &output)
}

/// Parses the attribute table. Fails only when the header is missing.
pub fn parse(device: &str, output: &str) -> Result<Attributes, SmartError> {
    let mut attributes = Attributes::new();
    let mut got_header = false;

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if !got_header {
            got_header = line == HEADER;
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() <= VALUE_COLUMN {
            continue;
        }

        let (id, value) = match (
            tokens[ID_COLUMN].parse::<u32>(),
            tokens[VALUE_COLUMN].parse::<i128>(),
        ) {
            (Ok(id), Ok(value)) => (id, value),
            _ => {
                debug!("{}: skipping unparsable attribute row: {}", device, line);
                continue;
            }
        };
        let name = tokens[NAME_COLUMN];

        attributes.insert(name.to_string(), Observation::with_id(id, value));

        if let Some(raw) = tokens.get(RAW_COLUMN).and_then(|t| t.parse::<i128>().ok()) {
            attributes.insert(format!("{}_raw", name), Observation::with_id(id, raw));
        }
    }

    if !got_header {
        return Err(SmartError::malformed(
            device,
            "attribute table header not found",
        ));
    }

    Ok(attributes)
}
