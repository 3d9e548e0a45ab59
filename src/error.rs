//! Error types for smartctl invocation and output parsing.

use std::io;

/// Errors raised while talking to smartctl or interpreting its output.
///
/// Every variant is recoverable: discovery turns them into an empty device
/// set and the poll scheduler isolates them to the device that produced them.
#[derive(Debug, thiserror::Error)]
pub enum SmartError {
    /// smartctl exited with a non-zero status (or was killed by a signal).
    #[error("Command \"{command}\" returned code {}", exit_code(.code))]
    ExternalTool { command: String, code: Option<i32> },

    #[error("Failed to execute \"{command}\": {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Output was readable but lacked the structure we expect.
    #[error("Malformed smartctl output for {device}: {reason}")]
    MalformedOutput { device: String, reason: String },

    #[error("Invalid JSON from smartctl: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported device type: name={device}, type={driver}")]
    UnsupportedProtocol { device: String, driver: String },
}

fn exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl SmartError {
    pub(crate) fn malformed(device: &str, reason: impl Into<String>) -> Self {
        SmartError::MalformedOutput {
            device: device.to_string(),
            reason: reason.into(),
        }
    }
}
