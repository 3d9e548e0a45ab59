//! smartctl process invocation.
//!
//! All interaction with the external tool goes through the [`SmartctlRunner`]
//! trait so discovery, extractors and the scheduler can be exercised with
//! canned output in tests.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error};

use crate::error::SmartError;

/// Default smartctl binary, resolved through `PATH`.
pub const DEFAULT_SMARTCTL: &str = "smartctl";

/// Runs smartctl with the given arguments and returns its standard output.
pub trait SmartctlRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String, SmartError>;
}

/// Runner backed by a real smartctl process.
#[derive(Debug, Clone)]
pub struct Smartctl {
    binary: PathBuf,
}

impl Default for Smartctl {
    fn default() -> Self {
        Self::new(DEFAULT_SMARTCTL)
    }
}

impl Smartctl {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command_line(&self, args: &[&str]) -> String {
        let mut line = self.binary.display().to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

impl SmartctlRunner for Smartctl {
    fn run(&self, args: &[&str]) -> Result<String, SmartError> {
        let command = self.command_line(args);
        debug!("Running {}", command);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| SmartError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            // smartctl reports most failures on stdout, so fall back to it.
            let diagnostics = if output.stderr.is_empty() {
                String::from_utf8_lossy(&output.stdout)
            } else {
                String::from_utf8_lossy(&output.stderr)
            };
            let diagnostics = diagnostics.trim();
            if !diagnostics.is_empty() {
                error!("{}", diagnostics);
            }
            return Err(SmartError::ExternalTool {
                command,
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_rendering() {
        let smartctl = Smartctl::new("/usr/sbin/smartctl");
        assert_eq!(
            smartctl.command_line(&["-A", "-d", "sat", "/dev/sda"]),
            "/usr/sbin/smartctl -A -d sat /dev/sda"
        );
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let smartctl = Smartctl::new("/nonexistent/smartctl-for-tests");
        match smartctl.run(&["--scan-open"]) {
            Err(SmartError::Spawn { command, .. }) => {
                assert!(command.starts_with("/nonexistent/smartctl-for-tests"));
            }
            other => panic!("expected spawn error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_external_tool_error() {
        let runner = Smartctl::new("false");
        match runner.run(&[]) {
            Err(SmartError::ExternalTool { code, .. }) => assert_eq!(code, Some(1)),
            other => panic!("expected external tool error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success_returns_stdout() {
        let runner = Smartctl::new("echo");
        let out = runner.run(&["hello"]).expect("echo should succeed");
        assert_eq!(out.trim(), "hello");
    }
}
