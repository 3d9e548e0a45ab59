//! Startup requirement validation for smartprom-exporter.
//!
//! This module validates that the exporter has the privileges and the
//! smartctl binary it needs before starting.

use nix::unistd::geteuid;
use std::path::Path;
use std::process::Command;
use tracing::{debug, error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(smartctl: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    let version = check_smartctl(smartctl)?;
    info!("✅ smartctl available: {}", version);

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
pub fn check_user_privileges() -> bool {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - smartctl may not be able to open devices");
        warn!("   Recommendation: Run as root or grant CAP_SYS_RAWIO");
        // Not an error - continue but warn
        false
    } else {
        info!("✅ Running as root (uid=0)");
        true
    }
}

/// Runs `smartctl --version` and returns its first output line.
pub fn check_smartctl(smartctl: &Path) -> Result<String, ValidationError> {
    debug!("Checking smartctl at {}", smartctl.display());

    let output = Command::new(smartctl)
        .arg("--version")
        .output()
        .map_err(|e| {
            error!("❌ Cannot execute {}: {}", smartctl.display(), e);
            error!("   Solution: install smartmontools or set smartctl_path");
            ValidationError::SmartctlMissing(format!("{}: {}", smartctl.display(), e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("❌ {} --version failed: {}", smartctl.display(), stderr.trim());
        return Err(ValidationError::SmartctlFailed(stderr.trim().to_string()));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .next()
        .unwrap_or("unknown version")
        .trim()
        .to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("smartctl not executable: {0}")]
    SmartctlMissing(String),

    #[error("smartctl --version failed: {0}")]
    SmartctlFailed(String),
}
