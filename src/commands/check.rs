//! Check command implementation.
//!
//! Validates smartctl, privileges, configuration and device discovery.

use smartprom_exporter::{discover, DeviceProtocol, Smartctl};

use crate::config::{validate_effective_config, Config};
use crate::startup_checks::{check_smartctl, check_user_privileges};

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 smartprom-exporter - System Check");
    println!("====================================");

    let mut all_ok = true;
    let smartctl_path = config.smartctl_path();

    println!("\n🔐 Checking privileges...");
    if check_user_privileges() {
        println!("   ✅ Running as root");
    } else {
        println!("   ⚠️  Not running as root - devices may fail to open");
    }

    println!("\n🛠️  Checking smartctl...");
    let smartctl_ok = match check_smartctl(&smartctl_path) {
        Ok(version) => {
            println!("   ✅ {}", version);
            true
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
            false
        }
    };

    if smartctl_ok {
        println!("\n💽 Discovering devices...");
        let smartctl = Smartctl::new(smartctl_path);
        match discover(&smartctl) {
            Ok(devices) if devices.is_empty() => {
                println!("   ⚠️  smartctl --scan-open found no devices");
            }
            Ok(devices) => {
                println!("   ✅ {} device(s) found", devices.len());
                for device in devices.values() {
                    let marker = match device.protocol {
                        DeviceProtocol::Unsupported(_) => "⏭️ ",
                        _ => "├─",
                    };
                    println!(
                        "   {} {:<20} driver={:<10} protocol={}",
                        marker, device.path, device.driver, device.protocol
                    );
                }
            }
            Err(e) => {
                println!("   ❌ Discovery failed: {}", e);
                all_ok = false;
            }
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
