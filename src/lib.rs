//! smartprom-exporter library
//!
//! Reads S.M.A.R.T. data through `smartctl` and republishes it as
//! dynamically created Prometheus gauges labeled by drive.
//!
//! # Components
//!
//! - **smartctl**: runs the external tool ([`SmartctlRunner`])
//! - **discovery**: `smartctl --scan-open` -> device path / protocol map
//! - **extractors**: ATA table, NVMe health log and SCSI JSON parsers
//! - **registry**: gauges created on first sight of an attribute key
//! - **scheduler**: periodic sweep over all devices with per-device isolation
//!
//! # Usage
//!
//! ```rust,no_run
//! use smartprom_exporter::{discover, sweep, MetricRegistry, Smartctl};
//!
//! let smartctl = Smartctl::default();
//! let devices = discover(&smartctl).unwrap_or_default();
//! let registry = MetricRegistry::default();
//!
//! let report = sweep(&smartctl, &devices, &registry);
//! println!("{} devices ok, {} failed", report.succeeded, report.failed);
//! print!("{}", registry.render().unwrap());
//! ```

pub mod discovery;
pub mod error;
pub mod extractors;
pub mod health_stats;
pub mod registry;
pub mod scheduler;
pub mod smartctl;
pub mod telemetry;

// Re-export main types for convenience
pub use discovery::{discover, Device, DeviceProtocol, Devices};
pub use error::SmartError;
pub use extractors::{extract, Attributes, Observation};
pub use health_stats::HealthStats;
pub use registry::MetricRegistry;
pub use scheduler::{
    sweep, sweep_collecting, PollScheduler, SchedulerConfig, SchedulerState, SweepReport,
};
pub use smartctl::{Smartctl, SmartctlRunner};
pub use telemetry::ExporterTelemetry;
