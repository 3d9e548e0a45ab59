//! Poll scheduler.
//!
//! A two-state loop: `Idle` until the scan interval has elapsed since the
//! last scan started, then `Scanning` until every device has been attempted.
//! Failures are isolated per device; a failing device never stops the sweep
//! and is retried naturally on the next one.

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::discovery::{self, Device, DeviceProtocol, Devices};
use crate::extractors::{self, Attributes};
use crate::health_stats::HealthStats;
use crate::registry::MetricRegistry;
use crate::smartctl::SmartctlRunner;
use crate::telemetry::ExporterTelemetry;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_SLEEP_GRANULARITY: Duration = Duration::from_millis(100);

/// Timing of the scheduler loop.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub scan_interval: Duration,
    /// Sleep between checks for the next due scan.
    pub sleep_granularity: Duration,
    /// Re-run discovery at this period. `None` keeps the startup device set.
    pub rediscovery_interval: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval: DEFAULT_SCAN_INTERVAL,
            sleep_granularity: DEFAULT_SLEEP_GRANULARITY,
            rediscovery_interval: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scanning,
}

/// Result of polling a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOutcome {
    /// Extraction succeeded; number of attributes exported.
    Scanned(usize),
    Failed,
    /// Unsupported protocol, not polled.
    Skipped,
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub attributes: usize,
    pub duration: Duration,
}

/// Polls one device and feeds its attributes into the registry.
pub fn scan_device(
    runner: &dyn SmartctlRunner,
    device: &Device,
    registry: &MetricRegistry,
) -> DeviceOutcome {
    poll_device(runner, device, registry).0
}

/// Like [`scan_device`], also handing back what was extracted.
fn poll_device(
    runner: &dyn SmartctlRunner,
    device: &Device,
    registry: &MetricRegistry,
) -> (DeviceOutcome, Option<Attributes>) {
    if let DeviceProtocol::Unsupported(driver) = &device.protocol {
        warn!(
            "Unsupported device type: name={}, type={}",
            device.path, driver
        );
        return (DeviceOutcome::Skipped, None);
    }

    let attributes = match extractors::extract(runner, device) {
        Ok(attributes) => attributes,
        Err(e) => {
            error!("Failed to read attributes of {}: {}", device.path, e);
            return (DeviceOutcome::Failed, None);
        }
    };

    let mut exported = 0;
    for (key, observation) in &attributes {
        match registry.observe(key, *observation, &device.path) {
            Ok(()) => exported += 1,
            Err(e) => warn!(
                "Cannot export attribute {} of {}: {}",
                key, device.path, e
            ),
        }
    }
    debug!("{}: exported {} attributes", device.path, exported);
    (DeviceOutcome::Scanned(exported), Some(attributes))
}

fn tally(outcomes: impl IntoIterator<Item = DeviceOutcome>, start: Instant) -> SweepReport {
    let mut report = SweepReport::default();
    for outcome in outcomes {
        match outcome {
            DeviceOutcome::Scanned(n) => {
                report.succeeded += 1;
                report.attributes += n;
            }
            DeviceOutcome::Failed => report.failed += 1,
            DeviceOutcome::Skipped => report.skipped += 1,
        }
    }
    report.duration = start.elapsed();
    report
}

/// Polls every device once. Devices are scanned in parallel on the rayon
/// pool; registry updates are safe for concurrent writers.
#[instrument(skip_all, fields(devices = devices.len()))]
pub fn sweep(
    runner: &dyn SmartctlRunner,
    devices: &Devices,
    registry: &MetricRegistry,
) -> SweepReport {
    let start = Instant::now();

    let outcomes: Vec<DeviceOutcome> = devices
        .par_iter()
        .map(|(_, device)| scan_device(runner, device, registry))
        .collect();

    tally(outcomes, start)
}

/// Same as [`sweep`], and also returns the attributes of every device that
/// was read successfully, keyed by device path.
#[instrument(skip_all, fields(devices = devices.len()))]
pub fn sweep_collecting(
    runner: &dyn SmartctlRunner,
    devices: &Devices,
    registry: &MetricRegistry,
) -> (SweepReport, BTreeMap<String, Attributes>) {
    let start = Instant::now();

    let polled: Vec<(&String, (DeviceOutcome, Option<Attributes>))> = devices
        .par_iter()
        .map(|(path, device)| (path, poll_device(runner, device, registry)))
        .collect();

    let mut collected = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(polled.len());
    for (path, (outcome, attributes)) in polled {
        if let Some(attributes) = attributes {
            collected.insert(path.clone(), attributes);
        }
        outcomes.push(outcome);
    }

    (tally(outcomes, start), collected)
}

/// Owns the device set and drives all registry mutation.
pub struct PollScheduler {
    runner: Arc<dyn SmartctlRunner>,
    registry: Arc<MetricRegistry>,
    stats: Arc<HealthStats>,
    telemetry: Option<ExporterTelemetry>,
    devices: Arc<Devices>,
    config: SchedulerConfig,
    state: SchedulerState,
    last_scan_start: Option<Instant>,
    last_discovery: Instant,
}

impl PollScheduler {
    pub fn new(
        runner: Arc<dyn SmartctlRunner>,
        registry: Arc<MetricRegistry>,
        stats: Arc<HealthStats>,
        devices: Devices,
        config: SchedulerConfig,
    ) -> Self {
        stats.record_devices(devices.len() as u64);
        Self {
            runner,
            registry,
            stats,
            telemetry: None,
            devices: Arc::new(devices),
            config,
            state: SchedulerState::Idle,
            last_scan_start: None,
            last_discovery: Instant::now(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: ExporterTelemetry) -> Self {
        telemetry.devices.set(self.devices.len() as f64);
        self.telemetry = Some(telemetry);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    /// True when no scan has run yet or the scan interval has elapsed since
    /// the last scan started.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_scan_start {
            None => true,
            Some(start) => now.saturating_duration_since(start) >= self.config.scan_interval,
        }
    }

    fn rediscovery_due(&self, now: Instant) -> bool {
        self.config
            .rediscovery_interval
            .is_some_and(|every| now.saturating_duration_since(self.last_discovery) >= every)
    }

    fn begin_scan(&mut self, now: Instant) {
        self.state = SchedulerState::Scanning;
        self.last_scan_start = Some(now);
    }

    fn finish_scan(&mut self, report: &SweepReport) {
        self.state = SchedulerState::Idle;

        self.stats.record_sweep(
            report.succeeded as u64,
            report.failed as u64,
            report.attributes as u64,
            report.duration.as_secs_f64(),
        );
        self.stats.record_gauges(self.registry.len() as u64);

        if let Some(telemetry) = &self.telemetry {
            telemetry.sweep_duration.set(report.duration.as_secs_f64());
            telemetry.sweep_failed_devices.set(report.failed as f64);
        }

        info!(
            "Sweep completed: {} devices ok, {} failed, {} skipped, {} attributes, {:.2}ms",
            report.succeeded,
            report.failed,
            report.skipped,
            report.attributes,
            report.duration.as_secs_f64() * 1000.0
        );
    }

    fn replace_devices(&mut self, devices: Devices) {
        if devices.keys().ne(self.devices.keys()) {
            info!(
                "Device set changed: {} -> {} devices",
                self.devices.len(),
                devices.len()
            );
        }
        self.stats.record_devices(devices.len() as u64);
        if let Some(telemetry) = &self.telemetry {
            telemetry.devices.set(devices.len() as f64);
        }
        self.devices = Arc::new(devices);
    }

    /// Runs one sweep on the current thread.
    pub fn run_sweep(&mut self) -> SweepReport {
        self.begin_scan(Instant::now());
        let report = sweep(self.runner.as_ref(), &self.devices, &self.registry);
        self.finish_scan(&report);
        report
    }

    /// Re-runs discovery on the current thread. A failure keeps the
    /// previous device set.
    pub fn rediscover(&mut self) {
        self.last_discovery = Instant::now();
        match discovery::discover(self.runner.as_ref()) {
            Ok(devices) => self.replace_devices(devices),
            Err(e) => error!("Device re-discovery failed, keeping previous devices: {}", e),
        }
    }

    /// Steady-state loop. Returns once `shutdown` turns true or its sender
    /// is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Poll scheduler started: {} devices, every {:?}",
            self.devices.len(),
            self.config.scan_interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Instant::now();

            if self.rediscovery_due(now) {
                self.last_discovery = now;
                let runner = self.runner.clone();
                match tokio::task::spawn_blocking(move || discovery::discover(runner.as_ref())).await {
                    Ok(Ok(devices)) => self.replace_devices(devices),
                    Ok(Err(e)) => {
                        error!("Device re-discovery failed, keeping previous devices: {}", e)
                    }
                    Err(e) => error!("Device re-discovery task failed: {}", e),
                }
            }

            if self.is_due(now) {
                self.begin_scan(now);
                let runner = self.runner.clone();
                let registry = self.registry.clone();
                let devices = self.devices.clone();

                match tokio::task::spawn_blocking(move || {
                    sweep(runner.as_ref(), &devices, &registry)
                })
                .await
                {
                    Ok(report) => self.finish_scan(&report),
                    Err(e) => {
                        error!("Sweep task failed: {}", e);
                        self.state = SchedulerState::Idle;
                    }
                }
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.sleep_granularity) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Poll scheduler stopped");
    }
}
