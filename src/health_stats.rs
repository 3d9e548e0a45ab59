//! Health statistics and monitoring for the exporter.
//!
//! This module tracks sweep performance, per-device failures and HTTP
//! request counts, and renders them as the plain-text `/health` table.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns `(last, avg, max, min, count)`.
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Thread-safe circular buffer for tracking HTTP request timestamps.
pub struct RequestTimestamps {
    inner: Mutex<VecDeque<Instant>>,
}

impl Default for RequestTimestamps {
    fn default() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(256)),
        }
    }
}

impl RequestTimestamps {
    pub fn record(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            let now = Instant::now();
            guard.push_back(now);
            // Keep only the last 10 minutes
            if let Some(cutoff) = now.checked_sub(Duration::from_secs(600)) {
                while guard.front().is_some_and(|&t| t < cutoff) {
                    guard.pop_front();
                }
            }
        }
    }

    pub fn count_last_minute(&self) -> u64 {
        if let Ok(guard) = self.inner.lock() {
            match Instant::now().checked_sub(Duration::from_secs(60)) {
                Some(cutoff) => guard.iter().filter(|&&t| t >= cutoff).count() as u64,
                None => guard.len() as u64,
            }
        } else {
            0
        }
    }
}

/// Sweep and request statistics for the exporter.
pub struct HealthStats {
    // Sweep performance
    pub sweep_duration_seconds: Stat,
    pub devices_succeeded: Stat,
    pub devices_failed: Stat,
    pub attributes_observed: Stat,
    pub total_sweeps: AtomicU64,
    pub device_failures_total: AtomicU64,

    // Inventory
    pub discovered_devices: AtomicU64,
    pub gauges: AtomicU64,

    // HTTP server stats
    pub http_request_timestamps: RequestTimestamps,
    pub metrics_endpoint_calls: AtomicU64,

    // Timing
    pub start_time: Instant,
    pub last_sweep: StdRwLock<Option<DateTime<Utc>>>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            sweep_duration_seconds: Stat::default(),
            devices_succeeded: Stat::default(),
            devices_failed: Stat::default(),
            attributes_observed: Stat::default(),
            total_sweeps: AtomicU64::new(0),
            device_failures_total: AtomicU64::new(0),
            discovered_devices: AtomicU64::new(0),
            gauges: AtomicU64::new(0),
            http_request_timestamps: RequestTimestamps::default(),
            metrics_endpoint_calls: AtomicU64::new(0),
            start_time: Instant::now(),
            last_sweep: StdRwLock::new(None),
        }
    }
}

impl HealthStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_sweep(
        &self,
        succeeded: u64,
        failed: u64,
        attributes: u64,
        duration_seconds: f64,
    ) {
        self.sweep_duration_seconds.add_sample(duration_seconds);
        self.devices_succeeded.add_sample(succeeded as f64);
        self.devices_failed.add_sample(failed as f64);
        self.attributes_observed.add_sample(attributes as f64);
        self.total_sweeps.fetch_add(1, Ordering::Relaxed);
        self.device_failures_total
            .fetch_add(failed, Ordering::Relaxed);

        if let Ok(mut guard) = self.last_sweep.write() {
            *guard = Some(Utc::now());
        }
    }

    pub fn record_devices(&self, count: u64) {
        self.discovered_devices.store(count, Ordering::Relaxed);
    }

    pub fn record_gauges(&self, count: u64) {
        self.gauges.store(count, Ordering::Relaxed);
    }

    pub fn record_http_request(&self) {
        self.http_request_timestamps.record();
    }

    pub fn record_metrics_endpoint_call(&self) {
        self.metrics_endpoint_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// True once at least one sweep has completed.
    pub fn has_swept(&self) -> bool {
        self.total_sweeps.load(Ordering::Relaxed) > 0
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn get_last_sweep_str(&self) -> String {
        match self.last_sweep.read() {
            Ok(guard) => guard
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            Err(_) => "N/A".to_string(),
        }
    }

    pub fn render_table(&self) -> String {
        let left_col = 26usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(out, "HEALTH ENDPOINT - EXPORTER INTERNAL STATS").ok();
        writeln!(out, "==========================================").ok();
        writeln!(out).ok();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out).ok();
        writeln!(out, "SWEEP PERFORMANCE").ok();
        writeln!(out, "-----------------").ok();

        let rows: [(&str, &Stat, usize); 4] = [
            ("sweep_duration (s)", &self.sweep_duration_seconds, 3),
            ("devices_succeeded", &self.devices_succeeded, 0),
            ("devices_failed", &self.devices_failed, 0),
            ("attributes_observed", &self.attributes_observed, 0),
        ];
        for (label, stat, precision) in rows {
            let (cur, avg, max, min, _) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.p$}", cur, p = precision),
                format!("{:.p$}", avg, p = precision.max(1)),
                format!("{:.p$}", max, p = precision),
                format!("{:.p$}", min, p = precision),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "TOTALS").ok();
        writeln!(out, "------").ok();
        let totals = [
            ("total_sweeps", self.total_sweeps.load(Ordering::Relaxed)),
            (
                "device_failures_total",
                self.device_failures_total.load(Ordering::Relaxed),
            ),
            (
                "discovered_devices",
                self.discovered_devices.load(Ordering::Relaxed),
            ),
            ("gauges", self.gauges.load(Ordering::Relaxed)),
            (
                "metrics_endpoint_calls",
                self.metrics_endpoint_calls.load(Ordering::Relaxed),
            ),
            (
                "http_requests_last_minute",
                self.http_request_timestamps.count_last_minute(),
            ),
        ];
        for (label, value) in totals {
            writeln!(out, "{:left$} | {:>col$}", label, value, left = left_col, col = col_w).ok();
        }

        writeln!(out).ok();
        writeln!(out, "last_sweep: {}", self.get_last_sweep_str()).ok();
        out
    }
}
