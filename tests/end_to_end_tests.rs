//! End-to-end tests: discovery, extraction and registry updates driven by
//! canned smartctl output instead of real devices.

use smartprom_exporter::{
    discover, sweep, sweep_collecting, HealthStats, MetricRegistry, Observation, PollScheduler, SchedulerConfig,
    SmartError, SmartctlRunner,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

const ATA_TABLE: &str = "\
smartctl 7.3 2022-02-28 r5338 [x86_64-linux-6.1.0] (local build)
Copyright (C) 2002-22, Bruce Allen, Christian Franke, www.smartmontools.org

=== START OF READ SMART DATA SECTION ===
SMART Attributes Data Structure revision number: 16
Vendor Specific SMART Attributes with Thresholds:
ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
  5 Reallocated_Sector_Ct   0x0033   100   100   010    Pre-fail  Always       -       0
  9 Power_On_Hours          0x0032   100   100   000    Old_age   Always       -       12345
194 Temperature_Celsius     0x0022   064   050   000    Old_age   Always       -       36 (Min/Max 20/50)
199 UDMA_CRC_Error_Count    0x003e   200   200   000    Old_age   Always       -       0/0
";

const NVME_HEALTH: &str = r#"{"json_format_version":[1,0],"device":{"name":"/dev/nvme0","type":"nvme","protocol":"NVMe"},"nvme_smart_health_information_log":{"critical_warning":0,"temperature":305,"available_spare":100,"percentage_used":2,"data_units_read":1234567,"power_on_hours":4321,"temperature_sensors":[305,310]}}"#;

const SCSI_DOC: &str = r#"{"device":{"name":"/dev/sdc","type":"scsi"},"temperature":{"current":31,"drive_trip":60},"power_on_time":{"hours":17890,"minutes":12},"scsi_grown_defect_list":0}"#;

/// Answers smartctl invocations from a table keyed by the joined arguments.
/// `None` entries fail like a non-zero exit status.
struct CannedRunner {
    responses: HashMap<String, Option<String>>,
    calls: AtomicUsize,
}

impl CannedRunner {
    fn new(responses: &[(&str, Option<&str>)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(args, out)| (args.to_string(), out.map(str::to_string)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SmartctlRunner for CannedRunner {
    fn run(&self, args: &[&str]) -> Result<String, SmartError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = args.join(" ");
        match self.responses.get(&key) {
            Some(Some(out)) => Ok(out.clone()),
            _ => Err(SmartError::ExternalTool {
                command: format!("smartctl {}", key),
                code: Some(2),
            }),
        }
    }
}

fn scan(entries: &[(&str, &str)]) -> String {
    let devices: Vec<String> = entries
        .iter()
        .map(|(name, driver)| {
            format!(
                r#"{{"name":"{}","info_name":"{}","type":"{}","protocol":"ATA"}}"#,
                name, name, driver
            )
        })
        .collect();
    format!(r#"{{"devices":[{}]}}"#, devices.join(","))
}

#[test]
fn test_ata_device_exports_raw_power_on_hours() {
    let scan = scan(&[("/dev/sda", "sat")]);
    let runner = CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan.as_str())),
        ("-A -d sat /dev/sda", Some(ATA_TABLE)),
    ]);

    let devices = discover(&runner).unwrap();
    let registry = MetricRegistry::default();
    let report = sweep(&runner, &devices, &registry);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);

    let text = registry.render().unwrap();
    assert!(text.contains(r#"smartprom_power_on_hours_raw{drive="sda"} 12345"#));
    assert!(text.contains(r#"smartprom_power_on_hours{drive="sda"} 100"#));
    assert!(text.contains("# HELP smartprom_power_on_hours_raw (0x9) Power On Hours raw"));
    // Only the tenth token counts, trailing "(Min/Max 20/50)" is ignored
    assert!(text.contains(r#"smartprom_temperature_celsius{drive="sda"} 64"#));
    assert!(text.contains(r#"smartprom_temperature_celsius_raw{drive="sda"} 36"#));
    // "0/0" is not an integer, so only the normalized value is exported
    assert!(text.contains(r#"smartprom_udma_crc_error_count{drive="sda"} 200"#));
    assert!(!text.contains("smartprom_udma_crc_error_count_raw"));
}

#[test]
fn test_nvme_device_exports_temperature_sensors() {
    let scan = scan(&[("/dev/nvme0", "nvme")]);
    let runner = CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan.as_str())),
        ("-A -d nvme --json=c /dev/nvme0", Some(NVME_HEALTH)),
    ]);

    let devices = discover(&runner).unwrap();
    let registry = MetricRegistry::default();
    sweep(&runner, &devices, &registry);

    let text = registry.render().unwrap();
    assert!(text.contains(r#"smartprom_temperature{drive="nvme0"} 305"#));
    assert!(text.contains(r#"smartprom_temperature_sensor1{drive="nvme0"} 305"#));
    assert!(text.contains(r#"smartprom_temperature_sensor2{drive="nvme0"} 310"#));
    assert!(!text.contains("smartprom_temperature_sensors"));
}

#[test]
fn test_scsi_device_flattens_nested_fields() {
    let scan = scan(&[("/dev/sdc", "scsi")]);
    let runner = CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan.as_str())),
        ("-A -d scsi --json=c /dev/sdc", Some(SCSI_DOC)),
    ]);

    let devices = discover(&runner).unwrap();
    let registry = MetricRegistry::default();
    sweep(&runner, &devices, &registry);

    let text = registry.render().unwrap();
    assert!(text.contains(r#"smartprom_temperature_current{drive="sdc"} 31"#));
    assert!(text.contains(r#"smartprom_power_on_time_hours{drive="sdc"} 17890"#));
    assert!(text.contains(r#"smartprom_scsi_grown_defect_list{drive="sdc"} 0"#));
}

#[test]
fn test_failing_device_does_not_block_healthy_device() {
    let scan = scan(&[("/dev/sda", "sat"), ("/dev/sdb", "sat")]);
    let runner = CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan.as_str())),
        ("-A -d sat /dev/sda", None),
        ("-A -d sat /dev/sdb", Some(ATA_TABLE)),
    ]);

    let devices = discover(&runner).unwrap();
    assert_eq!(devices.len(), 2);

    let registry = MetricRegistry::default();
    let report = sweep(&runner, &devices, &registry);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let text = registry.render().unwrap();
    assert!(text.contains(r#"smartprom_power_on_hours_raw{drive="sdb"} 12345"#));
    assert!(!text.contains(r#"drive="sda""#));
}

#[test]
fn test_collecting_sweep_polls_each_device_once() {
    let scan = scan(&[("/dev/sda", "sat"), ("/dev/sdb", "sat"), ("/dev/nvme0", "nvme")]);
    let runner = CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan.as_str())),
        ("-A -d sat /dev/sda", Some(ATA_TABLE)),
        ("-A -d sat /dev/sdb", None),
        ("-A -d nvme --json=c /dev/nvme0", Some(NVME_HEALTH)),
    ]);

    let devices = discover(&runner).unwrap();
    let calls_before = runner.calls();
    let registry = MetricRegistry::default();
    let (report, read) = sweep_collecting(&runner, &devices, &registry);

    assert_eq!(runner.calls() - calls_before, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    // Failed devices have no entry
    assert_eq!(read.len(), 2);
    assert!(!read.contains_key("/dev/sdb"));
    assert_eq!(read["/dev/sda"]["Power_On_Hours_raw"].value, 12345);
    assert_eq!(read["/dev/nvme0"]["temperature_sensor2"].value, 310);

    let text = registry.render().unwrap();
    assert!(text.contains(r#"smartprom_power_on_hours_raw{drive="sda"} 12345"#));
}

#[test]
fn test_excluded_devices_never_labeled() {
    let scan = r#"{"devices":[
        {"name":"/dev/sda","type":"sat","protocol":"ATA"},
        {"name":"/dev/sdb","type":"sat","protocol":"ATA","open_error":"Permission denied"},
        {"name":"/dev/bus/0","type":"megaraid,0","protocol":"SCSI"}
    ]}"#;
    let runner = CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan)),
        ("-A -d sat /dev/sda", Some(ATA_TABLE)),
    ]);

    let devices = discover(&runner).unwrap();
    assert_eq!(devices.len(), 2);
    assert!(!devices.contains_key("/dev/sdb"));

    let calls_before = runner.calls();
    let registry = MetricRegistry::default();
    let report = sweep(&runner, &devices, &registry);

    // Only sda is polled; the megaraid device is skipped without a call
    assert_eq!(runner.calls() - calls_before, 1);
    assert_eq!(report.skipped, 1);

    let text = registry.render().unwrap();
    assert!(!text.contains(r#"drive="sdb""#));
    assert!(!text.contains("bus"));
}

#[test]
fn test_scheduler_sweeps_update_health_stats() {
    let scan = scan(&[("/dev/sda", "sat"), ("/dev/nvme0", "nvme")]);
    let runner = Arc::new(CannedRunner::new(&[
        ("--scan-open --json=c", Some(scan.as_str())),
        ("-A -d sat /dev/sda", Some(ATA_TABLE)),
        ("-A -d nvme --json=c /dev/nvme0", Some(NVME_HEALTH)),
    ]));

    let devices = discover(runner.as_ref()).unwrap();
    let registry = Arc::new(MetricRegistry::default());
    let stats = Arc::new(HealthStats::new());
    let mut scheduler = PollScheduler::new(
        runner,
        registry.clone(),
        stats.clone(),
        devices,
        SchedulerConfig::default(),
    );

    assert!(!stats.has_swept());
    scheduler.run_sweep();
    scheduler.run_sweep();

    assert_eq!(stats.total_sweeps.load(Ordering::Relaxed), 2);
    assert_eq!(stats.discovered_devices.load(Ordering::Relaxed), 2);
    assert_eq!(
        stats.gauges.load(Ordering::Relaxed),
        registry.len() as u64
    );

    // Both devices report power_on_hours; the gauge is shared
    let text = registry.render().unwrap();
    assert_eq!(text.matches("# TYPE smartprom_power_on_hours gauge").count(), 1);
    assert!(text.contains(r#"smartprom_power_on_hours{drive="nvme0"} 4321"#));
    assert!(text.contains(r#"smartprom_power_on_hours{drive="sda"} 100"#));
}

#[test]
fn test_concurrent_first_observation_registers_once() {
    let registry = Arc::new(MetricRegistry::default());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                registry
                    .observe(
                        "Media_Wearout_Indicator",
                        Observation::with_id(233, 90 + i as i128),
                        &format!("/dev/sd{}", (b'a' + i as u8) as char),
                    )
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 1);
    let text = registry.render().unwrap();
    assert_eq!(
        text.matches("# HELP smartprom_media_wearout_indicator ").count(),
        1
    );
    assert_eq!(
        text.matches("smartprom_media_wearout_indicator{drive=").count(),
        threads
    );
}
