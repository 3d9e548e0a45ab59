//! smartprom-exporter - version 0.1.0
//!
//! S.M.A.R.T. attribute exporter with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod startup_checks;
mod state;

use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use prometheus::Registry;
use smartprom_exporter::{
    discover, Devices, ExporterTelemetry, HealthStats, MetricRegistry, PollScheduler, Smartctl,
    SmartctlRunner,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{
    net::TcpListener,
    signal,
    sync::watch,
};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};

use cli::{Args, Commands, LogFormat, LogLevel};
use commands::{command_check, command_config, command_test};
use config::{
    invalid_env_log_level, resolve_config, show_config, validate_effective_config, Config,
    DEFAULT_BIND_ADDR, DEFAULT_PORT,
};
use handlers::{config_handler, health_handler, metrics_handler, root_handler};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level and format.
fn setup_logging(args: &Args, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.log_level();
    let filter = match log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    match args.log_format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }

    if let Some(value) = invalid_env_log_level(args) {
        warn!("Invalid LOGLEVEL set: {:?}, falling back to INFO", value);
    }

    info!("Logging initialized with level: {:?}", log_level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Runs the initial discovery off the async runtime. A failure is logged
/// and the exporter continues with no devices.
async fn initial_discovery(runner: Arc<dyn SmartctlRunner>) -> Devices {
    info!("Discovering devices");
    match tokio::task::spawn_blocking(move || discover(runner.as_ref())).await {
        Ok(Ok(devices)) => {
            info!("Discovered {} device(s)", devices.len());
            devices
        }
        Ok(Err(e)) => {
            error!("Device discovery failed: {}", e);
            Devices::new()
        }
        Err(e) => {
            error!("Device discovery task failed: {}", e);
            Devices::new()
        }
    }
}

/// Resolves once SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        // Config generation doesn't need a valid effective config
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), format.clone(), *commented);
        }

        let config = load_validated_config(&args)?;
        setup_logging(&args, &config)?;

        return match command {
            Commands::Check => command_check(&config),
            Commands::Test {
                iterations,
                verbose,
                metrics,
            } => command_test(*iterations, *verbose, *metrics, &config).map_err(Into::into),
            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;
    setup_logging(&args, &config)?;

    info!("Starting smartprom-exporter");

    let smartctl_path = config.smartctl_path();
    if let Err(e) = startup_checks::validate_requirements(&smartctl_path) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The exporter will start but no attributes will be collected!");
        // Continue anyway - don't fail hard
    }

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let port = config.port.unwrap_or(DEFAULT_PORT);

    // Configure parallel device polling
    if let Some(threads) = config.parallelism {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
        debug!("Rayon thread pool configured with {} threads", threads);
    }

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let telemetry = if config.enable_telemetry.unwrap_or(true) {
        Some(ExporterTelemetry::new(&registry)?)
    } else {
        None
    };
    let registry = Arc::new(MetricRegistry::new(registry));
    debug!("Prometheus registry initialized");

    let health_stats = Arc::new(HealthStats::new());

    let runner: Arc<dyn SmartctlRunner> = Arc::new(Smartctl::new(smartctl_path));
    let devices = initial_discovery(runner.clone()).await;

    let mut scheduler = PollScheduler::new(
        runner,
        registry.clone(),
        health_stats.clone(),
        devices,
        config.scheduler_config(),
    );
    if let Some(telemetry) = &telemetry {
        scheduler = scheduler.with_telemetry(telemetry.clone());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let state: SharedState = Arc::new(AppState {
        registry,
        telemetry,
        config: Arc::new(config.clone()),
        health_stats,
        start_time: Instant::now(),
    });

    // Configure HTTP server routes
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port).parse()?;

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler));

    if config.enable_health.unwrap_or(true) {
        app = app.route("/health", get(health_handler));
    }

    let app = app
        .route("/config", get(config_handler))
        .with_state(state);

    let served = if config.enable_tls.unwrap_or(false) {
        // Both paths are checked by validate_effective_config
        let cert_path = config.tls_cert_path.as_deref().unwrap_or_default();
        let key_path = config.tls_key_path.as_deref().unwrap_or_default();

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .map_err(|e| {
                error!("Failed to load TLS configuration: {}", e);
                e
            })?;

        info!(
            "smartprom-exporter listening on https://{}:{}",
            bind_ip_str, port
        );

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());

        tokio::select! {
            result = server => result.map_err(|e| {
                error!("Server error: {}", e);
                Box::<dyn std::error::Error>::from(e)
            }),
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
                Ok(())
            }
        }
    } else {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "smartprom-exporter listening on http://{}:{}",
            bind_ip_str, port
        );

        let server = axum::serve(listener, app);

        tokio::select! {
            result = server => result.map_err(|e| {
                error!("Server error: {}", e);
                Box::<dyn std::error::Error>::from(e)
            }),
            _ = shutdown_signal() => {
                info!("Shutdown signal received, exiting...");
                Ok(())
            }
        }
    };

    // Stop the scheduler; an in-flight sweep finishes first
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_task.await {
        error!("Poll scheduler task failed: {}", e);
    }

    served?;
    info!("smartprom-exporter stopped gracefully");
    Ok(())
}
