//! # Gauge HAL Binary
//!
//! Subscribes to wind-speed readings and moves a PWM-driven analog gauge
//! toward each reading at one unit per tick.
//!
//! # Usage
//!
//! ```bash
//! # Run against the configured broker with the simulation driver
//! gauge_hal --config config/gauge.toml --simulate
//!
//! # Drive the Raspberry Pi PWM channel
//! gauge_hal --config /etc/gauge/gauge.toml --driver sysfs
//!
//! # Feed readings from another subscriber, verbose logging
//! mosquitto_sub -t /ws/4/ind/wind_speed | gauge_hal --stdin -s -v
//! ```

#![deny(warnings)]

use clap::Parser;
use gauge_common::config::{ConfigError, ConfigLoader, GaugeConfig};
use gauge_common::consts::DEFAULT_CONFIG_PATH;
use gauge_hal::GaugeCore;
use gauge_hal::driver_registry::DriverRegistry;
use gauge_hal::drivers::register_all_drivers;
use gauge_hal::source::run_line_source;
use gauge_mqtt::Subscriber;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Gauge HAL - smoothed PWM gauge driven by wind-speed readings
#[derive(Parser, Debug)]
#[command(name = "gauge_hal")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Drives a PWM analog gauge from wind-speed readings")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file (gauge.toml).
    /// Missing file means built-in defaults.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Force simulation driver (ignores --driver and the config file)
    #[arg(short = 's', long)]
    simulate: bool,

    /// Output driver to load (overrides `output.driver`)
    #[arg(short, long)]
    driver: Option<String>,

    /// List the available output drivers and exit
    #[arg(long)]
    list_drivers: bool,

    /// Read JSON payloads from stdin, one per line, instead of MQTT
    #[arg(long)]
    stdin: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("Gauge startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry);

    if args.list_drivers {
        for (name, summary) in registry.describe() {
            println!("{name:<12} {summary}");
        }
        return Ok(());
    }

    let (config, missing_config) = match GaugeConfig::load(&args.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound) => (GaugeConfig::default(), true),
        Err(e) => {
            // Logging is not set up yet.
            setup_tracing(&args, Level::INFO);
            return Err(e.into());
        }
    };

    setup_tracing(&args, config.shared.log_level.into());

    info!("Gauge HAL v{} starting...", env!("CARGO_PKG_VERSION"));
    if missing_config {
        warn!("Config {:?} not found, using defaults", args.config);
    } else {
        info!("Loaded config from {:?}", args.config);
    }

    let driver_name = if args.simulate {
        info!("Simulation mode enabled (exclusive)");
        "simulation".to_string()
    } else if let Some(ref name) = args.driver {
        info!("Driver from CLI: {}", name);
        name.clone()
    } else {
        config.output.driver.clone()
    };

    let mqtt_config = config.mqtt.clone();
    let mut core = GaugeCore::new(config)?;

    let running = core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    core.init(&registry, &driver_name)?;
    core.start()?;

    let adapter = core.input_adapter();
    let running = core.running_flag();

    if args.stdin {
        info!("Reading payloads from stdin");
        let reader_adapter = adapter.clone();
        let reader_running = core.running_flag();
        // Blocking stdin reads cannot be interrupted; the thread is left
        // detached and dies with the process.
        thread::Builder::new()
            .name("stdin".to_string())
            .spawn(move || {
                run_line_source(std::io::stdin().lock(), &reader_adapter, &reader_running);
            })?;

        while running.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
        }
    } else {
        info!(
            "Subscribing to {} on {}",
            mqtt_config.topic, mqtt_config.broker
        );
        let subscriber = Subscriber::new(mqtt_config);
        subscriber.run(&running, |topic, payload| {
            adapter.on_message(topic, payload);
        });
    }

    let stats = core.shutdown()?;
    info!(
        "Gauge HAL shutdown complete ({} ticks, {} writes)",
        stats.ticks, stats.writes
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, configured: Level) {
    let level = if args.verbose { Level::DEBUG } else { configured };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
