//! Gauge core struct and smoothing loop thread management.
//!
//! The `GaugeCore` struct is the main entry point for gauge operations.
//! It owns the output driver, the setpoint register and the smoothing
//! loop thread.

use gauge_common::config::GaugeConfig;
use gauge_common::consts::{FULL_SCALE, PWM_MODE, TICK_PERIOD};
use gauge_common::output::{GaugeError, OutputDriver};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};

use crate::driver_registry::DriverRegistry;
use crate::input::InputAdapter;
use crate::setpoint::SetpointRegister;
use crate::smoothing::{IntervalTicker, LoopOutcome, LoopStats, SmoothingLoop};

/// Gauge core manages the driver and the smoothing loop thread.
pub struct GaugeCore {
    /// Service configuration
    config: GaugeConfig,
    /// Driver, present between `init()` and `start()`
    driver: Option<Box<dyn OutputDriver>>,
    /// Name of the loaded driver
    driver_name: Option<&'static str>,
    /// Shared setpoint
    setpoint: Arc<SetpointRegister>,
    /// Cleared to stop; set from construction so a stop requested
    /// before `start()` is never lost
    running: Arc<AtomicBool>,
    /// Tick period
    tick_period: Duration,
    /// Loop thread, present while running
    worker: Option<JoinHandle<LoopOutcome>>,
}

impl GaugeCore {
    /// Create a new GaugeCore with the given configuration.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn new(config: GaugeConfig) -> Result<Self, GaugeError> {
        config.validate()?;

        info!(
            "GaugeCore created for '{}' (full scale {}, tick {}ms)",
            config.shared.service_name,
            FULL_SCALE,
            TICK_PERIOD.as_millis()
        );

        Ok(Self {
            config,
            driver: None,
            driver_name: None,
            setpoint: Arc::new(SetpointRegister::default()),
            running: Arc::new(AtomicBool::new(true)),
            tick_period: TICK_PERIOD,
            worker: None,
        })
    }

    /// Override the tick period.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Open the output driver and park the needle at 0.
    ///
    /// Calling `init` again replaces the driver; the previous one is shut
    /// down first.
    ///
    /// # Errors
    /// Returns error if the driver is unknown or fails to initialize.
    pub fn init(&mut self, registry: &DriverRegistry, driver_name: &str) -> Result<(), GaugeError> {
        if self.worker.is_some() {
            return Err(GaugeError::AlreadyRunning);
        }
        if let Some(mut previous) = self.driver.take() {
            info!("Replacing driver '{}'", previous.name());
            if let Err(e) = previous.shutdown() {
                warn!("Previous driver shutdown failed: {}", e);
            }
            self.driver_name = None;
        }
        info!("Initializing GaugeCore with driver '{}'...", driver_name);

        let mut driver = registry.open(driver_name, &self.config.output)?;
        if let Err(e) = driver.write_duty(0, FULL_SCALE, PWM_MODE) {
            warn!("Parking output at 0 failed: {}", e);
            if let Err(e) = driver.shutdown() {
                warn!("Driver shutdown after failed init: {}", e);
            }
            return Err(e);
        }

        self.driver_name = Some(driver.name());
        self.driver = Some(driver);
        info!("GaugeCore initialized successfully");
        Ok(())
    }

    /// Spawn the smoothing loop thread.
    ///
    /// If a stop was already requested through [`running_flag`], no thread
    /// is spawned; the driver stays parked until [`shutdown`].
    ///
    /// [`running_flag`]: GaugeCore::running_flag
    /// [`shutdown`]: GaugeCore::shutdown
    ///
    /// # Errors
    /// Returns error if `init()` was not called or the loop is already running.
    pub fn start(&mut self) -> Result<(), GaugeError> {
        if self.worker.is_some() {
            return Err(GaugeError::AlreadyRunning);
        }
        if self.driver.is_none() {
            return Err(GaugeError::NotInitialized);
        }
        if !self.running.load(Ordering::SeqCst) {
            info!("Stop requested before start, smoothing loop not started");
            return Ok(());
        }
        let Some(driver) = self.driver.take() else {
            return Err(GaugeError::NotInitialized);
        };

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let smoothing = SmoothingLoop::new(
            driver,
            Arc::clone(&self.setpoint),
            IntervalTicker::new(self.tick_period),
            Arc::clone(&self.running),
        );

        let handle = thread::Builder::new()
            .name("smoothing".to_string())
            .spawn(move || smoothing.run())
            .map_err(|e| GaugeError::Thread(format!("Failed to spawn smoothing loop: {e}")))?;

        self.worker = Some(handle);
        info!(
            "Smoothing loop running (tick={}ms)",
            self.tick_period.as_millis()
        );
        Ok(())
    }

    /// Stop the loop, join its thread and shut the driver down.
    ///
    /// Safe to call on a core that was never started.
    pub fn shutdown(&mut self) -> Result<LoopStats, GaugeError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        let (mut driver, stats) = match self.worker.take() {
            Some(handle) => {
                let outcome = handle
                    .join()
                    .map_err(|_| GaugeError::Thread("smoothing loop panicked".to_string()))?;
                info!("Smoothing loop joined at actual={}", outcome.actual);
                (Some(outcome.driver), outcome.stats)
            }
            None => (self.driver.take(), LoopStats::default()),
        };

        if let Some(driver) = driver.as_mut() {
            if let Some(diag) = driver.diagnostics() {
                info!(
                    "Driver '{}' diagnostics: writes={}, failed={}, last={:?}",
                    driver.name(),
                    diag.write_count,
                    diag.failed_writes,
                    diag.last_value
                );
            }
            if let Err(e) = driver.shutdown() {
                warn!("Driver shutdown failed: {}", e);
                return Err(e);
            }
        }

        info!(
            "GaugeCore stopped after {} ticks ({} writes, {} failed)",
            stats.ticks, stats.writes, stats.failed_writes
        );
        Ok(stats)
    }

    /// Shared setpoint register.
    pub fn setpoint(&self) -> Arc<SetpointRegister> {
        Arc::clone(&self.setpoint)
    }

    /// Input adapter writing into this core's setpoint register.
    pub fn input_adapter(&self) -> InputAdapter {
        InputAdapter::new(self.setpoint())
    }

    /// Get the running flag for signal handlers.
    ///
    /// Clearing it stops the loop, or keeps a later `start()` from
    /// spawning one.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Whether the loop thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Name of the loaded driver, once initialized.
    pub fn driver_name(&self) -> Option<&'static str> {
        self.driver_name
    }

    /// Loaded configuration.
    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }
}

impl Drop for GaugeCore {
    fn drop(&mut self) {
        // A dropped core must not leave the output enabled.
        if self.worker.is_some() || self.driver.is_some() {
            if let Err(e) = self.shutdown() {
                warn!("Shutdown on drop failed: {}", e);
            }
        }
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling thread's policy.
        let policy = unsafe { sched_getscheduler(0) };
        policy == SCHED_FIFO || policy == SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
