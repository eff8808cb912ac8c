//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `OutputDriver` trait with an
//! in-memory PWM channel. Writes are validated the same way the hardware
//! driver validates them, then logged at debug level.

use gauge_common::output::{DriverDiagnostics, GaugeError, OutputConfig, OutputDriver, PwmMode};
use tracing::{debug, info};

/// Simulation driver implementing the OutputDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Initialized flag
    initialized: bool,
    /// Channel enabled (between init and shutdown)
    enabled: bool,
    /// Configured carrier frequency
    frequency_hz: u32,
    /// Current duty as (value, full_scale)
    duty: (u32, u32),
    /// Mode of the last write
    mode: PwmMode,
    /// Counters
    diagnostics: DriverDiagnostics,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            enabled: false,
            frequency_hz: 0,
            duty: (0, 1),
            mode: PwmMode::default(),
            diagnostics: DriverDiagnostics::default(),
        }
    }

    /// Whether the simulated channel is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured carrier frequency.
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Current duty cycle as a fraction in `0.0..=1.0`.
    pub fn duty_fraction(&self) -> f64 {
        let (value, full_scale) = self.duty;
        f64::from(value) / f64::from(full_scale)
    }

    /// Mode used by the last write.
    pub fn mode(&self) -> PwmMode {
        self.mode
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &OutputConfig) -> Result<(), GaugeError> {
        if config.frequency_hz == 0 {
            return Err(GaugeError::InitFailed(
                "frequency_hz must be greater than 0".to_string(),
            ));
        }
        self.frequency_hz = config.frequency_hz;
        self.duty = (0, 1);
        self.enabled = true;
        self.initialized = true;
        info!(
            "Simulation PWM channel ready ({} Hz, period {} ns)",
            config.frequency_hz,
            config.period_ns()
        );
        Ok(())
    }

    fn write_duty(&mut self, value: u32, full_scale: u32, mode: PwmMode) -> Result<(), GaugeError> {
        if !self.initialized {
            self.diagnostics.failed_writes += 1;
            return Err(GaugeError::NotInitialized);
        }
        if full_scale == 0 || value > full_scale {
            self.diagnostics.failed_writes += 1;
            return Err(GaugeError::WriteFailed(format!(
                "duty {value}/{full_scale} out of range"
            )));
        }

        self.duty = (value, full_scale);
        self.mode = mode;
        self.diagnostics.write_count += 1;
        self.diagnostics.last_value = Some(value);
        debug!("[sim pwm] duty {}/{} ({})", value, full_scale, mode);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), GaugeError> {
        info!(
            "Simulation PWM channel shut down after {} writes",
            self.diagnostics.write_count
        );
        self.duty = (0, 1);
        self.enabled = false;
        self.initialized = false;
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        Some(self.diagnostics.clone())
    }
}
