//! Output driver trait and error types.
//!
//! This module defines:
//! - `OutputDriver` trait - Interface for pluggable PWM output drivers
//! - `GaugeError` enum - Error types for output and lifecycle operations
//! - `DriverFactory` type alias - Factory function type

use crate::config::ConfigError;
use crate::output::config::OutputConfig;
use crate::output::types::{DriverDiagnostics, PwmMode};
use thiserror::Error;

/// Error types for gauge output operations.
#[derive(Debug, Clone, Error)]
pub enum GaugeError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Duty write to the output channel failed
    #[error("Output write failed: {0}")]
    WriteFailed(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Operation requires an initialized driver
    #[error("Driver not initialized")]
    NotInitialized,

    /// Smoothing loop already started
    #[error("Smoothing loop already running")]
    AlreadyRunning,

    /// Loop thread could not be spawned or joined
    #[error("Thread error: {0}")]
    Thread(String),
}

impl From<ConfigError> for GaugeError {
    fn from(e: ConfigError) -> Self {
        Self::ConfigError(e.to_string())
    }
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn OutputDriver>;

/// Trait defining the interface for output drivers.
///
/// The gauge core manages drivers through this trait, enabling pluggable
/// backends (simulation, Linux sysfs PWM, ...).
///
/// # Lifecycle
///
/// 1. `init()` - Called once before the smoothing loop starts
/// 2. `write_duty()` - Called from the smoothing loop thread only
/// 3. `shutdown()` - Called after the loop thread has been joined
///
/// A driver is owned by exactly one thread at a time, so it needs `Send`
/// but not `Sync`.
pub trait OutputDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation", "sysfs").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver with output configuration.
    ///
    /// # Errors
    /// Return `GaugeError::InitFailed` if the channel cannot be prepared.
    fn init(&mut self, config: &OutputConfig) -> Result<(), GaugeError>;

    /// Apply `value / full_scale` as the duty cycle of the channel.
    ///
    /// Must be fast and non-blocking; it runs once per smoothing tick.
    ///
    /// # Errors
    /// Return `GaugeError::WriteFailed` on hardware errors. The caller
    /// treats this as transient.
    fn write_duty(&mut self, value: u32, full_scale: u32, mode: PwmMode) -> Result<(), GaugeError>;

    /// Graceful shutdown of the driver (disable the channel).
    fn shutdown(&mut self) -> Result<(), GaugeError>;

    /// Get driver-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestDriver {
        initialized: bool,
        last: Option<u32>,
    }

    impl OutputDriver for TestDriver {
        fn name(&self) -> &'static str {
            "test"
        }

        fn version(&self) -> &'static str {
            "0.1.0"
        }

        fn init(&mut self, _config: &OutputConfig) -> Result<(), GaugeError> {
            self.initialized = true;
            Ok(())
        }

        fn write_duty(&mut self, value: u32, _full_scale: u32, _mode: PwmMode) -> Result<(), GaugeError> {
            self.last = Some(value);
            Ok(())
        }

        fn shutdown(&mut self) -> Result<(), GaugeError> {
            self.initialized = false;
            Ok(())
        }
    }

    #[test]
    fn test_gauge_error_display() {
        let err = GaugeError::InitFailed("test error".to_string());
        assert!(err.to_string().contains("test error"));

        let err = GaugeError::DriverNotFound("sysfs".to_string());
        assert!(err.to_string().contains("sysfs"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: GaugeError = ConfigError::ValidationError("bad topic".to_string()).into();
        assert!(matches!(err, GaugeError::ConfigError(ref msg) if msg.contains("bad topic")));
    }

    #[test]
    fn test_default_diagnostics_is_none() {
        let mut driver = TestDriver {
            initialized: false,
            last: None,
        };
        driver.init(&OutputConfig::default()).unwrap();
        driver.write_duty(5, 128, PwmMode::Balanced).unwrap();
        assert!(driver.initialized);
        assert_eq!(driver.last, Some(5));
        assert!(driver.diagnostics().is_none());
    }
}
