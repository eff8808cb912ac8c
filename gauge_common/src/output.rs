//! Output channel contract and configuration.
//!
//! This module contains the driver trait, error type and configuration
//! for the PWM output that moves the gauge needle.

pub mod config;
pub mod driver;
pub mod types;

pub use config::{OutputConfig, SysfsConfig};
pub use driver::{DriverFactory, GaugeError, OutputDriver};
pub use types::{DriverDiagnostics, PwmMode};
